//! Duplicate detection pipeline: key, block, score, tier, judge, group.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Instant;

use payeekit_core::{adaptive_chunk_size, with_resilience, yield_point, CallError, CancelToken};

use crate::config::DuplicateConfig;
use crate::error::DedupError;
use crate::group::build_groups;
use crate::judge::DuplicateJudge;
use crate::model::{
    DuplicateCandidatePair, DuplicateRecord, DuplicateReport, DuplicateStatistics,
    JudgementMethod, PairDecision,
};
use crate::normalize::{block_keys, matching_key};
use crate::similarity::composite_similarity;
use crate::tier::ConfidenceTier;

/// Confidence recorded when the judge fails or is unavailable for an ambiguous pair.
pub const FALLBACK_CONFIDENCE: f64 = 50.0;

/// Detect duplicates, consulting `judge` for ambiguous pairs when
/// `config.ai_enabled`. Judge calls are sequential with `ai_call_delay_ms`
/// between them. A failed judgment resolves the pair as distinct.
pub async fn detect_duplicates<J: DuplicateJudge>(
    records: &[DuplicateRecord],
    judge: &J,
    config: &DuplicateConfig,
    cancel: &CancelToken,
) -> Result<DuplicateReport, DedupError> {
    let started = Instant::now();
    validate(records, config)?;

    let keys: Vec<String> = records.iter().map(|r| matching_key(&r.name)).collect();
    let candidates = candidate_pairs(&keys, config.blocking);
    log::info!(
        "scoring {} candidate pairs among {} records",
        candidates.len(),
        records.len()
    );

    let mut pairs = Vec::with_capacity(candidates.len());
    for slice in candidates.chunks(adaptive_chunk_size(candidates.len())) {
        if cancel.is_cancelled() {
            return Err(DedupError::Cancelled);
        }
        pairs.extend(slice.iter().map(|&(a, b)| score_pair(records, &keys, a, b, config)));
        yield_point().await;
    }

    let policy = config.judge_policy();
    let mut decisions = Vec::with_capacity(pairs.len());
    let mut judged = 0usize;

    for pair in pairs {
        let decision = match pair.confidence_tier {
            ConfidenceTier::Ambiguous if config.ai_enabled => {
                if cancel.is_cancelled() {
                    return Err(DedupError::Cancelled);
                }
                if judged > 0 && !config.call_delay().is_zero() {
                    smol::Timer::after(config.call_delay()).await;
                }
                judged += 1;

                let (a, b) = (pair.record_a.name.as_str(), pair.record_b.name.as_str());
                let outcome = with_resilience("duplicate judge", &policy, cancel, move || judge.judge(a, b)).await;
                match outcome {
                    Ok(verdict) => PairDecision {
                        is_duplicate: verdict.is_duplicate,
                        method: JudgementMethod::AiJudgment,
                        confidence: verdict.confidence.clamp(0.0, 100.0),
                        reasoning: verdict.reasoning,
                        ai_failed: false,
                        pair,
                    },
                    Err(CallError::Cancelled) => return Err(DedupError::Cancelled),
                    Err(err) => {
                        log::warn!("AI judgment failed for '{a}' / '{b}', treating as distinct: {err}");
                        PairDecision {
                            is_duplicate: false,
                            method: JudgementMethod::AiJudgment,
                            confidence: FALLBACK_CONFIDENCE,
                            reasoning: format!("AI judgment failed: {err}"),
                            ai_failed: true,
                            pair,
                        }
                    }
                }
            }
            _ => algorithmic_decision(pair),
        };
        decisions.push(decision);
    }

    Ok(finish(records, decisions, started))
}

/// Detect duplicates without any judge: ambiguous pairs are distinct.
pub fn detect_duplicates_algorithmic(
    records: &[DuplicateRecord],
    config: &DuplicateConfig,
) -> Result<DuplicateReport, DedupError> {
    let started = Instant::now();
    validate(records, config)?;

    let keys: Vec<String> = records.iter().map(|r| matching_key(&r.name)).collect();
    let decisions = candidate_pairs(&keys, config.blocking)
        .into_iter()
        .map(|(a, b)| algorithmic_decision(score_pair(records, &keys, a, b, config)))
        .collect();

    Ok(finish(records, decisions, started))
}

fn validate(records: &[DuplicateRecord], config: &DuplicateConfig) -> Result<(), DedupError> {
    config.validate()?;
    if records.is_empty() {
        return Err(DedupError::EmptyInput);
    }
    let mut seen = HashSet::with_capacity(records.len());
    for r in records {
        if !seen.insert(r.id.as_str()) {
            return Err(DedupError::DuplicateId(r.id.clone()));
        }
    }
    Ok(())
}

/// Index pairs `(a, b)` with `a < b`, sorted. With blocking, only records
/// sharing a block key are paired.
pub fn candidate_pairs(keys: &[String], blocking: bool) -> Vec<(usize, usize)> {
    let n = keys.len();
    if !blocking {
        return (0..n)
            .flat_map(|a| (a + 1..n).map(move |b| (a, b)))
            .collect();
    }

    let mut blocks: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, key) in keys.iter().enumerate() {
        for block in block_keys(key) {
            blocks.entry(block).or_default().push(idx);
        }
    }

    let mut pairs = BTreeSet::new();
    for members in blocks.values() {
        for (i, &a) in members.iter().enumerate() {
            for &b in &members[i + 1..] {
                pairs.insert((a.min(b), a.max(b)));
            }
        }
    }
    pairs.into_iter().collect()
}

fn score_pair(
    records: &[DuplicateRecord],
    keys: &[String],
    a: usize,
    b: usize,
    config: &DuplicateConfig,
) -> DuplicateCandidatePair {
    let breakdown = composite_similarity(&keys[a], &keys[b]);
    let tier = ConfidenceTier::classify(breakdown.score, config.low_threshold, config.high_threshold);
    log::debug!(
        "pair {a}/{b} '{}' ~ '{}': {:.1} ({tier})",
        keys[a],
        keys[b],
        breakdown.score
    );
    DuplicateCandidatePair {
        index_a: a,
        index_b: b,
        record_a: records[a].clone(),
        record_b: records[b].clone(),
        similarity_score: breakdown.score,
        confidence_tier: tier,
        breakdown,
    }
}

fn algorithmic_decision(pair: DuplicateCandidatePair) -> PairDecision {
    let score = pair.similarity_score;
    match pair.confidence_tier {
        ConfidenceTier::High => PairDecision {
            is_duplicate: true,
            method: JudgementMethod::AlgorithmicHigh,
            confidence: score,
            reasoning: format!("Similarity {score:.1} at or above the high threshold"),
            ai_failed: false,
            pair,
        },
        ConfidenceTier::Low => PairDecision {
            is_duplicate: false,
            method: JudgementMethod::AlgorithmicLow,
            confidence: 100.0 - score,
            reasoning: format!("Similarity {score:.1} at or below the low threshold"),
            ai_failed: false,
            pair,
        },
        ConfidenceTier::Ambiguous => PairDecision {
            is_duplicate: false,
            method: JudgementMethod::AlgorithmicLow,
            confidence: FALLBACK_CONFIDENCE,
            reasoning: format!("Similarity {score:.1} is ambiguous and AI judgment is disabled"),
            ai_failed: false,
            pair,
        },
    }
}

fn finish(records: &[DuplicateRecord], decisions: Vec<PairDecision>, started: Instant) -> DuplicateReport {
    let duplicate_groups = build_groups(records, &decisions);

    let mut statistics = DuplicateStatistics {
        records_processed: records.len(),
        candidate_pairs: decisions.len(),
        groups: duplicate_groups.len(),
        records_in_groups: duplicate_groups.iter().map(|g| g.members.len()).sum(),
        ..DuplicateStatistics::default()
    };
    for d in &decisions {
        if d.is_duplicate {
            statistics.duplicate_pairs += 1;
        }
        match d.method {
            JudgementMethod::AlgorithmicHigh => statistics.high_confidence += 1,
            JudgementMethod::AlgorithmicLow => statistics.low_confidence += 1,
            JudgementMethod::AiJudgment => statistics.ai_judgments += 1,
        }
        if d.ai_failed {
            statistics.ai_failures += 1;
        }
    }
    statistics.elapsed_ms = started.elapsed().as_millis() as u64;

    log::info!(
        "found {} duplicate pairs in {} groups among {} records ({} AI judgments, {} failed)",
        statistics.duplicate_pairs,
        statistics.groups,
        statistics.records_processed,
        statistics.ai_judgments,
        statistics.ai_failures
    );

    DuplicateReport {
        duplicate_groups,
        decisions,
        statistics,
    }
}
