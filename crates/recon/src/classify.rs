//! Chunked classification: split, consult the cache, submit misses to the
//! oracle, and stitch per-chunk results back into unique-payee order.

use std::collections::HashMap;

use futures_util::stream::{self, StreamExt};
use payeekit_core::{with_resilience, CacheService, CallError, CancelToken, ResiliencePolicy};

use crate::chunk::{merge_chunk_results, split_for_submission, Chunk};
use crate::config::ClassificationConfig;
use crate::error::ReconError;
use crate::model::{ClassificationResult, PayeeRowData};

/// External business/individual classifier.
///
/// Returns one result per input name, each carrying the submitted name in
/// `payee_name`. Order does not matter; results are matched back by name.
/// Individual results may be failure-tagged; an `Err` fails the whole submission.
#[allow(async_fn_in_trait)]
pub trait ClassificationOracle {
    async fn classify(&self, names: &[String]) -> Result<Vec<ClassificationResult>, CallError>;
}

/// Classify every unique payee in `data`.
///
/// The returned vector is parallel to `data.unique_payee_names` and can be
/// handed straight to [`reconcile`](crate::reconcile). Oracle failures are
/// absorbed as `Failed` items; only cancellation and input errors are `Err`.
pub async fn classify_payees<O: ClassificationOracle>(
    data: &PayeeRowData,
    oracle: &O,
    cache: Option<&dyn CacheService<ClassificationResult>>,
    config: &ClassificationConfig,
    cancel: &CancelToken,
) -> Result<Vec<ClassificationResult>, ReconError> {
    config.validate()?;
    data.validate()?;
    let chunks = split_for_submission(data, config.max_unique_per_chunk)?;
    let policy = config.policy();

    log::info!(
        "classifying {} unique payees in {} chunk(s), {} in flight",
        data.unique_count(),
        chunks.len(),
        config.max_concurrent_chunks
    );

    let outcomes: Vec<Result<Vec<ClassificationResult>, ReconError>> = stream::iter(
        chunks
            .iter()
            .map(|chunk| classify_chunk(chunk, oracle, cache, &policy, cancel)),
    )
    .buffered(config.max_concurrent_chunks)
    .collect()
    .await;

    if cancel.is_cancelled() {
        return Err(ReconError::Cancelled);
    }

    let mut per_chunk = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        per_chunk.push(outcome?);
    }
    merge_chunk_results(&chunks, per_chunk)
}

async fn classify_chunk<O: ClassificationOracle>(
    chunk: &Chunk,
    oracle: &O,
    cache: Option<&dyn CacheService<ClassificationResult>>,
    policy: &ResiliencePolicy,
    cancel: &CancelToken,
) -> Result<Vec<ClassificationResult>, ReconError> {
    if cancel.is_cancelled() {
        return Err(ReconError::Cancelled);
    }

    let mut slots: Vec<Option<ClassificationResult>> = vec![None; chunk.len()];
    let mut miss_positions = Vec::new();
    let mut miss_names = Vec::new();

    for (pos, key) in chunk.unique_normalized_names.iter().enumerate() {
        match cache.and_then(|c| c.get(key)) {
            Some(mut hit) => {
                hit.cached = true;
                hit.payee_name = chunk.unique_payee_names[pos].clone();
                slots[pos] = Some(hit);
            }
            None => {
                miss_positions.push(pos);
                miss_names.push(submitted_name(&chunk.unique_payee_names[pos], key));
            }
        }
    }

    log::debug!(
        "{}: {} cached, {} to submit",
        chunk.chunk_id,
        chunk.len() - miss_names.len(),
        miss_names.len()
    );

    if !miss_names.is_empty() {
        let names = &miss_names;
        let fresh = with_resilience(&chunk.chunk_id, policy, cancel, move || oracle.classify(names))
            .await
            .and_then(|results| align_by_name(names, results));

        match fresh {
            Ok(results) => {
                for (pos, mut result) in miss_positions.iter().copied().zip(results) {
                    result.cached = false;
                    result.payee_name = chunk.unique_payee_names[pos].clone();
                    if let Some(cache) = cache.filter(|_| result.is_success()) {
                        cache.set(&chunk.unique_normalized_names[pos], result.clone());
                    }
                    slots[pos] = Some(result);
                }
                log::info!("{}: classified {} payees", chunk.chunk_id, miss_names.len());
            }
            Err(CallError::Cancelled) => return Err(ReconError::Cancelled),
            Err(err) => {
                log::warn!(
                    "{}: submission failed, marking {} payees as Failed: {err}",
                    chunk.chunk_id,
                    miss_names.len()
                );
                let message = err.to_string();
                for pos in &miss_positions {
                    slots[*pos] = Some(ClassificationResult::failed(
                        chunk.unique_payee_names[*pos].clone(),
                        message.clone(),
                    ));
                }
            }
        }
    }

    let mut results = Vec::with_capacity(slots.len());
    for (pos, slot) in slots.into_iter().enumerate() {
        results.push(slot.ok_or(ReconError::UnfilledRow {
            index: chunk.unique_offset + pos,
        })?);
    }
    Ok(results)
}

/// Name sent to the oracle: the original spelling, or the normalized key
/// when the original cell was blank.
fn submitted_name(original: &str, normalized: &str) -> String {
    if original.trim().is_empty() {
        normalized.to_string()
    } else {
        original.to_string()
    }
}

/// Reorder `results` to match `names` by `payee_name`.
///
/// A missing, duplicated or unknown name rejects the whole submission.
fn align_by_name(
    names: &[String],
    results: Vec<ClassificationResult>,
) -> Result<Vec<ClassificationResult>, CallError> {
    if results.len() != names.len() {
        return Err(CallError::Rejected(format!(
            "oracle returned {} results for {} names",
            results.len(),
            names.len()
        )));
    }

    let mut by_name: HashMap<String, ClassificationResult> = HashMap::with_capacity(results.len());
    for result in results {
        if let Some(dup) = by_name.insert(result.payee_name.clone(), result) {
            return Err(CallError::Rejected(format!(
                "oracle returned more than one result for '{}'",
                dup.payee_name
            )));
        }
    }

    names
        .iter()
        .map(|name| {
            by_name.remove(name).ok_or_else(|| {
                CallError::Rejected(format!("oracle returned no result for '{name}'"))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Classification, PayeeRowData, Record};
    use crate::row_map::create_row_mapping;
    use payeekit_core::InMemoryTtlCache;
    use serde_json::json;
    use std::cell::RefCell;
    use std::time::Duration;

    /// Names starting with a vowel are businesses.
    #[derive(Default)]
    struct FakeOracle {
        calls: RefCell<Vec<Vec<String>>>,
        fail: bool,
        short: bool,
        reverse: bool,
        rename: bool,
    }

    impl ClassificationOracle for FakeOracle {
        async fn classify(&self, names: &[String]) -> Result<Vec<ClassificationResult>, CallError> {
            self.calls.borrow_mut().push(names.to_vec());
            if self.fail {
                return Err(CallError::Rejected("quota exceeded".into()));
            }
            let take = if self.short { names.len() - 1 } else { names.len() };
            let mut out: Vec<ClassificationResult> = names[..take]
                .iter()
                .map(|n| {
                    let c = if n.starts_with(['A', 'E', 'I', 'O', 'U']) {
                        Classification::Business
                    } else {
                        Classification::Individual
                    };
                    let echoed = if self.rename { n.to_lowercase() } else { n.clone() };
                    ClassificationResult::success(echoed, c, 90.0, "fake")
                })
                .collect();
            if self.reverse {
                out.reverse();
            }
            Ok(out)
        }
    }

    fn data(names: &[&str]) -> PayeeRowData {
        let rows = names
            .iter()
            .map(|n| {
                let mut r = Record::new();
                r.insert("payee".into(), json!(n));
                r
            })
            .collect();
        create_row_mapping(rows, "payee").unwrap()
    }

    fn config(chunk: usize) -> ClassificationConfig {
        ClassificationConfig {
            max_unique_per_chunk: chunk,
            retries: 0,
            ..ClassificationConfig::default()
        }
    }

    #[test]
    fn results_parallel_to_unique_names() {
        let d = data(&["Acme", "Bob", "Acme", "Evelyn", "Tom"]);
        let oracle = FakeOracle::default();
        let cancel = CancelToken::new();
        let out = smol::block_on(classify_payees(&d, &oracle, None, &config(2), &cancel)).unwrap();

        assert_eq!(out.len(), d.unique_count());
        let names: Vec<&str> = out.iter().map(|r| r.payee_name.as_str()).collect();
        assert_eq!(names, vec!["Acme", "Bob", "Evelyn", "Tom"]);
        assert_eq!(oracle.calls.borrow().len(), 2);
    }

    #[test]
    fn cache_hits_skip_the_oracle() {
        let d = data(&["Acme", "Bob"]);
        let cache: InMemoryTtlCache<ClassificationResult> = InMemoryTtlCache::new(Duration::from_secs(60));
        let cancel = CancelToken::new();

        let first = FakeOracle::default();
        smol::block_on(classify_payees(&d, &first, Some(&cache), &config(10), &cancel)).unwrap();
        assert_eq!(cache.len(), 2);

        let second = FakeOracle::default();
        let out = smol::block_on(classify_payees(&d, &second, Some(&cache), &config(10), &cancel)).unwrap();
        assert!(second.calls.borrow().is_empty());
        assert!(out.iter().all(|r| r.cached));
    }

    #[test]
    fn failed_chunk_becomes_failed_items() {
        let d = data(&["Acme", "Bob"]);
        let oracle = FakeOracle {
            fail: true,
            ..FakeOracle::default()
        };
        let cache: InMemoryTtlCache<ClassificationResult> = InMemoryTtlCache::new(Duration::from_secs(60));
        let cancel = CancelToken::new();
        let out = smol::block_on(classify_payees(&d, &oracle, Some(&cache), &config(10), &cancel)).unwrap();

        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| !r.is_success()));
        assert!(out[0].error.as_deref().unwrap().contains("quota exceeded"));
        // Failures are never cached.
        assert!(cache.is_empty());
    }

    #[test]
    fn short_response_fails_only_that_chunk() {
        let d = data(&["Acme", "Bob"]);
        let oracle = FakeOracle {
            short: true,
            ..FakeOracle::default()
        };
        let cancel = CancelToken::new();
        let out = smol::block_on(classify_payees(&d, &oracle, None, &config(10), &cancel)).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| !r.is_success()));
        assert!(out[1].error.as_deref().unwrap().contains("1 results for 2 names"));
    }

    #[test]
    fn results_are_matched_by_name_not_position() {
        let d = data(&["Acme", "Bob", "Acme"]);
        let oracle = FakeOracle {
            reverse: true,
            ..FakeOracle::default()
        };
        let cancel = CancelToken::new();
        let out = smol::block_on(classify_payees(&d, &oracle, None, &config(10), &cancel)).unwrap();

        assert_eq!(out[0].payee_name, "Acme");
        assert_eq!(out[0].classification, Classification::Business);
        assert_eq!(out[1].payee_name, "Bob");
        assert_eq!(out[1].classification, Classification::Individual);
    }

    #[test]
    fn unknown_result_names_fail_the_chunk() {
        let d = data(&["Acme", "Bob"]);
        let oracle = FakeOracle {
            rename: true,
            ..FakeOracle::default()
        };
        let cancel = CancelToken::new();
        let out = smol::block_on(classify_payees(&d, &oracle, None, &config(10), &cancel)).unwrap();
        assert!(out.iter().all(|r| !r.is_success()));
        assert!(out[0].error.as_deref().unwrap().contains("no result for 'Acme'"));
        assert_eq!(out[1].payee_name, "Bob");
    }

    #[test]
    fn blank_payee_is_submitted_by_its_key() {
        let rows: Vec<Record> = [json!(null), json!("Bob")]
            .into_iter()
            .map(|v| {
                let mut r = Record::new();
                r.insert("payee".into(), v);
                r
            })
            .collect();
        let d = create_row_mapping(rows, "payee").unwrap();
        let oracle = FakeOracle::default();
        let cancel = CancelToken::new();
        let out = smol::block_on(classify_payees(&d, &oracle, None, &config(10), &cancel)).unwrap();

        let submitted = oracle.calls.borrow()[0].clone();
        assert_eq!(submitted, vec![d.unique_normalized_names[0].clone(), "Bob".to_string()]);
        assert!(submitted.iter().all(|n| !n.trim().is_empty()));
        assert!(out[0].is_success());
        assert_eq!(out[0].payee_name, d.unique_payee_names[0]);
    }

    #[test]
    fn inconsistent_data_is_an_error() {
        let mut d = data(&["Acme", "Bob"]);
        d.unique_normalized_names.pop();
        let oracle = FakeOracle::default();
        let cancel = CancelToken::new();
        let out = smol::block_on(classify_payees(&d, &oracle, None, &config(10), &cancel));
        assert!(matches!(out, Err(ReconError::RowCountMismatch { .. })));
        assert!(oracle.calls.borrow().is_empty());
    }

    #[test]
    fn cancelled_before_start() {
        let d = data(&["Acme"]);
        let oracle = FakeOracle::default();
        let cancel = CancelToken::new();
        cancel.cancel();
        let out = smol::block_on(classify_payees(&d, &oracle, None, &config(10), &cancel));
        assert_eq!(out, Err(ReconError::Cancelled));
        assert!(oracle.calls.borrow().is_empty());
    }
}
