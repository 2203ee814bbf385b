use serde::{Deserialize, Serialize};

use crate::similarity::SimilarityBreakdown;
use crate::tier::ConfidenceTier;

/// One unique payee as seen by duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateRecord {
    pub id: String,
    pub name: String,
}

impl DuplicateRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Records for a list of distinct names, ids `"0"`, `"1"`, ... in list order.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Vec<Self> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Self::new(i.to_string(), name.as_ref()))
            .collect()
    }
}

/// How a pair (or a group member) was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JudgementMethod {
    #[serde(rename = "Algorithmic-High")]
    AlgorithmicHigh,
    #[serde(rename = "Algorithmic-Low")]
    AlgorithmicLow,
    #[serde(rename = "AI Judgment")]
    AiJudgment,
}

impl JudgementMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlgorithmicHigh => "Algorithmic-High",
            Self::AlgorithmicLow => "Algorithmic-Low",
            Self::AiJudgment => "AI Judgment",
        }
    }
}

impl std::fmt::Display for JudgementMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scored candidate pair. Indices refer to the input record slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateCandidatePair {
    pub index_a: usize,
    pub index_b: usize,
    pub record_a: DuplicateRecord,
    pub record_b: DuplicateRecord,
    pub similarity_score: f64,
    pub confidence_tier: ConfidenceTier,
    pub breakdown: SimilarityBreakdown,
}

/// Final decision for one candidate pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairDecision {
    pub pair: DuplicateCandidatePair,
    pub is_duplicate: bool,
    pub method: JudgementMethod,
    /// 0-100 confidence in `is_duplicate`.
    pub confidence: f64,
    pub reasoning: String,
    /// The judge was consulted but failed; the decision is the conservative fallback.
    pub ai_failed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMember {
    pub id: String,
    pub name: String,
    /// Strongest method among the duplicate links touching this member.
    pub method: JudgementMethod,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateGroup {
    pub group_id: usize,
    /// Input order.
    pub members: Vec<GroupMember>,
}

impl DuplicateGroup {
    pub fn ids(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.id.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DuplicateStatistics {
    pub records_processed: usize,
    pub candidate_pairs: usize,
    pub duplicate_pairs: usize,
    pub groups: usize,
    pub records_in_groups: usize,
    pub high_confidence: usize,
    pub low_confidence: usize,
    pub ai_judgments: usize,
    pub ai_failures: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateReport {
    pub duplicate_groups: Vec<DuplicateGroup>,
    pub decisions: Vec<PairDecision>,
    pub statistics: DuplicateStatistics,
}
