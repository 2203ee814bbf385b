//! `payeekit-dedup` - near-duplicate payee detection.
//!
//! Candidate pairs are scored with a composite similarity, bucketed into
//! confidence tiers, and only the ambiguous middle tier is sent to the AI
//! judge. Duplicate pairs are unioned into groups.

pub mod config;
pub mod engine;
pub mod error;
pub mod group;
pub mod judge;
pub mod model;
pub mod normalize;
pub mod similarity;
pub mod tier;

pub use config::DuplicateConfig;
pub use engine::{detect_duplicates, detect_duplicates_algorithmic};
pub use error::DedupError;
pub use judge::{DuplicateJudge, JudgeVerdict};
pub use model::{
    DuplicateCandidatePair, DuplicateGroup, DuplicateRecord, DuplicateReport, DuplicateStatistics,
    GroupMember, JudgementMethod, PairDecision,
};
pub use tier::ConfidenceTier;
