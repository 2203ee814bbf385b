use payeekit_core::CallError;
use serde::{Deserialize, Serialize};

/// Verdict of the AI duplicate judge for one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub is_duplicate: bool,
    /// 0-100.
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

/// External judge consulted only for ambiguous pairs. Receives the raw names.
#[allow(async_fn_in_trait)]
pub trait DuplicateJudge {
    async fn judge(&self, name_a: &str, name_b: &str) -> Result<JudgeVerdict, CallError>;
}
