//! Request and response bodies of the oracle HTTP API.

use payeekit_dedup::JudgeVerdict;
use payeekit_recon::{Classification, ClassificationResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct SubmitJobRequest<'a> {
    pub names: &'a [String],
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SubmitJobResponse {
    pub job_id: String,
}

/// Lifecycle of a classification job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Finalizing,
    Done,
    Failed,
    Expired,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Expired | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Finalizing => "finalizing",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct JobStatusResponse {
    pub status: JobStatus,
    #[serde(default)]
    pub processed: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct JobResultsResponse {
    pub results: Vec<WireResult>,
}

/// One per-name result. A missing or `failed` status marks an item failure.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireResult {
    pub payee_name: String,
    #[serde(default)]
    pub classification: Option<Classification>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub industry_code: Option<String>,
    #[serde(default)]
    pub industry_description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl WireResult {
    pub fn into_result(self) -> ClassificationResult {
        let failed = self.status.as_deref() == Some("failed");
        match (failed, self.classification, self.confidence) {
            (false, Some(classification), Some(confidence)) => {
                let mut result = ClassificationResult::success(
                    self.payee_name,
                    classification,
                    confidence,
                    self.reasoning.unwrap_or_default(),
                );
                result.industry_code = self.industry_code;
                result.industry_description = self.industry_description;
                result
            }
            _ => {
                let error = self
                    .error
                    .unwrap_or_else(|| "oracle returned no classification".to_string());
                ClassificationResult::failed(self.payee_name, error)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JudgeRequest<'a> {
    pub name_a: &'a str,
    pub name_b: &'a str,
}

pub(crate) type JudgeResponse = JudgeVerdict;
