use serde::{Deserialize, Serialize};

use crate::standardize::{CleaningStep, StandardizationResult};

/// One opaque row of the uploaded table. Only the payee column is interpreted.
pub type Record = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// Association of one original row with its unique payee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowMapping {
    pub original_row_index: usize,
    pub payee_name: String,
    pub normalized_payee_name: String,
    pub unique_payee_index: usize,
    pub standardization: StandardizationResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepCount {
    pub step: CleaningStep,
    pub count: usize,
}

/// Informational summary of a standardization pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardizationStats {
    pub total_names: usize,
    pub changed_names: usize,
    /// Fraction of names whose normalized form differs from the original (0.0-1.0).
    pub fraction_changed: f64,
    pub average_steps: f64,
    pub top_steps: Vec<StepCount>,
}

/// Output of the row mapper. Owned by the session that created it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayeeRowData {
    pub payee_column: String,
    /// Original spelling of each unique payee, first-seen order.
    pub unique_payee_names: Vec<String>,
    /// Normalized key of each unique payee, parallel to `unique_payee_names`.
    pub unique_normalized_names: Vec<String>,
    pub row_mappings: Vec<RowMapping>,
    pub original_file_data: Vec<Record>,
    pub standardization_stats: StandardizationStats,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    Business,
    Individual,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Business => write!(f, "Business"),
            Self::Individual => write!(f, "Individual"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationStatus {
    Success,
    Failed,
}

/// Classification of one unique payee, as returned by the oracle (or the cache).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub payee_name: String,
    pub classification: Classification,
    /// 0-100.
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry_description: Option<String>,
    pub status: ClassificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Served from the classification cache rather than a fresh oracle call.
    #[serde(default)]
    pub cached: bool,
}

impl ClassificationResult {
    pub fn success(
        payee_name: impl Into<String>,
        classification: Classification,
        confidence: f64,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            payee_name: payee_name.into(),
            classification,
            confidence,
            reasoning: reasoning.into(),
            industry_code: None,
            industry_description: None,
            status: ClassificationStatus::Success,
            error: None,
            cached: false,
        }
    }

    /// A failure-tagged entry. Classification and confidence carry the
    /// conservative defaults used for the `Failed` tier.
    pub fn failed(payee_name: impl Into<String>, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            payee_name: payee_name.into(),
            classification: Classification::Individual,
            confidence: 0.0,
            reasoning: format!("Classification failed: {error}"),
            industry_code: None,
            industry_description: None,
            status: ClassificationStatus::Failed,
            error: Some(error),
            cached: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ClassificationStatus::Success
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessingTier {
    Classified,
    Cached,
    Failed,
}

impl std::fmt::Display for ProcessingTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Classified => write!(f, "Classified"),
            Self::Cached => write!(f, "Cached"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// One output row: original fields, then classification, then standardization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedRow {
    #[serde(flatten)]
    pub original: Record,
    pub classification: Classification,
    pub confidence: f64,
    pub processing_tier: ProcessingTier,
    pub reasoning: String,
    pub industry_code: Option<String>,
    pub industry_description: Option<String>,
    pub classification_status: ClassificationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification_error: Option<String>,
    pub normalized_payee_name: String,
    pub standardization_steps: Vec<CleaningStep>,
    pub data_quality_improved: bool,
}

/// Counts over a reconciled output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileSummary {
    pub total_rows: usize,
    pub business: usize,
    pub individual: usize,
    pub failed: usize,
    pub cached: usize,
    pub average_confidence: f64,
    pub standardized_rows: usize,
}
