//! Reconciliation: per-unique-payee classification results back onto every
//! original row.
//!
//! Output length always equals `original_file_data.len()`. Each row's
//! classification is resolved through its mapping's `unique_payee_index`,
//! never by position.

use payeekit_core::{adaptive_chunk_size, yield_point, CancelToken, Progress};

use crate::error::ReconError;
use crate::model::{
    Classification, ClassificationResult, ClassificationStatus, MappedRow, PayeeRowData,
    ProcessingTier, RowMapping,
};

/// Reconcile classification results onto every original row.
///
/// `results` must be parallel to `data.unique_payee_names`. Any invariant
/// violation aborts with no partial output.
pub fn reconcile(
    results: &[ClassificationResult],
    data: &PayeeRowData,
) -> Result<Vec<MappedRow>, ReconError> {
    let mut pass = ReconcilePass::new(results, data)?;
    for mapping in &data.row_mappings {
        pass.apply(mapping)?;
    }
    pass.finish()
}

/// Same output as [`reconcile`], processed in adaptive chunks with a yield
/// point between chunks. Progress is informational only.
pub async fn reconcile_cooperative(
    results: &[ClassificationResult],
    data: &PayeeRowData,
    mut on_progress: impl FnMut(Progress),
    cancel: &CancelToken,
) -> Result<Vec<MappedRow>, ReconError> {
    let mut pass = ReconcilePass::new(results, data)?;
    let total = data.row_mappings.len();
    let chunk_size = adaptive_chunk_size(total);

    let mut processed = 0;
    for slice in data.row_mappings.chunks(chunk_size) {
        if cancel.is_cancelled() {
            log::info!("reconciliation cancelled after {processed} of {total} rows");
            return Err(ReconError::Cancelled);
        }
        for mapping in slice {
            pass.apply(mapping)?;
        }
        processed += slice.len();
        on_progress(Progress::new(processed, total));
        yield_point().await;
    }
    pass.finish()
}

/// In-flight reconciliation state. Slots are written at most once.
struct ReconcilePass<'a> {
    results: &'a [ClassificationResult],
    data: &'a PayeeRowData,
    output: Vec<Option<MappedRow>>,
    processed: Vec<bool>,
    processed_count: usize,
}

impl<'a> ReconcilePass<'a> {
    fn new(results: &'a [ClassificationResult], data: &'a PayeeRowData) -> Result<Self, ReconError> {
        let n = data.original_file_data.len();
        if results.len() != data.unique_payee_names.len() {
            return Err(ReconError::ResultCountMismatch {
                expected: data.unique_payee_names.len(),
                actual: results.len(),
            });
        }
        if data.row_mappings.len() != n {
            return Err(ReconError::RowCountMismatch {
                stage: "reconcile preflight",
                expected: n,
                actual: data.row_mappings.len(),
            });
        }

        Ok(Self {
            results,
            data,
            output: vec![None; n],
            processed: vec![false; n],
            processed_count: 0,
        })
    }

    fn apply(&mut self, mapping: &RowMapping) -> Result<(), ReconError> {
        let n = self.output.len();
        let row_index = mapping.original_row_index;
        if row_index >= n {
            return Err(ReconError::IndexOutOfRange {
                what: "original row",
                index: row_index,
                len: n,
            });
        }
        if self.processed[row_index] {
            return Err(ReconError::DuplicateRowIndex { index: row_index });
        }

        let result = self
            .results
            .get(mapping.unique_payee_index)
            .ok_or(ReconError::IndexOutOfRange {
                what: "unique payee",
                index: mapping.unique_payee_index,
                len: self.results.len(),
            })?;
        let original = self.data.original_file_data[row_index].clone();

        self.output[row_index] = Some(mapped_row(original, result, mapping));
        self.processed[row_index] = true;
        self.processed_count += 1;
        Ok(())
    }

    fn finish(self) -> Result<Vec<MappedRow>, ReconError> {
        let n = self.output.len();
        if self.processed_count != n {
            return Err(ReconError::RowCountMismatch {
                stage: "reconcile processed rows",
                expected: n,
                actual: self.processed_count,
            });
        }

        let mut rows = Vec::with_capacity(n);
        for (index, slot) in self.output.into_iter().enumerate() {
            rows.push(slot.ok_or(ReconError::UnfilledRow { index })?);
        }
        if rows.len() != n {
            return Err(ReconError::RowCountMismatch {
                stage: "reconcile output",
                expected: n,
                actual: rows.len(),
            });
        }

        log::info!("reconciled {n} rows from {} unique payees", self.results.len());
        Ok(rows)
    }
}

fn mapped_row(
    original: crate::model::Record,
    result: &ClassificationResult,
    mapping: &RowMapping,
) -> MappedRow {
    let standardization = &mapping.standardization;
    let failed = result.status == ClassificationStatus::Failed;

    let (classification, confidence, processing_tier) = if failed {
        (Classification::Individual, 0.0, ProcessingTier::Failed)
    } else {
        let tier = if result.cached {
            ProcessingTier::Cached
        } else {
            ProcessingTier::Classified
        };
        (result.classification, sanitize_confidence(result.confidence), tier)
    };

    let reasoning = if result.reasoning.is_empty() && failed {
        "Classification failed".to_string()
    } else {
        result.reasoning.clone()
    };

    MappedRow {
        original,
        classification,
        confidence,
        processing_tier,
        reasoning,
        industry_code: result.industry_code.clone(),
        industry_description: result.industry_description.clone(),
        classification_status: result.status,
        classification_error: result.error.clone(),
        normalized_payee_name: standardization.normalized.clone(),
        standardization_steps: standardization.cleaning_steps.clone(),
        data_quality_improved: standardization.changed(),
    }
}

/// Clamp to 0-100; non-finite values read as 0.
fn sanitize_confidence(confidence: f64) -> f64 {
    if confidence.is_finite() {
        confidence.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
