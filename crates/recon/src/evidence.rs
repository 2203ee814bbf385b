use std::collections::HashMap;

use crate::model::{
    Classification, ClassificationStatus, MappedRow, ProcessingTier, ReconcileSummary,
    StandardizationStats, StepCount,
};
use crate::standardize::{CleaningStep, StandardizationResult};

const TOP_STEPS: usize = 5;

/// Summary of a standardization pass. Informational only.
pub fn compute_standardization_stats<'a>(
    results: impl IntoIterator<Item = &'a StandardizationResult>,
) -> StandardizationStats {
    let mut total_names = 0;
    let mut changed_names = 0;
    let mut total_steps = 0;
    let mut step_counts: HashMap<CleaningStep, usize> = HashMap::new();

    for r in results {
        total_names += 1;
        if r.changed() {
            changed_names += 1;
        }
        total_steps += r.cleaning_steps.len();
        for step in &r.cleaning_steps {
            *step_counts.entry(*step).or_insert(0) += 1;
        }
    }

    let mut top_steps: Vec<StepCount> = step_counts
        .into_iter()
        .map(|(step, count)| StepCount { step, count })
        .collect();
    // Count descending, then step order for a stable report.
    top_steps.sort_by(|a, b| b.count.cmp(&a.count).then(a.step.cmp(&b.step)));
    top_steps.truncate(TOP_STEPS);

    let (fraction_changed, average_steps) = if total_names == 0 {
        (0.0, 0.0)
    } else {
        (
            changed_names as f64 / total_names as f64,
            total_steps as f64 / total_names as f64,
        )
    };

    StandardizationStats {
        total_names,
        changed_names,
        fraction_changed,
        average_steps,
        top_steps,
    }
}

/// Compute summary counts from reconciled rows.
pub fn compute_summary(rows: &[MappedRow]) -> ReconcileSummary {
    let mut summary = ReconcileSummary {
        total_rows: rows.len(),
        ..ReconcileSummary::default()
    };
    let mut confidence_sum = 0.0;
    let mut classified = 0;

    for row in rows {
        if row.classification_status == ClassificationStatus::Failed {
            summary.failed += 1;
        } else {
            classified += 1;
            confidence_sum += row.confidence;
            match row.classification {
                Classification::Business => summary.business += 1,
                Classification::Individual => summary.individual += 1,
            }
        }
        if row.processing_tier == ProcessingTier::Cached {
            summary.cached += 1;
        }
        if row.data_quality_improved {
            summary.standardized_rows += 1;
        }
    }

    if classified > 0 {
        summary.average_confidence = confidence_sum / classified as f64;
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;
    use crate::standardize::standardize;

    fn row(classification: Classification, status: ClassificationStatus, confidence: f64) -> MappedRow {
        MappedRow {
            original: Record::new(),
            classification,
            confidence,
            processing_tier: if status == ClassificationStatus::Failed {
                ProcessingTier::Failed
            } else {
                ProcessingTier::Classified
            },
            reasoning: String::new(),
            industry_code: None,
            industry_description: None,
            classification_status: status,
            classification_error: None,
            normalized_payee_name: "X".into(),
            standardization_steps: Vec::new(),
            data_quality_improved: false,
        }
    }

    #[test]
    fn summary_counts() {
        let rows = vec![
            row(Classification::Business, ClassificationStatus::Success, 90.0),
            row(Classification::Business, ClassificationStatus::Success, 80.0),
            row(Classification::Individual, ClassificationStatus::Success, 70.0),
            row(Classification::Individual, ClassificationStatus::Failed, 0.0),
        ];
        let s = compute_summary(&rows);
        assert_eq!(s.total_rows, 4);
        assert_eq!(s.business, 2);
        assert_eq!(s.individual, 1);
        assert_eq!(s.failed, 1);
        assert_eq!(s.average_confidence, 80.0);
    }

    #[test]
    fn standardization_stats() {
        let results = vec![
            standardize(Some("Alice")),
            standardize(Some("acme inc")),
            standardize(None),
            standardize(Some("Bob")),
        ];
        let stats = compute_standardization_stats(&results);
        assert_eq!(stats.total_names, 4);
        // "acme inc" and null changed.
        assert_eq!(stats.changed_names, 2);
        assert_eq!(stats.fraction_changed, 0.5);
        assert_eq!(stats.average_steps, 3.0 / 4.0);
        assert_eq!(stats.top_steps.len(), 3);
        assert!(stats.top_steps.iter().all(|s| s.count == 1));
    }

    #[test]
    fn stats_of_nothing() {
        let stats = compute_standardization_stats(std::iter::empty());
        assert_eq!(stats.total_names, 0);
        assert_eq!(stats.fraction_changed, 0.0);
    }
}
