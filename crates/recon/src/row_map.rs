use std::collections::{HashMap, HashSet};

use payeekit_core::{adaptive_chunk_size, yield_point, CancelToken, Progress};

use crate::error::ReconError;
use crate::evidence::compute_standardization_stats;
use crate::model::{PayeeRowData, Record, RowMapping};
use crate::standardize::{standardize, StandardizationResult};

/// Build the unique payee list and one mapping per original row.
///
/// Rows are never skipped: a row whose payee standardizes to `UNKNOWN`
/// collapses with every other such row.
pub fn create_row_mapping(rows: Vec<Record>, payee_column: &str) -> Result<PayeeRowData, ReconError> {
    validate_input(&rows, payee_column)?;

    let standardized: Vec<StandardizationResult> = rows
        .iter()
        .map(|row| standardize(payee_value(row, payee_column)))
        .collect();

    build_payee_row_data(rows, payee_column, standardized)
}

/// Same result as [`create_row_mapping`], standardizing in chunks with a
/// yield point between chunks. Cancellation is checked at chunk boundaries.
pub async fn create_row_mapping_cooperative(
    rows: Vec<Record>,
    payee_column: &str,
    mut on_progress: impl FnMut(Progress),
    cancel: &CancelToken,
) -> Result<PayeeRowData, ReconError> {
    validate_input(&rows, payee_column)?;

    let total = rows.len();
    let chunk_size = adaptive_chunk_size(total);
    let mut standardized = Vec::with_capacity(total);

    for slice in rows.chunks(chunk_size) {
        if cancel.is_cancelled() {
            return Err(ReconError::Cancelled);
        }
        standardized.extend(slice.iter().map(|row| standardize(payee_value(row, payee_column))));
        on_progress(Progress::new(standardized.len(), total));
        yield_point().await;
    }

    build_payee_row_data(rows, payee_column, standardized)
}

/// Payee cell as a string. Null, missing, and non-string values read as `None`.
pub fn payee_value<'a>(row: &'a Record, payee_column: &str) -> Option<&'a str> {
    row.get(payee_column).and_then(|v| v.as_str())
}

fn validate_input(rows: &[Record], payee_column: &str) -> Result<(), ReconError> {
    if rows.is_empty() {
        return Err(ReconError::EmptyInput);
    }
    if !rows.iter().any(|row| row.contains_key(payee_column)) {
        return Err(ReconError::MissingColumn {
            column: payee_column.to_string(),
        });
    }
    Ok(())
}

fn build_payee_row_data(
    rows: Vec<Record>,
    payee_column: &str,
    standardized: Vec<StandardizationResult>,
) -> Result<PayeeRowData, ReconError> {
    if standardized.len() != rows.len() {
        return Err(ReconError::RowCountMismatch {
            stage: "standardization",
            expected: rows.len(),
            actual: standardized.len(),
        });
    }

    let mut key_to_index: HashMap<String, usize> = HashMap::new();
    let mut unique_payee_names = Vec::new();
    let mut unique_normalized_names = Vec::new();
    let mut row_mappings = Vec::with_capacity(rows.len());

    for (original_row_index, result) in standardized.into_iter().enumerate() {
        let unique_payee_index = match key_to_index.get(&result.normalized) {
            Some(&idx) => idx,
            None => {
                let idx = unique_payee_names.len();
                key_to_index.insert(result.normalized.clone(), idx);
                unique_payee_names.push(result.original.clone());
                unique_normalized_names.push(result.normalized.clone());
                idx
            }
        };

        row_mappings.push(RowMapping {
            original_row_index,
            payee_name: result.original.clone(),
            normalized_payee_name: result.normalized.clone(),
            unique_payee_index,
            standardization: result,
        });
    }

    let standardization_stats =
        compute_standardization_stats(row_mappings.iter().map(|m| &m.standardization));

    let data = PayeeRowData {
        payee_column: payee_column.to_string(),
        unique_payee_names,
        unique_normalized_names,
        row_mappings,
        original_file_data: rows,
        standardization_stats,
    };
    data.validate()?;

    log::info!(
        "mapped {} rows onto {} unique payees ({:.1}% of names changed by standardization)",
        data.row_count(),
        data.unique_count(),
        data.standardization_stats.fraction_changed * 100.0
    );

    Ok(data)
}

impl PayeeRowData {
    pub fn row_count(&self) -> usize {
        self.original_file_data.len()
    }

    pub fn unique_count(&self) -> usize {
        self.unique_payee_names.len()
    }

    /// Check the structural invariants. Also used on re-hydrated data.
    pub fn validate(&self) -> Result<(), ReconError> {
        let n = self.original_file_data.len();
        if self.row_mappings.len() != n {
            return Err(ReconError::RowCountMismatch {
                stage: "row mapping",
                expected: n,
                actual: self.row_mappings.len(),
            });
        }
        if self.unique_normalized_names.len() != self.unique_payee_names.len() {
            return Err(ReconError::RowCountMismatch {
                stage: "unique payee lists",
                expected: self.unique_payee_names.len(),
                actual: self.unique_normalized_names.len(),
            });
        }

        let mut seen = vec![false; n];
        for mapping in &self.row_mappings {
            let idx = mapping.original_row_index;
            if idx >= n {
                return Err(ReconError::IndexOutOfRange {
                    what: "original row",
                    index: idx,
                    len: n,
                });
            }
            if seen[idx] {
                return Err(ReconError::DuplicateRowIndex { index: idx });
            }
            seen[idx] = true;

            if mapping.unique_payee_index >= self.unique_payee_names.len() {
                return Err(ReconError::IndexOutOfRange {
                    what: "unique payee",
                    index: mapping.unique_payee_index,
                    len: self.unique_payee_names.len(),
                });
            }
        }
        Ok(())
    }

    /// Distinct original payee spellings, first-seen order. Blank names are skipped.
    ///
    /// This is the duplicate-detection input: it deliberately keys on the
    /// original spelling, not the normalized key used for classification.
    pub fn unique_original_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.row_mappings
            .iter()
            .map(|m| m.payee_name.as_str())
            .filter(|name| !name.trim().is_empty())
            .filter(|name| seen.insert(*name))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(names: &[serde_json::Value]) -> Vec<Record> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut r = Record::new();
                r.insert("id".into(), json!(i));
                r.insert("payee".into(), name.clone());
                r
            })
            .collect()
    }

    #[test]
    fn dedups_on_normalized_key() {
        let data = create_row_mapping(
            rows(&[json!("Alice"), json!("Bob"), json!("ALICE "), json!("Alice Inc")]),
            "payee",
        )
        .unwrap();
        assert_eq!(data.unique_payee_names, vec!["Alice", "Bob"]);
        assert_eq!(data.unique_normalized_names, vec!["Alice", "Bob"]);
        let idx: Vec<usize> = data.row_mappings.iter().map(|m| m.unique_payee_index).collect();
        assert_eq!(idx, vec![0, 1, 0, 0]);
        assert_eq!(data.row_count(), 4);
    }

    #[test]
    fn every_row_gets_a_mapping() {
        let data = create_row_mapping(
            rows(&[json!(null), json!(""), json!(42), json!("Carol"), json!("!!")]),
            "payee",
        )
        .unwrap();
        assert_eq!(data.row_mappings.len(), 5);
        // null, empty, number and punctuation-only all collapse onto UNKNOWN.
        assert_eq!(data.unique_normalized_names, vec!["UNKNOWN", "Carol"]);
        for (i, m) in data.row_mappings.iter().enumerate() {
            assert_eq!(m.original_row_index, i);
        }
    }

    #[test]
    fn missing_column_in_some_rows_is_unknown() {
        let mut input = rows(&[json!("Dave")]);
        input.push(Record::new());
        let data = create_row_mapping(input, "payee").unwrap();
        assert_eq!(data.row_mappings[1].normalized_payee_name, "UNKNOWN");
    }

    #[test]
    fn empty_input_rejected() {
        assert_eq!(create_row_mapping(Vec::new(), "payee"), Err(ReconError::EmptyInput));
    }

    #[test]
    fn missing_column_rejected() {
        let err = create_row_mapping(rows(&[json!("Erin")]), "vendor").unwrap_err();
        assert!(matches!(err, ReconError::MissingColumn { .. }));
    }

    #[test]
    fn validate_catches_duplicate_row_index() {
        let mut data = create_row_mapping(rows(&[json!("A Co"), json!("Bee")]), "payee").unwrap();
        data.row_mappings[1].original_row_index = 0;
        assert_eq!(data.validate(), Err(ReconError::DuplicateRowIndex { index: 0 }));
    }

    #[test]
    fn validate_catches_bad_unique_index() {
        let mut data = create_row_mapping(rows(&[json!("Frank")]), "payee").unwrap();
        data.row_mappings[0].unique_payee_index = 3;
        assert!(matches!(data.validate(), Err(ReconError::IndexOutOfRange { .. })));
    }

    #[test]
    fn cooperative_matches_sync() {
        let names: Vec<serde_json::Value> =
            (0..2_500).map(|i| json!(format!("Vendor {}", ["Alpha", "Beta", "Gamma"][i % 3]))).collect();
        let sync = create_row_mapping(rows(&names), "payee").unwrap();

        let mut reports = Vec::new();
        let cancel = CancelToken::new();
        let coop = smol::block_on(create_row_mapping_cooperative(
            rows(&names),
            "payee",
            |p| reports.push(p),
            &cancel,
        ))
        .unwrap();

        assert_eq!(sync, coop);
        assert_eq!(reports.len(), 5);
        assert!(reports.last().unwrap().is_complete());
    }

    #[test]
    fn cooperative_respects_cancellation() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let out = smol::block_on(create_row_mapping_cooperative(
            rows(&[json!("Gina")]),
            "payee",
            |_| {},
            &cancel,
        ));
        assert_eq!(out, Err(ReconError::Cancelled));
    }

    #[test]
    fn unique_original_names_keep_spelling() {
        let data = create_row_mapping(
            rows(&[json!("Christa INC"), json!("CHRISTA"), json!("Christa INC"), json!(" ")]),
            "payee",
        )
        .unwrap();
        // Normalized dedup collapses to one payee...
        assert_eq!(data.unique_count(), 2);
        // ...while original-name dedup keeps both spellings and drops blanks.
        assert_eq!(data.unique_original_names(), vec!["Christa INC", "CHRISTA"]);
    }
}
