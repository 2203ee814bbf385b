//! Splitting a unique payee set into oracle-sized submissions.
//!
//! Chunking is a capacity accommodation only. Slices are contiguous, so
//! concatenating per-chunk results in chunk order reproduces the unchunked
//! result vector exactly.

use serde::Serialize;

use crate::error::ReconError;
use crate::model::{ClassificationResult, PayeeRowData, Record, RowMapping};

/// Documented per-job limit of the classification oracle.
pub const ORACLE_HARD_CAP: usize = 50_000;

/// Default bound, kept below [`ORACLE_HARD_CAP`] as a safety margin.
pub const DEFAULT_MAX_UNIQUE_PER_CHUNK: usize = 45_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub chunk_id: String,
    /// Global index of the first unique payee in this chunk.
    pub unique_offset: usize,
    pub unique_payee_names: Vec<String>,
    pub unique_normalized_names: Vec<String>,
    /// Mappings whose `unique_payee_index` falls in this chunk (global indices kept).
    pub row_mappings: Vec<RowMapping>,
    /// Original rows referenced by `row_mappings`, same order.
    pub original_file_data: Vec<Record>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.unique_payee_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unique_payee_names.is_empty()
    }

    /// Global unique-payee range covered by this chunk.
    pub fn unique_range(&self) -> std::ops::Range<usize> {
        self.unique_offset..self.unique_offset + self.len()
    }
}

/// Partition `data` into chunks of at most `max_unique_per_chunk` unique payees.
pub fn split_for_submission(
    data: &PayeeRowData,
    max_unique_per_chunk: usize,
) -> Result<Vec<Chunk>, ReconError> {
    if max_unique_per_chunk == 0 || max_unique_per_chunk > ORACLE_HARD_CAP {
        return Err(ReconError::InvalidChunkSize(max_unique_per_chunk));
    }
    data.validate()?;

    let unique_count = data.unique_payee_names.len();
    if unique_count <= max_unique_per_chunk {
        return Ok(vec![Chunk {
            chunk_index: 0,
            total_chunks: 1,
            chunk_id: chunk_id(0, 1, 0, unique_count),
            unique_offset: 0,
            unique_payee_names: data.unique_payee_names.clone(),
            unique_normalized_names: data.unique_normalized_names.clone(),
            row_mappings: data.row_mappings.clone(),
            original_file_data: data.original_file_data.clone(),
        }]);
    }

    let total_chunks = unique_count.div_ceil(max_unique_per_chunk);

    // Bucket mappings by chunk in one pass, keeping original row order.
    let mut mappings_by_chunk: Vec<Vec<&RowMapping>> = vec![Vec::new(); total_chunks];
    for mapping in &data.row_mappings {
        let chunk_index = mapping.unique_payee_index / max_unique_per_chunk;
        let bucket = mappings_by_chunk.get_mut(chunk_index).ok_or(ReconError::IndexOutOfRange {
            what: "unique payee",
            index: mapping.unique_payee_index,
            len: unique_count,
        })?;
        bucket.push(mapping);
    }

    let mut chunks = Vec::with_capacity(total_chunks);
    for (chunk_index, mappings) in mappings_by_chunk.into_iter().enumerate() {
        let start = chunk_index * max_unique_per_chunk;
        let end = (start + max_unique_per_chunk).min(unique_count);

        let mut original_file_data = Vec::with_capacity(mappings.len());
        for mapping in &mappings {
            let row = data
                .original_file_data
                .get(mapping.original_row_index)
                .ok_or(ReconError::IndexOutOfRange {
                    what: "original row",
                    index: mapping.original_row_index,
                    len: data.original_file_data.len(),
                })?;
            original_file_data.push(row.clone());
        }

        chunks.push(Chunk {
            chunk_index,
            total_chunks,
            chunk_id: chunk_id(chunk_index, total_chunks, start, end),
            unique_offset: start,
            unique_payee_names: data.unique_payee_names[start..end].to_vec(),
            unique_normalized_names: data.unique_normalized_names[start..end].to_vec(),
            row_mappings: mappings.into_iter().cloned().collect(),
            original_file_data,
        });
    }

    log::info!(
        "split {unique_count} unique payees into {total_chunks} chunks of at most {max_unique_per_chunk}"
    );
    Ok(chunks)
}

/// Concatenate per-chunk results in chunk order.
///
/// Each chunk must contribute exactly one result per unique payee it carries.
pub fn merge_chunk_results(
    chunks: &[Chunk],
    per_chunk_results: Vec<Vec<ClassificationResult>>,
) -> Result<Vec<ClassificationResult>, ReconError> {
    if per_chunk_results.len() != chunks.len() {
        return Err(ReconError::RowCountMismatch {
            stage: "chunk results",
            expected: chunks.len(),
            actual: per_chunk_results.len(),
        });
    }

    let total: usize = chunks.iter().map(Chunk::len).sum();
    let mut merged = Vec::with_capacity(total);
    for (chunk, results) in chunks.iter().zip(per_chunk_results) {
        if results.len() != chunk.len() {
            return Err(ReconError::ResultCountMismatch {
                expected: chunk.len(),
                actual: results.len(),
            });
        }
        merged.extend(results);
    }
    Ok(merged)
}

fn chunk_id(index: usize, total: usize, start: usize, end: usize) -> String {
    format!("chunk-{}-of-{}-u{}-{}", index + 1, total, start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Classification;
    use crate::row_map::create_row_mapping;
    use serde_json::json;

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

    #[test]
    fn inconsistent_data_is_rejected_not_sliced() {
        let mut d = data(&["Alice", "Bob", "Carol"]);
        d.unique_normalized_names.pop();
        let err = split_for_submission(&d, 2).unwrap_err();
        assert_eq!(
            err,
            ReconError::RowCountMismatch {
                stage: "unique payee lists",
                expected: 3,
                actual: 2,
            }
        );
    }

    #[test]
    fn small_set_is_one_chunk() {
        let d = data(&["Alice", "Bob", "Alice"]);
        let chunks = split_for_submission(&d, 10).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].total_chunks, 1);
        assert_eq!(chunks[0].unique_payee_names, d.unique_payee_names);
        assert_eq!(chunks[0].row_mappings, d.row_mappings);
        assert_eq!(chunks[0].original_file_data, d.original_file_data);
    }

    #[test]
    fn chunks_carry_only_their_rows() {
        // Unique order: Alice(0) Bob(1) Carol(2) Dave(3) Erin(4)
        let d = data(&["Alice", "Bob", "Carol", "Alice", "Dave", "Erin", "Carol"]);
        let chunks = split_for_submission(&d, 2).unwrap();
        assert_eq!(chunks.len(), 3);

        assert_eq!(chunks[0].unique_payee_names, vec!["Alice", "Bob"]);
        let rows0: Vec<usize> = chunks[0].row_mappings.iter().map(|m| m.original_row_index).collect();
        assert_eq!(rows0, vec![0, 1, 3]);

        assert_eq!(chunks[1].unique_payee_names, vec!["Carol", "Dave"]);
        assert_eq!(chunks[1].unique_offset, 2);
        let rows1: Vec<usize> = chunks[1].row_mappings.iter().map(|m| m.original_row_index).collect();
        assert_eq!(rows1, vec![2, 4, 6]);
        assert_eq!(chunks[1].original_file_data[1]["payee"], json!("Dave"));

        assert_eq!(chunks[2].unique_payee_names, vec!["Erin"]);
        assert_eq!(chunks[2].unique_range(), 4..5);

        let carried: usize = chunks.iter().map(|c| c.row_mappings.len()).sum();
        assert_eq!(carried, d.row_count());
    }

    #[test]
    fn rejects_bad_bounds() {
        let d = data(&["Alice"]);
        assert_eq!(split_for_submission(&d, 0), Err(ReconError::InvalidChunkSize(0)));
        assert_eq!(
            split_for_submission(&d, ORACLE_HARD_CAP + 1),
            Err(ReconError::InvalidChunkSize(ORACLE_HARD_CAP + 1))
        );
    }

    #[test]
    fn merge_checks_per_chunk_counts() {
        let d = data(&["Alice", "Bob", "Carol"]);
        let chunks = split_for_submission(&d, 2).unwrap();
        let ok = merge_chunk_results(
            &chunks,
            vec![
                vec![
                    ClassificationResult::success("Alice", Classification::Individual, 90.0, ""),
                    ClassificationResult::success("Bob", Classification::Individual, 90.0, ""),
                ],
                vec![ClassificationResult::success("Carol", Classification::Individual, 90.0, "")],
            ],
        )
        .unwrap();
        assert_eq!(ok.len(), 3);
        assert_eq!(ok[2].payee_name, "Carol");

        let err = merge_chunk_results(&chunks, vec![vec![], vec![]]).unwrap_err();
        assert_eq!(err, ReconError::ResultCountMismatch { expected: 2, actual: 0 });
    }
}
