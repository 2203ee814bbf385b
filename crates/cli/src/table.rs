//! CSV input and JSON output.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use payeekit_recon::Record;
use serde::Serialize;
use serde_json::Value;

use crate::exit_codes::{EXIT_INPUT_INVALID, EXIT_INPUT_IO, EXIT_INPUT_PARSE};
use crate::CliError;

/// Read a headed CSV file into records, one per data row. Columns keep file
/// order; every cell is a string. Ragged rows are padded with empty strings.
pub fn read_csv(path: &Path) -> Result<Vec<Record>, CliError> {
    let file = fs::File::open(path).map_err(|e| {
        CliError::new(EXIT_INPUT_IO, format!("cannot read {}: {e}", path.display()))
    })?;
    read_csv_from(file, &path.display().to_string())
}

pub fn read_csv_from<R: io::Read>(reader: R, label: &str) -> Result<Vec<Record>, CliError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| CliError::new(EXIT_INPUT_PARSE, format!("{label}: {e}")))?
        .clone();
    if headers.is_empty() {
        return Err(CliError::new(EXIT_INPUT_INVALID, format!("{label}: no header row")));
    }

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            CliError::new(EXIT_INPUT_PARSE, format!("{label}: row {}: {e}", line + 1))
        })?;
        let row: Record = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.to_string(), Value::String(record.get(i).unwrap_or("").to_string())))
            .collect();
        rows.push(row);
    }
    log::info!("read {} rows from {label}", rows.len());
    Ok(rows)
}

/// Write `value` as pretty JSON to `output` when given, and to stdout when
/// `json` is set.
pub fn emit_json<T: Serialize>(value: &T, json: bool, output: Option<&PathBuf>) -> Result<(), CliError> {
    if !json && output.is_none() {
        return Ok(());
    }
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::new(crate::exit_codes::EXIT_ERROR, format!("JSON serialization error: {e}")))?;

    if let Some(path) = output {
        fs::write(path, &text).map_err(|e| {
            CliError::new(EXIT_INPUT_IO, format!("cannot write {}: {e}", path.display()))
        })?;
        eprintln!("wrote {}", path.display());
    }
    if json {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{text}").map_err(|e| CliError::new(EXIT_INPUT_IO, e.to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_rows_in_column_order() {
        let csv = "Payee,Amount\nAcme Inc,10\n\"Smith, John\",20\n";
        let rows = read_csv_from(csv.as_bytes(), "test").unwrap();
        assert_eq!(rows.len(), 2);
        let keys: Vec<&String> = rows[0].keys().collect();
        assert_eq!(keys, vec!["Payee", "Amount"]);
        assert_eq!(rows[1]["Payee"], Value::String("Smith, John".into()));
    }

    #[test]
    fn ragged_rows_are_padded() {
        let rows = read_csv_from("Payee,Amount\nAcme\n".as_bytes(), "test").unwrap();
        assert_eq!(rows[0]["Amount"], Value::String(String::new()));
    }

    #[test]
    fn header_only_file_has_no_rows() {
        let rows = read_csv_from("Payee\n".as_bytes(), "test").unwrap();
        assert!(rows.is_empty());
    }
}
