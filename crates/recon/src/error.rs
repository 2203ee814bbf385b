use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ReconError {
    /// No rows to process.
    EmptyInput,
    /// The payee column is absent from every row.
    MissingColumn { column: String },
    /// Chunk bound of zero or above the oracle's hard cap.
    InvalidChunkSize(usize),
    /// Two parallel collections disagree on length.
    RowCountMismatch {
        stage: &'static str,
        expected: usize,
        actual: usize,
    },
    /// Classification results do not line up with the unique payee list.
    ResultCountMismatch { expected: usize, actual: usize },
    /// An original row index was produced or processed twice.
    DuplicateRowIndex { index: usize },
    /// An index points outside the collection it addresses.
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },
    /// Reconciliation finished with an output slot never written.
    UnfilledRow { index: usize },
    /// The pass observed a cancelled token at a chunk boundary.
    Cancelled,
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error.
    ConfigValidation(String),
}

impl ReconError {
    /// Structural invariant violations signal a broken upstream contract.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::RowCountMismatch { .. }
                | Self::ResultCountMismatch { .. }
                | Self::DuplicateRowIndex { .. }
                | Self::IndexOutOfRange { .. }
                | Self::UnfilledRow { .. }
        )
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "input validation error: no rows to process"),
            Self::MissingColumn { column } => {
                write!(f, "input validation error: payee column '{column}' not found in any row")
            }
            Self::InvalidChunkSize(n) => {
                write!(f, "input validation error: invalid chunk size {n}")
            }
            Self::RowCountMismatch { stage, expected, actual } => write!(
                f,
                "invariant violated ({stage}): expected {expected} rows, found {actual}"
            ),
            Self::ResultCountMismatch { expected, actual } => write!(
                f,
                "invariant violated: expected {expected} classification results (one per unique payee), found {actual}"
            ),
            Self::DuplicateRowIndex { index } => {
                write!(f, "invariant violated: original row {index} processed more than once")
            }
            Self::IndexOutOfRange { what, index, len } => {
                write!(f, "invariant violated: {what} index {index} out of range (len {len})")
            }
            Self::UnfilledRow { index } => {
                write!(f, "invariant violated: output row {index} was never written")
            }
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
