use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum DedupError {
    /// No records to compare.
    EmptyInput,
    /// Two records share an id.
    DuplicateId(String),
    /// Thresholds must satisfy `0 <= low < high <= 100`.
    InvalidThresholds { low: f64, high: f64 },
    /// The token was cancelled between pairs.
    Cancelled,
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error.
    ConfigValidation(String),
}

impl fmt::Display for DedupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "input validation error: no records to compare"),
            Self::DuplicateId(id) => {
                write!(f, "input validation error: record id '{id}' appears more than once")
            }
            Self::InvalidThresholds { low, high } => write!(
                f,
                "invalid thresholds: need 0 <= low < high <= 100, got low={low} high={high}"
            ),
            Self::Cancelled => write!(f, "duplicate detection cancelled"),
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
        }
    }
}

impl std::error::Error for DedupError {}
