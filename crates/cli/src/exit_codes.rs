//! CLI Exit Code Registry
//!
//! Single source of truth for `payee` exit codes. Scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                                   |
//! |---------|-----------|-----------------------------------------------|
//! | 0       | Universal | Success                                       |
//! | 1       | Universal | General error (unspecified)                   |
//! | 2       | Universal | CLI usage error (bad args)                    |
//! | 3-9     | input     | Reading, parsing and validating the table     |
//! | 10-19   | config    | Settings file and API key                     |
//! | 20-29   | engine    | Structural invariant violations               |
//! | 30-39   | classify  | Oracle outcomes                               |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Input (3-9)
// =============================================================================

/// Cannot read the input file or write the output file.
pub const EXIT_INPUT_IO: u8 = 3;

/// Input CSV is malformed.
pub const EXIT_INPUT_PARSE: u8 = 4;

/// Input is well-formed but unusable (no rows, payee column missing).
pub const EXIT_INPUT_INVALID: u8 = 5;

// =============================================================================
// Config (10-19)
// =============================================================================

/// Settings file cannot be parsed or fails validation.
pub const EXIT_CONFIG_INVALID: u8 = 10;

/// The oracle is needed but no API key was found.
pub const EXIT_CONFIG_MISSING_KEY: u8 = 11;

// =============================================================================
// Engine (20-29)
// =============================================================================

/// A row-count or index invariant failed. Output was not written.
pub const EXIT_ENGINE_INVARIANT: u8 = 20;

// =============================================================================
// Classify (30-39)
// =============================================================================

/// `--strict`: at least one row ended in the Failed tier. Output was written.
pub const EXIT_CLASSIFY_FAILED_ROWS: u8 = 30;

/// The oracle client could not be constructed.
pub const EXIT_CLASSIFY_ORACLE: u8 = 31;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_INPUT_IO,
            EXIT_INPUT_PARSE,
            EXIT_INPUT_INVALID,
            EXIT_CONFIG_INVALID,
            EXIT_CONFIG_MISSING_KEY,
            EXIT_ENGINE_INVARIANT,
            EXIT_CLASSIFY_FAILED_ROWS,
            EXIT_CLASSIFY_ORACLE,
        ];
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }
}
