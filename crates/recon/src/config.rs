use std::time::Duration;

use payeekit_core::ResiliencePolicy;
use serde::{Deserialize, Serialize};

use crate::chunk::{DEFAULT_MAX_UNIQUE_PER_CHUNK, ORACLE_HARD_CAP};
use crate::error::ReconError;

/// Options for the chunked classification pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Unique payees per oracle submission. Must not exceed the oracle's hard cap.
    pub max_unique_per_chunk: usize,
    /// Chunk submissions in flight at once.
    pub max_concurrent_chunks: usize,
    /// Per-attempt timeout for one chunk round-trip.
    pub timeout_secs: u64,
    pub retries: u32,
    pub backoff_initial_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            max_unique_per_chunk: DEFAULT_MAX_UNIQUE_PER_CHUNK,
            max_concurrent_chunks: 2,
            timeout_secs: 900,
            retries: 2,
            backoff_initial_ms: 1_000,
            backoff_max_ms: 30_000,
        }
    }
}

impl ClassificationConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ClassificationConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.max_unique_per_chunk == 0 || self.max_unique_per_chunk > ORACLE_HARD_CAP {
            return Err(ReconError::ConfigValidation(format!(
                "max_unique_per_chunk must be in 1..={ORACLE_HARD_CAP}, got {}",
                self.max_unique_per_chunk
            )));
        }
        if self.max_concurrent_chunks == 0 {
            return Err(ReconError::ConfigValidation(
                "max_concurrent_chunks must be at least 1".into(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ReconError::ConfigValidation(
                "timeout_secs must be at least 1".into(),
            ));
        }
        if self.backoff_initial_ms > self.backoff_max_ms {
            return Err(ReconError::ConfigValidation(format!(
                "backoff_initial_ms ({}) exceeds backoff_max_ms ({})",
                self.backoff_initial_ms, self.backoff_max_ms
            )));
        }
        Ok(())
    }

    pub fn policy(&self) -> ResiliencePolicy {
        ResiliencePolicy::new(Duration::from_secs(self.timeout_secs), self.retries).with_backoff(
            Duration::from_millis(self.backoff_initial_ms),
            Duration::from_millis(self.backoff_max_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_defaults() {
        let config = ClassificationConfig::from_toml("").unwrap();
        assert_eq!(config, ClassificationConfig::default());
        assert_eq!(config.max_unique_per_chunk, 45_000);
    }

    #[test]
    fn partial_override() {
        let config = ClassificationConfig::from_toml(
            r#"
max_unique_per_chunk = 10000
retries = 0
"#,
        )
        .unwrap();
        assert_eq!(config.max_unique_per_chunk, 10_000);
        assert_eq!(config.retries, 0);
        assert_eq!(config.max_concurrent_chunks, 2);

        let policy = config.policy();
        assert_eq!(policy.timeout, Duration::from_secs(900));
        assert_eq!(policy.retries, 0);
        assert_eq!(policy.backoff_max, Duration::from_secs(30));
    }

    #[test]
    fn rejects_chunk_above_hard_cap() {
        let err = ClassificationConfig::from_toml("max_unique_per_chunk = 60000").unwrap_err();
        assert!(matches!(err, ReconError::ConfigValidation(_)));
        assert!(err.to_string().contains("50000"));
    }

    #[test]
    fn rejects_zero_concurrency() {
        let err = ClassificationConfig::from_toml("max_concurrent_chunks = 0").unwrap_err();
        assert!(matches!(err, ReconError::ConfigValidation(_)));
    }

    #[test]
    fn rejects_unparseable() {
        let err = ClassificationConfig::from_toml("retries = \"many\"").unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }
}
