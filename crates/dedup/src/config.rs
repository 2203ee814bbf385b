use std::time::Duration;

use payeekit_core::ResiliencePolicy;
use serde::{Deserialize, Serialize};

use crate::error::DedupError;

/// Options for duplicate detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicateConfig {
    /// Scores at or above this are duplicates without further review.
    pub high_threshold: f64,
    /// Scores at or below this are distinct without further review.
    pub low_threshold: f64,
    /// Send the ambiguous tier to the AI judge. When off, ambiguous pairs are distinct.
    pub ai_enabled: bool,
    /// Pause between consecutive judge calls.
    pub ai_call_delay_ms: u64,
    pub ai_timeout_secs: u64,
    pub ai_retries: u32,
    /// Only compare records sharing a block key.
    pub blocking: bool,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            high_threshold: 95.0,
            low_threshold: 75.0,
            ai_enabled: true,
            ai_call_delay_ms: 250,
            ai_timeout_secs: 30,
            ai_retries: 1,
            blocking: true,
        }
    }
}

impl DuplicateConfig {
    pub fn from_toml(input: &str) -> Result<Self, DedupError> {
        let config: DuplicateConfig =
            toml::from_str(input).map_err(|e| DedupError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DedupError> {
        let (low, high) = (self.low_threshold, self.high_threshold);
        let in_range = |v: f64| v.is_finite() && (0.0..=100.0).contains(&v);
        if !in_range(low) || !in_range(high) || low >= high {
            return Err(DedupError::InvalidThresholds { low, high });
        }
        if self.ai_enabled && self.ai_timeout_secs == 0 {
            return Err(DedupError::ConfigValidation(
                "ai_timeout_secs must be at least 1 when AI judgment is enabled".into(),
            ));
        }
        Ok(())
    }

    pub fn judge_policy(&self) -> ResiliencePolicy {
        ResiliencePolicy::new(Duration::from_secs(self.ai_timeout_secs), self.ai_retries)
    }

    pub fn call_delay(&self) -> Duration {
        Duration::from_millis(self.ai_call_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = DuplicateConfig::from_toml("").unwrap();
        assert_eq!(config, DuplicateConfig::default());
        assert_eq!(config.high_threshold, 95.0);
        assert_eq!(config.low_threshold, 75.0);
        assert_eq!(config.judge_policy().retries, 1);
    }

    #[test]
    fn override_thresholds() {
        let config = DuplicateConfig::from_toml(
            r#"
high_threshold = 90.0
low_threshold = 60.0
ai_enabled = false
"#,
        )
        .unwrap();
        assert_eq!(config.high_threshold, 90.0);
        assert!(!config.ai_enabled);
        assert!(config.blocking);
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let err = DuplicateConfig::from_toml("high_threshold = 70.0").unwrap_err();
        assert_eq!(err, DedupError::InvalidThresholds { low: 75.0, high: 70.0 });
    }

    #[test]
    fn rejects_out_of_range() {
        let err = DuplicateConfig::from_toml("high_threshold = 101.0").unwrap_err();
        assert!(matches!(err, DedupError::InvalidThresholds { .. }));
    }

    #[test]
    fn rejects_bad_type() {
        let err = DuplicateConfig::from_toml("blocking = 3").unwrap_err();
        assert!(matches!(err, DedupError::ConfigParse(_)));
    }
}
