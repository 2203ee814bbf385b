use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfidenceTier {
    /// At or above the high threshold: duplicate.
    High,
    /// At or below the low threshold: distinct.
    Low,
    /// In between: needs a judge.
    Ambiguous,
}

impl ConfidenceTier {
    /// Bucket a 0-100 score. Assumes `low < high`. Both bounds are inclusive.
    ///
    /// Guaranteed under a raised `high` (same `low`):
    /// - no pair becomes High that was not High before;
    /// - membership in Low is unchanged;
    /// - a pair that was High stays High or drops to Ambiguous, never Low.
    ///
    /// A stricter high threshold therefore only ever moves pairs from High
    /// into the judged Ambiguous tier.
    pub fn classify(score: f64, low: f64, high: f64) -> Self {
        if score >= high {
            Self::High
        } else if score <= low {
            Self::Low
        } else {
            Self::Ambiguous
        }
    }
}

impl std::fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "High"),
            Self::Low => write!(f, "Low"),
            Self::Ambiguous => write!(f, "Ambiguous"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn boundaries_are_inclusive() {
        assert_eq!(ConfidenceTier::classify(95.0, 75.0, 95.0), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::classify(75.0, 75.0, 95.0), ConfidenceTier::Low);
        assert_eq!(ConfidenceTier::classify(75.1, 75.0, 95.0), ConfidenceTier::Ambiguous);
        assert_eq!(ConfidenceTier::classify(100.0, 75.0, 95.0), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::classify(0.0, 75.0, 95.0), ConfidenceTier::Low);
    }

    proptest! {
        #[test]
        fn raising_high_threshold_is_monotone(
            score in 0.0f64..=100.0,
            low in 0.0f64..50.0,
            high in 50.5f64..=100.0,
            bump in 0.0f64..=50.0,
        ) {
            let raised = (high + bump).min(100.0);
            let before = ConfidenceTier::classify(score, low, high);
            let after = ConfidenceTier::classify(score, low, raised);

            // High under the stricter threshold was High under the old one.
            if after == ConfidenceTier::High {
                prop_assert_eq!(before, ConfidenceTier::High);
            }
            // A pair that cleared the old threshold can only stay High or become Ambiguous.
            if before == ConfidenceTier::High {
                prop_assert_ne!(after, ConfidenceTier::Low);
            }
            // The Low tier does not depend on the high threshold.
            prop_assert_eq!(before == ConfidenceTier::Low, after == ConfidenceTier::Low);
        }
    }
}
