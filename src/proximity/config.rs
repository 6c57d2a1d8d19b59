//! Relationship engine configuration

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::scoring::ContextWeights;

/// Rejected engine configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("distance threshold must be positive")]
    NonPositiveThreshold,

    #[error("invalid {zone} weight {value}: weights must be finite and non-negative")]
    InvalidWeight { zone: &'static str, value: f64 },

    #[error("at least one context weight must be positive")]
    AllWeightsZero,

    #[error("invalid weights '{0}': expected three numbers as line,before,after")]
    MalformedWeights(String),

    #[error("characters per line must be positive")]
    ZeroCharsPerLine,

    #[error("top-N must be at least 1")]
    ZeroTopN,

    #[error("minimum co-occurrence must be at least 1")]
    ZeroMinCooccurrence,

    #[error("invalid minimum strength {0}: expected a value between 0 and 1")]
    InvalidMinStrength(f64),
}

/// Options for the proximity relationship engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProximityConfig {
    /// Mentions farther apart than this many characters are unrelated
    pub max_distance: u64,
    pub weights: ContextWeights,
    /// Effective characters per line, used when a reference has no character offset
    pub chars_per_line: u64,
    /// Relationships and columns kept per object
    pub top_n: usize,
    /// Entries kept in each global ranking
    pub global_top: usize,
    /// Object relationships seen fewer times than this are dropped
    pub min_cooccurrence: u64,
    /// Object relationships with a lower overall strength are dropped
    pub min_strength: f64,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            max_distance: 500,
            weights: ContextWeights::default(),
            chars_per_line: 40,
            top_n: 3,
            global_top: 10,
            min_cooccurrence: 1,
            min_strength: 0.0,
        }
    }
}

impl ProximityConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_distance == 0 {
            return Err(ConfigError::NonPositiveThreshold);
        }
        self.weights.validate()?;
        if self.chars_per_line == 0 {
            return Err(ConfigError::ZeroCharsPerLine);
        }
        if self.top_n == 0 {
            return Err(ConfigError::ZeroTopN);
        }
        if self.min_cooccurrence == 0 {
            return Err(ConfigError::ZeroMinCooccurrence);
        }
        if !(0.0..=1.0).contains(&self.min_strength) {
            return Err(ConfigError::InvalidMinStrength(self.min_strength));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ProximityConfig::default();
        assert_eq!(config.max_distance, 500);
        assert_eq!(config.chars_per_line, 40);
        assert_eq!(config.top_n, 3);
        assert_eq!(config.min_cooccurrence, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_invalid_values() {
        let base = ProximityConfig::default();

        let config = ProximityConfig {
            max_distance: 0,
            ..base.clone()
        };
        assert_eq!(config.validate(), Err(ConfigError::NonPositiveThreshold));

        let config = ProximityConfig {
            weights: ContextWeights::new(f64::NAN, 1.0, 1.0),
            ..base.clone()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWeight { zone: "line_text", .. })
        ));

        let config = ProximityConfig {
            weights: ContextWeights::new(0.0, 0.0, 0.0),
            ..base.clone()
        };
        assert_eq!(config.validate(), Err(ConfigError::AllWeightsZero));

        let config = ProximityConfig {
            chars_per_line: 0,
            ..base.clone()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroCharsPerLine));

        let config = ProximityConfig {
            top_n: 0,
            ..base.clone()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroTopN));

        let config = ProximityConfig {
            min_cooccurrence: 0,
            ..base.clone()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroMinCooccurrence));

        let config = ProximityConfig {
            min_strength: 1.5,
            ..base.clone()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidMinStrength(1.5)));

        let config = ProximityConfig {
            min_strength: f64::NAN,
            ..base
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMinStrength(_))
        ));
    }
}
