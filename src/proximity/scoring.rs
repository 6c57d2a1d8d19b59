//! Proximity decay and context weighting

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::config::ConfigError;
use crate::types::{ContextZone, RelationshipStrength, SharedColumns, StrengthLevel};

/// Characters over which proximity decays by a factor of e
pub const DECAY_CHARS: f64 = 100.0;

/// `e^(-distance / 100)`: 1.0 for adjacent mentions, effectively 0 past ~500 characters
pub fn proximity_score(distance: u64) -> f64 {
    (-(distance as f64) / DECAY_CHARS).exp().clamp(0.0, 1.0)
}

/// Blend co-occurrence, shared columns and cross-column mentions into one score.
///
/// Components are normalized before weighting (0.4, 0.3, 0.2, 0.1):
/// co-occurrences saturate at 10, shared names at 5, and each distinct pair of
/// differently named columns mentioned alongside the relationship adds 0.1 up
/// to 0.2.
pub fn relationship_strength(
    cooccurrences: u64,
    shared: &SharedColumns,
    cross_column_pairs: usize,
) -> RelationshipStrength {
    let cooccurrence_score = (cooccurrences as f64 / 10.0).min(1.0);
    let column_score = shared.match_score;
    let exact_match_score = (shared.columns.len() as f64 / 5.0).min(1.0);
    let cross_column_score = (cross_column_pairs as f64 / 10.0).min(0.2);

    let overall = cooccurrence_score * 0.4
        + column_score * 0.3
        + exact_match_score * 0.2
        + cross_column_score * 0.1;

    RelationshipStrength {
        overall,
        level: StrengthLevel::from_score(overall),
        cooccurrence_score,
        column_score,
        exact_match_score,
        cross_column_score,
    }
}

/// Multipliers applied to a mention's proximity by the zone it was found in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextWeights {
    pub line: f64,
    pub before: f64,
    pub after: f64,
}

impl ContextWeights {
    /// Mentions on the line and after it count triple, before it single
    pub const TRAILING: ContextWeights = ContextWeights {
        line: 3.0,
        before: 1.0,
        after: 3.0,
    };

    /// Mentions on the line and before it count triple, after it single
    pub const LEADING: ContextWeights = ContextWeights {
        line: 3.0,
        before: 3.0,
        after: 1.0,
    };

    pub fn new(line: f64, before: f64, after: f64) -> Self {
        Self {
            line,
            before,
            after,
        }
    }

    pub fn weight(&self, zone: ContextZone) -> f64 {
        match zone {
            ContextZone::Line => self.line,
            ContextZone::Before => self.before,
            ContextZone::After => self.after,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for zone in ContextZone::ALL {
            let value = self.weight(zone);
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    zone: zone.as_str(),
                    value,
                });
            }
        }
        if self.line == 0.0 && self.before == 0.0 && self.after == 0.0 {
            return Err(ConfigError::AllWeightsZero);
        }
        Ok(())
    }
}

impl Default for ContextWeights {
    fn default() -> Self {
        Self::TRAILING
    }
}

impl fmt::Display for ContextWeights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line_text={}x, context_before={}x, context_after={}x",
            self.line, self.before, self.after
        )
    }
}

/// Parses `line,before,after`, e.g. `3,1,3`
impl FromStr for ContextWeights {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ConfigError::MalformedWeights(s.to_string());

        let values = s
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| malformed())?;

        let &[line, before, after] = values.as_slice() else {
            return Err(malformed());
        };

        let weights = Self::new(line, before, after);
        weights.validate()?;
        Ok(weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proximity_bounds() {
        assert_eq!(proximity_score(0), 1.0);
        assert!((proximity_score(100) - (-1.0f64).exp()).abs() < 1e-12);
        assert!(proximity_score(500) < 0.01);
        assert!(proximity_score(u64::MAX) >= 0.0);
    }

    #[test]
    fn test_proximity_strictly_decreasing() {
        let mut previous = proximity_score(0);
        for distance in [1, 2, 10, 40, 99, 100, 250, 499] {
            let current = proximity_score(distance);
            assert!(current < previous, "not decreasing at {distance}");
            previous = current;
        }
    }

    #[test]
    fn test_relationship_strength_components() {
        let none = SharedColumns::default();
        let weak = relationship_strength(3, &none, 0);
        assert!((weak.overall - 0.12).abs() < 1e-9);
        assert_eq!(weak.level, StrengthLevel::Weak);

        let shared = SharedColumns {
            columns: vec!["DEPARTMENT_ID".into(), "MANAGER_ID".into()],
            match_score: 0.5,
        };
        let moderate = relationship_strength(25, &shared, 7);
        assert_eq!(moderate.cooccurrence_score, 1.0);
        assert!((moderate.exact_match_score - 0.4).abs() < 1e-9);
        assert!((moderate.cross_column_score - 0.2).abs() < 1e-9);
        assert!((moderate.overall - (0.4 + 0.15 + 0.08 + 0.02)).abs() < 1e-9);
        assert_eq!(moderate.level, StrengthLevel::Moderate);

        assert_eq!(relationship_strength(0, &none, 0).level, StrengthLevel::Minimal);
    }

    #[test]
    fn test_presets() {
        assert_eq!(ContextWeights::default(), ContextWeights::TRAILING);
        assert_eq!(ContextWeights::TRAILING.weight(ContextZone::Before), 1.0);
        assert_eq!(ContextWeights::LEADING.weight(ContextZone::After), 1.0);
        assert_eq!(ContextWeights::LEADING.weight(ContextZone::Line), 3.0);
    }

    #[test]
    fn test_parse_weights() {
        let weights: ContextWeights = "3, 3, 1".parse().unwrap();
        assert_eq!(weights, ContextWeights::LEADING);

        assert!(matches!(
            "3,1".parse::<ContextWeights>(),
            Err(ConfigError::MalformedWeights(_))
        ));
        assert!(matches!(
            "a,b,c".parse::<ContextWeights>(),
            Err(ConfigError::MalformedWeights(_))
        ));
        assert!(matches!(
            "3,-1,3".parse::<ContextWeights>(),
            Err(ConfigError::InvalidWeight { zone: "context_before", .. })
        ));
        assert!(matches!(
            "0,0,0".parse::<ContextWeights>(),
            Err(ConfigError::AllWeightsZero)
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ContextWeights::TRAILING.to_string(),
            "line_text=3x, context_before=1x, context_after=3x"
        );
    }
}
