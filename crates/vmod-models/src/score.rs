//! Decimal moderation scores.
//!
//! Scores travel through the pipeline as the exact decimal text the provider
//! produced, so that a value read from the report is republished to the
//! review tool without float formatting drift. The parsed value is kept
//! alongside for comparisons.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A score that failed to parse as a finite decimal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid score: {0:?}")]
pub struct ScoreParseError(pub String);

/// A moderation score kept as decimal text plus its parsed value.
#[derive(Debug, Clone)]
pub struct Score {
    text: String,
    value: f64,
}

impl Score {
    /// The zero score, rendered as `"0"`.
    pub fn zero() -> Self {
        Self {
            text: "0".to_string(),
            value: 0.0,
        }
    }

    /// Build a score from a computed probability.
    ///
    /// Non-finite values collapse to zero.
    pub fn from_value(value: f64) -> Self {
        if !value.is_finite() {
            return Self::zero();
        }
        Self {
            text: value.to_string(),
            value,
        }
    }

    /// The decimal text as received.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The parsed value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Whether the score is strictly above `threshold`.
    pub fn exceeds(&self, threshold: f64) -> bool {
        self.value > threshold
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::zero()
    }
}

impl FromStr for Score {
    type Err = ScoreParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Self {
                text: trimmed.to_string(),
                value,
            }),
            _ => Err(ScoreParseError(s.to_string())),
        }
    }
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.value.partial_cmp(&other.value)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

/// Reports carry scores either as JSON numbers or as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawScore {
    Number(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawScore::deserialize(deserializer)? {
            RawScore::Number(value) if value.is_finite() => Ok(Self::from_value(value)),
            RawScore::Number(value) => Err(serde::de::Error::custom(ScoreParseError(
                value.to_string(),
            ))),
            RawScore::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_keeps_original_text() {
        let score: Score = "0.900".parse().unwrap();
        assert_eq!(score.as_str(), "0.900");
        assert!((score.value() - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_score_rejects_garbage() {
        assert!("abc".parse::<Score>().is_err());
        assert!("NaN".parse::<Score>().is_err());
        assert!("".parse::<Score>().is_err());
    }

    #[test]
    fn test_score_from_value_formatting() {
        assert_eq!(Score::from_value(0.8).as_str(), "0.8");
        assert_eq!(Score::from_value(0.00001).as_str(), "0.00001");
        assert_eq!(Score::from_value(f64::NAN).as_str(), "0");
    }

    #[test]
    fn test_score_deserializes_numbers_and_strings() {
        let from_number: Score = serde_json::from_str("0.25").unwrap();
        let from_text: Score = serde_json::from_str("\"0.25\"").unwrap();
        assert_eq!(from_number, from_text);
        assert_eq!(from_text.as_str(), "0.25");
        assert!(serde_json::from_str::<Score>("\"high\"").is_err());
    }

    #[test]
    fn test_score_serializes_as_text() {
        let score: Score = "0.10".parse().unwrap();
        assert_eq!(serde_json::to_string(&score).unwrap(), "\"0.10\"");
    }

    #[test]
    fn test_exceeds_is_strict() {
        let score: Score = "0.5".parse().unwrap();
        assert!(!score.exceeds(0.5));
        assert!(score.exceeds(0.49));
    }
}
