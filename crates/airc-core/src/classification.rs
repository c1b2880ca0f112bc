//! # Classification Labels
//!
//! The closed set of risk classifications and confidence levels. One
//! definition used across the workspace; every `match` on these enums is
//! exhaustive, so adding a label forces every consumer to handle it.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ValidationError;

/// Risk classification of a subject system.
///
/// Ordered by precedence: when several stage outcomes point at different
/// labels, the highest-precedence one wins.
///
/// | Precedence | Label | Raised by |
/// |---|---|---|
/// | 1 | `Blocked` | Prohibited stage flagged or needs review |
/// | 2 | `HighRiskCandidate` | High-risk stage flagged a category |
/// | 3 | `LimitedRisk` | Transparency obligations apply |
/// | 4 | `MinimalRisk` | none of the above |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    /// Halted at the prohibited-practice gate; needs legal review.
    Blocked,
    /// At least one high-risk category applies.
    HighRiskCandidate,
    /// Transparency obligations apply.
    LimitedRisk,
    /// No stage raised a concern.
    MinimalRisk,
}

impl Classification {
    /// All classifications in precedence order.
    pub fn all() -> &'static [Classification] {
        &[
            Self::Blocked,
            Self::HighRiskCandidate,
            Self::LimitedRisk,
            Self::MinimalRisk,
        ]
    }

    /// The serialized label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blocked => "BLOCKED",
            Self::HighRiskCandidate => "HIGH_RISK_CANDIDATE",
            Self::LimitedRisk => "LIMITED_RISK",
            Self::MinimalRisk => "MINIMAL_RISK",
        }
    }

    /// Lower value means higher precedence.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Blocked => 1,
            Self::HighRiskCandidate => 2,
            Self::LimitedRisk => 3,
            Self::MinimalRisk => 4,
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = ValidationError;

    /// Accepts the serialized label in any case, with `-` or `_` separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::all()
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| ValidationError::UnknownClassification(s.to_string()))
    }
}

/// How much the suggested classification can be relied upon without review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// No stage needed review, or a hard rule fired.
    High,
    /// Exactly one stage needed review.
    Medium,
    /// Two or more stages needed review.
    Low,
}

impl Confidence {
    /// Derive confidence from the number of stages whose outcome needs review.
    pub fn from_needs_review_count(count: usize) -> Self {
        match count {
            0 => Self::High,
            1 => Self::Medium,
            _ => Self::Low,
        }
    }

    /// The serialized label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_labels_match_as_str() {
        for c in Classification::all() {
            let json = serde_json::to_string(c).unwrap();
            assert_eq!(json, format!("\"{}\"", c.as_str()));
        }
    }

    #[test]
    fn from_str_is_lenient_on_case_and_separator() {
        assert_eq!(
            "high-risk-candidate".parse::<Classification>().unwrap(),
            Classification::HighRiskCandidate
        );
        assert_eq!(
            "MINIMAL_RISK".parse::<Classification>().unwrap(),
            Classification::MinimalRisk
        );
        assert!("severe".parse::<Classification>().is_err());
    }

    #[test]
    fn precedence_order_matches_all() {
        let order: Vec<u8> = Classification::all().iter().map(|c| c.precedence()).collect();
        assert_eq!(order, vec![1, 2, 3, 4]);
    }

    #[test]
    fn confidence_thresholds() {
        assert_eq!(Confidence::from_needs_review_count(0), Confidence::High);
        assert_eq!(Confidence::from_needs_review_count(1), Confidence::Medium);
        assert_eq!(Confidence::from_needs_review_count(2), Confidence::Low);
        assert_eq!(Confidence::from_needs_review_count(4), Confidence::Low);
    }
}
