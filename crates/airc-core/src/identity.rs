//! # Identity Newtypes
//!
//! Newtype wrappers for the identifiers the engine passes around.
//! You cannot pass a [`ReviewerId`] where a [`SubjectId`] is expected,
//! and a [`VersionNumber`] cannot be zero.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Stable identifier of a subject system under classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub Uuid);

impl SubjectId {
    /// Generate a new random subject identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parse a subject identifier from its UUID string form.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ValidationError::InvalidSubjectId(s.to_string()))
    }
}

impl Default for SubjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for SubjectId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a human reviewer, as known to the authorization collaborator.
///
/// Trimmed, non-empty, at most 256 characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReviewerId(String);

impl ReviewerId {
    const MAX_LEN: usize = 256;

    /// Create a validated reviewer identity.
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = s.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.chars().count() > Self::MAX_LEN {
            return Err(ValidationError::InvalidReviewerId(raw));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The reviewer identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ReviewerId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ReviewerId> for String {
    fn from(id: ReviewerId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ReviewerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sequential version number of a classification, starting at 1 per subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct VersionNumber(u64);

impl VersionNumber {
    /// The first version of every subject.
    pub const FIRST: VersionNumber = VersionNumber(1);

    /// Create a version number. Zero is rejected.
    pub fn new(n: u64) -> Result<Self, ValidationError> {
        if n == 0 {
            return Err(ValidationError::InvalidVersionNumber(n));
        }
        Ok(Self(n))
    }

    /// The raw number.
    pub fn get(&self) -> u64 {
        self.0
    }

    /// The version that follows this one.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// The version number that follows an optional latest version.
    pub fn after(latest: Option<VersionNumber>) -> Self {
        latest.map_or(Self::FIRST, |v| v.next())
    }
}

impl TryFrom<u64> for VersionNumber {
    type Error = ValidationError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VersionNumber> for u64 {
    fn from(v: VersionNumber) -> Self {
        v.0
    }
}

impl std::fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}
