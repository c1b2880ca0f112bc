//! # Timestamps
//!
//! Version records are digested over their canonical bytes, so one instant
//! must always render the same way: `YYYY-MM-DDTHH:MM:SSZ`, UTC, whole
//! seconds.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A UTC instant with whole-second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current time, truncated to the second.
    pub fn now() -> Self {
        Self(Utc::now().trunc_subsecs(0))
    }

    /// Parse RFC 3339 with a `Z` suffix. Offsets other than UTC are rejected
    /// rather than converted, so stored and supplied values compare as written.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: String| ValidationError::InvalidTimestamp {
            value: s.to_string(),
            reason,
        };
        if !s.ends_with('Z') {
            return Err(invalid("must be UTC with a Z suffix".to_string()));
        }
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| invalid(e.to_string()))?;
        Ok(Self(dt.with_timezone(&Utc).trunc_subsecs(0)))
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Shifted forward by whole days. Used for scheduled review dates.
    ///
    /// `None` when the result falls outside the representable range.
    pub fn plus_days(&self, days: i64) -> Option<Self> {
        Duration::try_days(days)
            .and_then(|d| self.0.checked_add_signed(d))
            .map(Self)
    }

    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}
