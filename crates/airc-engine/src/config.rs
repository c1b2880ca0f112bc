//! Engine configuration.
//!
//! Defaults suit production. Override via environment variables or explicit
//! construction for tests.

use thiserror::Error;

/// Longest accepted review interval: one hundred years.
pub const MAX_REVIEW_INTERVAL_DAYS: i64 = 36_500;

/// Tunables for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Minimum trimmed length of an override rationale.
    pub min_rationale_chars: usize,
    /// Days from a seal to the next scheduled review.
    pub review_interval_days: i64,
    /// Maximum audit entries held in memory.
    pub audit_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_rationale_chars: 10,
            review_interval_days: 365,
            audit_capacity: 10_000,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `AIRC_MIN_RATIONALE_CHARS` (default: 10)
    /// - `AIRC_REVIEW_INTERVAL_DAYS` (default: 365, 1 to [`MAX_REVIEW_INTERVAL_DAYS`])
    /// - `AIRC_AUDIT_CAPACITY` (default: 10000, must be positive)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            min_rationale_chars: parse_var(
                &lookup,
                "AIRC_MIN_RATIONALE_CHARS",
                defaults.min_rationale_chars,
            )?,
            review_interval_days: parse_var(
                &lookup,
                "AIRC_REVIEW_INTERVAL_DAYS",
                defaults.review_interval_days,
            )?,
            audit_capacity: parse_var(&lookup, "AIRC_AUDIT_CAPACITY", defaults.audit_capacity)?,
        };
        if !(1..=MAX_REVIEW_INTERVAL_DAYS).contains(&config.review_interval_days) {
            return Err(ConfigError::OutOfRange(
                "AIRC_REVIEW_INTERVAL_DAYS".into(),
                config.review_interval_days.to_string(),
            ));
        }
        if config.audit_capacity == 0 {
            return Err(ConfigError::OutOfRange(
                "AIRC_AUDIT_CAPACITY".into(),
                "0".into(),
            ));
        }
        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::Invalid(var.to_string(), e.to_string())),
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
    #[error("value out of range for {0}: {1}")]
    OutOfRange(String, String),
}
