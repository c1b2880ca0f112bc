//! # Error Hierarchy
//!
//! Structured error types for the classification engine, built with `thiserror`.
//! No `Box<dyn Error>`, no `.unwrap()` outside tests.
//!
//! The top-level [`EngineError`] mirrors the engine's failure taxonomy:
//!
//! | Variant                   | Caller action                                   |
//! |---------------------------|-------------------------------------------------|
//! | `Validation`              | fix the input; never retried automatically      |
//! | `Authorization`           | obtain the capability; never retried            |
//! | `ConcurrentReassessment`  | retry against the now-current version           |
//! | `Storage`                 | evaluation did not complete; nothing was sealed |
//! | `UpstreamUnavailable`     | collaborator unreachable; surfaced directly     |

use thiserror::Error;

/// Top-level error type for the classification engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed or missing profile answers, or an invalid review request.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The reviewer lacks a capability required for the operation.
    #[error("reviewer {reviewer} lacks capability {capability}")]
    Authorization {
        /// The reviewer identity that was checked.
        reviewer: String,
        /// The capability string that was required.
        capability: String,
    },

    /// Another run for the same subject sealed first, or is still in flight.
    #[error("concurrent reassessment for subject {subject}: expected latest version {expected}, found {found}")]
    ConcurrentReassessment {
        /// The subject whose ledger moved.
        subject: String,
        /// The latest version number the losing run was built against.
        expected: u64,
        /// The latest version number actually present.
        found: u64,
    },

    /// Ledger read or write failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A collaborator (profile source, authorization service) could not be reached.
    #[error("upstream {collaborator} unavailable: {reason}")]
    UpstreamUnavailable {
        /// Which collaborator failed.
        collaborator: String,
        /// Diagnostic detail.
        reason: String,
    },

    /// The subject or the requested version does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Digest computation failed while sealing a version.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

impl EngineError {
    /// Whether the engine may retry the operation on its own.
    ///
    /// Only a lost serialization race qualifies. Validation and authorization
    /// failures are caller-correctable; storage and upstream failures are
    /// surfaced so that no stale result is reported as current.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentReassessment { .. })
    }

    /// Short machine-readable code for logs and API bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Authorization { .. } => "AUTHORIZATION_ERROR",
            Self::ConcurrentReassessment { .. } => "CONCURRENT_REASSESSMENT",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::UpstreamUnavailable { .. } => "UPSTREAM_UNAVAILABLE",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Canonicalization(_) => "CANONICALIZATION_ERROR",
        }
    }
}

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Numeric answers must be integers.
    #[error("float values are not permitted in canonical representations; use integers: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Input validation failures.
///
/// Each variant carries the offending key or value so that the intake
/// collaborator can point the user at the exact question.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A stage requires an answer that the profile does not contain.
    #[error("missing required answer for \"{key}\"")]
    MissingAnswer {
        /// The question key.
        key: String,
    },

    /// The answer exists but has a different kind than the question declares.
    #[error("answer for \"{key}\" must be {expected}, got {found}")]
    WrongAnswerKind {
        /// The question key.
        key: String,
        /// The declared answer kind.
        expected: String,
        /// The kind actually supplied.
        found: String,
    },

    /// A tag answer contains a value outside the question's closed enumeration.
    #[error("tag \"{tag}\" is not allowed for \"{key}\"")]
    UnknownTag {
        /// The question key.
        key: String,
        /// The rejected tag.
        tag: String,
    },

    /// A single-select tag question received zero or several tags.
    #[error("\"{key}\" accepts exactly one tag, got {count}")]
    SingleSelect {
        /// The question key.
        key: String,
        /// Number of tags supplied.
        count: usize,
    },

    /// A numeric answer is outside the question's range.
    #[error("\"{key}\" must be between {min} and {max}, got {value}")]
    NumberOutOfRange {
        /// The question key.
        key: String,
        /// Inclusive lower bound.
        min: i64,
        /// Inclusive upper bound.
        max: i64,
        /// The supplied value.
        value: i64,
    },

    /// The profile references a question key the catalogue does not define.
    #[error("unknown question key \"{0}\"")]
    UnknownQuestion(String),

    /// The profile returned by the source belongs to a different subject.
    #[error("profile subject {found} does not match requested subject {expected}")]
    SubjectMismatch {
        /// The requested subject.
        expected: String,
        /// The subject recorded on the profile.
        found: String,
    },

    /// An override changed the classification without a rationale.
    #[error("a rationale is required when the final classification differs from the suggestion")]
    MissingRationale,

    /// An override rationale is shorter than the configured minimum.
    #[error("rationale must be at least {min} characters, got {actual}")]
    RationaleTooShort {
        /// Configured minimum length.
        min: usize,
        /// Trimmed length supplied.
        actual: usize,
    },

    /// Reviewer identity is empty or too long.
    #[error("invalid reviewer id: \"{0}\" (expected 1-256 non-blank characters)")]
    InvalidReviewerId(String),

    /// Subject identifier did not parse as a UUID.
    #[error("invalid subject id: \"{0}\" (expected a UUID)")]
    InvalidSubjectId(String),

    /// Version numbers start at 1.
    #[error("invalid version number: {0} (versions start at 1)")]
    InvalidVersionNumber(u64),

    /// Timestamp string is not valid UTC ISO 8601.
    #[error("invalid timestamp: \"{value}\" ({reason})")]
    InvalidTimestamp {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A classification label did not parse.
    #[error("unknown classification \"{0}\"")]
    UnknownClassification(String),

    /// The subject was retired; its history is read-only.
    #[error("subject {0} is retired")]
    SubjectRetired(String),

    /// Seal time plus the review interval is not a representable date.
    #[error("review interval of {0} days overflows the calendar")]
    ReviewIntervalOutOfRange(i64),
}

/// Ledger persistence failures.
#[derive(Error, Debug)]
pub enum StorageError {
    /// A version with this number is already sealed for the subject.
    #[error("version {version} already sealed for subject {subject}")]
    VersionExists {
        /// The subject.
        subject: String,
        /// The colliding version number.
        version: u64,
    },

    /// Append would leave a gap in the version sequence.
    #[error("version {version} for subject {subject} is not the next in sequence (latest is {latest})")]
    OutOfSequence {
        /// The subject.
        subject: String,
        /// The version number offered.
        version: u64,
        /// The latest sealed version number.
        latest: u64,
    },

    /// A stored record failed digest or linkage verification on read.
    #[error("integrity violation for subject {subject} version {version}: {reason}")]
    Integrity {
        /// The subject.
        subject: String,
        /// The version number.
        version: u64,
        /// What failed.
        reason: String,
    },

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other backend failure.
    #[error("backend failure: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_wraps_into_engine_error() {
        let err: EngineError = ValidationError::MissingRationale.into();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(format!("{err}").contains("rationale"));
    }

    #[test]
    fn only_concurrency_is_retryable() {
        let concurrent = EngineError::ConcurrentReassessment {
            subject: "s".into(),
            expected: 1,
            found: 2,
        };
        assert!(concurrent.is_retryable());
        assert!(!EngineError::NotFound("x".into()).is_retryable());
        assert!(!EngineError::Authorization {
            reviewer: "r".into(),
            capability: "classification.override".into(),
        }
        .is_retryable());
        assert!(!EngineError::Storage(StorageError::Backend("down".into())).is_retryable());
    }

    #[test]
    fn concurrent_display_names_versions() {
        let err = EngineError::ConcurrentReassessment {
            subject: "subject-1".into(),
            expected: 3,
            found: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("subject-1"));
        assert!(msg.contains('3'));
        assert!(msg.contains('4'));
    }

    #[test]
    fn storage_error_out_of_sequence_display() {
        let err = StorageError::OutOfSequence {
            subject: "s".into(),
            version: 5,
            latest: 2,
        };
        assert!(err.to_string().contains("latest is 2"));
    }

    #[test]
    fn wrong_kind_names_both_kinds() {
        let err = ValidationError::WrongAnswerKind {
            key: "prohibited.social_scoring".into(),
            expected: "tri_state".into(),
            found: "text".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("tri_state"));
        assert!(msg.contains("text"));
    }

    #[test]
    fn rationale_too_short_display() {
        let err = ValidationError::RationaleTooShort { min: 10, actual: 3 };
        assert!(err.to_string().contains("at least 10"));
    }

    #[test]
    fn upstream_code() {
        let err = EngineError::UpstreamUnavailable {
            collaborator: "authorization".into(),
            reason: "timeout".into(),
        };
        assert_eq!(err.code(), "UPSTREAM_UNAVAILABLE");
        assert!(err.to_string().contains("timeout"));
    }
}
