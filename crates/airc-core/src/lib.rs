//! # airc-core: Foundational Types for the Classification Engine
//!
//! Leaf crate of the workspace. Every other `airc-*` crate depends on it;
//! it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype identifiers.** `SubjectId`, `ReviewerId`, `VersionNumber` are
//!    distinct types with validated constructors.
//!
//! 2. **Closed answer variants.** `Answer` is a tagged enum; evaluators match
//!    exhaustively rather than comparing strings.
//!
//! 3. **`CanonicalBytes` newtype.** All digest computation flows through
//!    `CanonicalBytes::new()`, which rejects floats and sorts keys.
//!
//! 4. **UTC-only timestamps**, truncated to seconds.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `airc-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod answer;
pub mod canonical;
pub mod classification;
pub mod digest;
pub mod error;
pub mod identity;
pub mod profile;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use answer::{Answer, AnswerKind, TriState, YesNoUnknown};
pub use canonical::CanonicalBytes;
pub use classification::{Classification, Confidence};
pub use digest::{sha256_digest, ContentDigest};
pub use error::{CanonicalizationError, EngineError, StorageError, ValidationError};
pub use identity::{ReviewerId, SubjectId, VersionNumber};
pub use profile::{AnswerMap, Profile};
pub use temporal::Timestamp;
