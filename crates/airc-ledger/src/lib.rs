//! # airc-ledger: Classification Version Ledger
//!
//! Append-only, per-subject history of sealed classification versions.
//!
//! - **Versions** (`version.rs`): [`PendingVersion`] is built from a pipeline
//!   outcome or from the version under review, optionally receives review
//!   metadata, and is sealed into an immutable [`ClassificationVersion`].
//!   Each sealed version carries its own SHA-256 digest over canonical JSON
//!   and the digest of its predecessor.
//!
//! - **Stores** (`store.rs`, `file.rs`): the [`LedgerStore`] seam with
//!   compare-and-increment appends, an in-memory backend and a file-backed
//!   backend that never overwrites a version file.
//!
//! - **Verification** (`verify.rs`): walk a history and report the first
//!   version whose number, digest or chain link is wrong.

pub mod file;
pub mod store;
pub mod verify;
pub mod version;

pub use file::FileLedger;
pub use store::{InMemoryLedger, LedgerStore};
pub use verify::{verify_chain, verify_subject, ChainBreak, ChainReport};
pub use version::{
    ClassificationVersion, OverrideRecord, PendingVersion, ReviewKind, VersionOrigin,
    VersionRecord,
};
