//! # Chain Verification
//!
//! Walks a subject's history and checks that numbers are contiguous from 1,
//! every record re-hashes to its stored digest, and every `previous_digest`
//! equals the digest of the version before it. Reports the first break.

use serde::{Deserialize, Serialize};

use airc_core::{StorageError, SubjectId, VersionNumber};

use crate::store::LedgerStore;
use crate::version::ClassificationVersion;

/// Where and why a chain stopped verifying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainBreak {
    /// The first version that failed.
    pub version: u64,
    /// What was wrong.
    pub reason: String,
}

/// Result of verifying one subject's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReport {
    /// The subject.
    pub subject_id: SubjectId,
    /// Versions examined before stopping.
    pub versions_checked: usize,
    /// True if every version verified.
    pub intact: bool,
    /// First failure, if any.
    pub first_break: Option<ChainBreak>,
}

/// Verify an in-order history.
pub fn verify_chain(subject_id: SubjectId, history: &[ClassificationVersion]) -> ChainReport {
    let mut previous: Option<&ClassificationVersion> = None;
    for (idx, version) in history.iter().enumerate() {
        if let Some(reason) = check_link(subject_id, previous, version) {
            return ChainReport {
                subject_id,
                versions_checked: idx + 1,
                intact: false,
                first_break: Some(ChainBreak {
                    version: version.number().get(),
                    reason,
                }),
            };
        }
        previous = Some(version);
    }
    ChainReport {
        subject_id,
        versions_checked: history.len(),
        intact: true,
        first_break: None,
    }
}

fn check_link(
    subject_id: SubjectId,
    previous: Option<&ClassificationVersion>,
    version: &ClassificationVersion,
) -> Option<String> {
    let expected = VersionNumber::after(previous.map(ClassificationVersion::number));
    if version.number() != expected {
        return Some(format!("expected {expected}, found {}", version.number()));
    }
    if version.subject_id() != subject_id {
        return Some(format!("belongs to subject {}", version.subject_id()));
    }
    match version.recompute_digest() {
        Ok(d) if d == *version.digest() => {}
        Ok(d) => {
            return Some(format!(
                "digest mismatch: stored {}, recomputed {d}",
                version.digest()
            ))
        }
        Err(e) => return Some(format!("digest recomputation failed: {e}")),
    }
    if version.record().previous_digest.as_ref() != previous.map(ClassificationVersion::digest) {
        return Some("previous digest does not match preceding version".into());
    }
    None
}

/// Load and verify a subject's history. A store-level integrity failure is
/// reported as a break rather than an error.
pub fn verify_subject(
    store: &dyn LedgerStore,
    subject_id: SubjectId,
) -> Result<ChainReport, StorageError> {
    match store.history(subject_id) {
        Ok(history) => Ok(verify_chain(subject_id, &history)),
        Err(StorageError::Integrity {
            version, reason, ..
        }) => Ok(ChainReport {
            subject_id,
            versions_checked: version as usize,
            intact: false,
            first_break: Some(ChainBreak { version, reason }),
        }),
        Err(e) => Err(e),
    }
}
