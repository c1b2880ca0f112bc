//! # Ledger Store
//!
//! [`LedgerStore`] is the persistence seam for sealed versions. Appends are
//! compare-and-increment: the caller states which version it believes is
//! latest, and the store refuses the write if another run got there first.
//! That refusal is how concurrent reassessments of one subject serialize.

use std::collections::HashMap;

use parking_lot::RwLock;

use airc_core::{EngineError, StorageError, SubjectId, VersionNumber};

use crate::version::ClassificationVersion;

/// Append-only store of sealed classification versions.
pub trait LedgerStore: Send + Sync {
    /// Append `version` if the subject's latest version is still
    /// `expected_latest`.
    ///
    /// # Errors
    ///
    /// - `ConcurrentReassessment` if the latest version moved.
    /// - `Storage(VersionExists | OutOfSequence)` if the number is not next.
    /// - `Storage(Integrity)` if the version's digest or chain link is wrong.
    /// - `Storage(Io | Backend)` on write failure; nothing was appended.
    fn append(
        &self,
        expected_latest: Option<VersionNumber>,
        version: ClassificationVersion,
    ) -> Result<(), EngineError>;

    /// Latest sealed version for the subject.
    fn latest(&self, subject: SubjectId) -> Result<Option<ClassificationVersion>, StorageError>;

    /// A specific version.
    fn get(
        &self,
        subject: SubjectId,
        number: VersionNumber,
    ) -> Result<Option<ClassificationVersion>, StorageError>;

    /// All versions, ascending by number.
    fn history(&self, subject: SubjectId) -> Result<Vec<ClassificationVersion>, StorageError>;

    /// Every subject with at least one version.
    fn subjects(&self) -> Result<Vec<SubjectId>, StorageError>;
}

/// Check that `version` may follow `latest`. Shared by the store backends.
pub(crate) fn check_append(
    subject: SubjectId,
    expected_latest: Option<VersionNumber>,
    latest: Option<&ClassificationVersion>,
    version: &ClassificationVersion,
) -> Result<(), EngineError> {
    let found = latest.map(ClassificationVersion::number);
    if found != expected_latest {
        return Err(EngineError::ConcurrentReassessment {
            subject: subject.to_string(),
            expected: expected_latest.map_or(0, |v| v.get()),
            found: found.map_or(0, |v| v.get()),
        });
    }
    let number = version.number();
    let expected_number = VersionNumber::after(found);
    if number != expected_number {
        let latest_n = found.map_or(0, |v| v.get());
        return Err(if number.get() <= latest_n {
            StorageError::VersionExists {
                subject: subject.to_string(),
                version: number.get(),
            }
        } else {
            StorageError::OutOfSequence {
                subject: subject.to_string(),
                version: number.get(),
                latest: latest_n,
            }
        }
        .into());
    }
    let integrity = |reason: String| -> EngineError {
        StorageError::Integrity {
            subject: subject.to_string(),
            version: number.get(),
            reason,
        }
        .into()
    };
    if version.subject_id() != subject {
        return Err(integrity(format!(
            "version belongs to subject {}",
            version.subject_id()
        )));
    }
    if version.record().previous_digest.as_ref() != latest.map(ClassificationVersion::digest) {
        return Err(integrity("previous digest does not match latest version".into()));
    }
    if version.recompute_digest()? != *version.digest() {
        return Err(integrity("digest does not match record".into()));
    }
    Ok(())
}

/// In-process ledger. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    subjects: RwLock<HashMap<SubjectId, Vec<ClassificationVersion>>>,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for InMemoryLedger {
    fn append(
        &self,
        expected_latest: Option<VersionNumber>,
        version: ClassificationVersion,
    ) -> Result<(), EngineError> {
        let subject = version.subject_id();
        let mut guard = self.subjects.write();
        let versions = guard.entry(subject).or_default();
        check_append(subject, expected_latest, versions.last(), &version)?;
        tracing::debug!(subject_id = %subject, version = %version.number(), "version appended");
        versions.push(version);
        Ok(())
    }

    fn latest(&self, subject: SubjectId) -> Result<Option<ClassificationVersion>, StorageError> {
        Ok(self
            .subjects
            .read()
            .get(&subject)
            .and_then(|v| v.last().cloned()))
    }

    fn get(
        &self,
        subject: SubjectId,
        number: VersionNumber,
    ) -> Result<Option<ClassificationVersion>, StorageError> {
        let idx = (number.get() - 1) as usize;
        Ok(self
            .subjects
            .read()
            .get(&subject)
            .and_then(|v| v.get(idx).cloned()))
    }

    fn history(&self, subject: SubjectId) -> Result<Vec<ClassificationVersion>, StorageError> {
        Ok(self
            .subjects
            .read()
            .get(&subject)
            .cloned()
            .unwrap_or_default())
    }

    fn subjects(&self) -> Result<Vec<SubjectId>, StorageError> {
        let mut ids: Vec<SubjectId> = self
            .subjects
            .read()
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(id, _)| *id)
            .collect();
        ids.sort_by_key(|id| *id.as_uuid());
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::tests::pending;

    #[test]
    fn append_and_read_back() {
        let ledger = InMemoryLedger::new();
        let s = SubjectId::new();
        let v1 = pending(s, 1).seal(None).unwrap();
        ledger.append(None, v1.clone()).unwrap();
        let v2 = pending(s, 2).seal(Some(&v1)).unwrap();
        ledger.append(Some(v1.number()), v2.clone()).unwrap();

        assert_eq!(ledger.latest(s).unwrap(), Some(v2.clone()));
        assert_eq!(ledger.get(s, VersionNumber::FIRST).unwrap(), Some(v1));
        assert_eq!(ledger.history(s).unwrap().len(), 2);
        assert_eq!(ledger.subjects().unwrap(), vec![s]);
        assert!(ledger.get(s, VersionNumber::new(3).unwrap()).unwrap().is_none());
    }

    #[test]
    fn unknown_subject_is_empty() {
        let ledger = InMemoryLedger::new();
        let s = SubjectId::new();
        assert!(ledger.latest(s).unwrap().is_none());
        assert!(ledger.history(s).unwrap().is_empty());
        assert!(ledger.subjects().unwrap().is_empty());
    }

    #[test]
    fn stale_expectation_is_concurrent_reassessment() {
        let ledger = InMemoryLedger::new();
        let s = SubjectId::new();
        let v1 = pending(s, 1).seal(None).unwrap();
        ledger.append(None, v1.clone()).unwrap();

        // A second run built against "no versions" loses.
        let loser = pending(s, 1).seal(None).unwrap();
        match ledger.append(None, loser) {
            Err(EngineError::ConcurrentReassessment {
                expected, found, ..
            }) => {
                assert_eq!(expected, 0);
                assert_eq!(found, 1);
            }
            other => panic!("expected ConcurrentReassessment, got {other:?}"),
        }
        assert_eq!(ledger.history(s).unwrap().len(), 1);
    }

    #[test]
    fn broken_link_is_rejected() {
        let ledger = InMemoryLedger::new();
        let s = SubjectId::new();
        let v1 = pending(s, 1).seal(None).unwrap();
        ledger.append(None, v1.clone()).unwrap();
        let mut value = serde_json::to_value(&v1).unwrap();
        value["digest"] = serde_json::json!("00".repeat(32));
        let fake_prev: ClassificationVersion = serde_json::from_value(value).unwrap();
        let v2 = pending(s, 2).seal(Some(&fake_prev)).unwrap();
        assert!(matches!(
            ledger.append(Some(v1.number()), v2),
            Err(EngineError::Storage(StorageError::Integrity { .. }))
        ));
    }

    #[test]
    fn wrong_digest_is_rejected() {
        let ledger = InMemoryLedger::new();
        let s = SubjectId::new();
        let v1 = pending(s, 1).seal(None).unwrap();
        let mut value = serde_json::to_value(&v1).unwrap();
        value["confidence"] = serde_json::json!("low");
        let tampered: ClassificationVersion = serde_json::from_value(value).unwrap();
        assert!(matches!(
            ledger.append(None, tampered),
            Err(EngineError::Storage(StorageError::Integrity { .. }))
        ));
    }
}
