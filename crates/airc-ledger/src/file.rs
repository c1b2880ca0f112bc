//! # File-Backed Ledger
//!
//! One JSON file per version at `{root}/{subject_id}/{number:010}.json`.
//!
//! ## Write path
//!
//! The version is written to a uniquely named temporary file in the subject
//! directory and then hard-linked to its final name. Linking fails with
//! `AlreadyExists` if the version file is present, so a sealed version is
//! never overwritten, and a reader never sees a partially written file.
//!
//! ## Integrity
//!
//! Every read recomputes the record digest and compares it to the stored
//! digest in constant time. The subject and number inside the file must
//! match the path. Mismatches surface as `StorageError::Integrity`.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use airc_core::{EngineError, StorageError, SubjectId, VersionNumber};

use crate::store::{check_append, LedgerStore};
use crate::version::ClassificationVersion;

/// Ledger persisted under a root directory.
#[derive(Debug)]
pub struct FileLedger {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileLedger {
    /// Open a ledger rooted at `root`. The directory is created on first append.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn subject_dir(&self, subject: SubjectId) -> PathBuf {
        self.root.join(subject.to_string())
    }

    fn version_path(&self, subject: SubjectId, number: VersionNumber) -> PathBuf {
        self.subject_dir(subject)
            .join(format!("{:010}.json", number.get()))
    }

    /// Version numbers present on disk, ascending.
    fn numbers(&self, subject: SubjectId) -> Result<Vec<VersionNumber>, StorageError> {
        let dir = self.subject_dir(subject);
        let entries = match fs::read_dir(&dir) {
            Ok(e) => e,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut numbers = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if stem.len() != 10 || !stem.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }
            if let Some(v) = stem.parse().ok().and_then(|n| VersionNumber::new(n).ok()) {
                numbers.push(v);
            }
        }
        numbers.sort();
        Ok(numbers)
    }

    fn read_version(
        &self,
        subject: SubjectId,
        number: VersionNumber,
    ) -> Result<Option<ClassificationVersion>, StorageError> {
        let path = self.version_path(subject, number);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let integrity = |reason: String| StorageError::Integrity {
            subject: subject.to_string(),
            version: number.get(),
            reason,
        };
        let version: ClassificationVersion = serde_json::from_slice(&bytes)
            .map_err(|e| integrity(format!("{} is not a valid version: {e}", path.display())))?;
        if version.subject_id() != subject || version.number() != number {
            return Err(integrity(format!(
                "{} holds subject {} version {}",
                path.display(),
                version.subject_id(),
                version.number()
            )));
        }
        let recomputed = version
            .recompute_digest()
            .map_err(|e| integrity(format!("digest recomputation failed: {e}")))?;
        if !bool::from(recomputed.as_bytes().ct_eq(version.digest().as_bytes())) {
            return Err(integrity(format!(
                "digest mismatch: stored {}, recomputed {recomputed}",
                version.digest()
            )));
        }
        Ok(Some(version))
    }

    fn write_new(&self, path: &Path, bytes: &[u8]) -> Result<bool, StorageError> {
        let dir = path
            .parent()
            .ok_or_else(|| StorageError::Backend(format!("{} has no parent", path.display())))?;
        fs::create_dir_all(dir)?;
        let tmp = dir.join(format!(".tmp-{}", Uuid::new_v4()));
        {
            let mut f = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&tmp)?;
            f.write_all(bytes)?;
            f.sync_all()?;
        }
        let linked = match fs::hard_link(&tmp, path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = fs::remove_file(&tmp) {
            tracing::warn!(path = %tmp.display(), error = %e, "failed to remove temporary ledger file");
        }
        linked
    }
}

impl LedgerStore for FileLedger {
    fn append(
        &self,
        expected_latest: Option<VersionNumber>,
        version: ClassificationVersion,
    ) -> Result<(), EngineError> {
        let subject = version.subject_id();
        let _guard = self.write_lock.lock();
        let latest = self.latest(subject)?;
        check_append(subject, expected_latest, latest.as_ref(), &version)?;

        let bytes = serde_json::to_vec_pretty(&version).map_err(StorageError::from)?;
        let path = self.version_path(subject, version.number());
        if !self.write_new(&path, &bytes)? {
            // Another process sealed this number between our read and link.
            return Err(EngineError::ConcurrentReassessment {
                subject: subject.to_string(),
                expected: expected_latest.map_or(0, |v| v.get()),
                found: version.number().get(),
            });
        }
        tracing::debug!(
            subject_id = %subject,
            version = %version.number(),
            path = %path.display(),
            "version written"
        );
        Ok(())
    }

    fn latest(&self, subject: SubjectId) -> Result<Option<ClassificationVersion>, StorageError> {
        match self.numbers(subject)?.last() {
            Some(n) => self.read_version(subject, *n),
            None => Ok(None),
        }
    }

    fn get(
        &self,
        subject: SubjectId,
        number: VersionNumber,
    ) -> Result<Option<ClassificationVersion>, StorageError> {
        self.read_version(subject, number)
    }

    fn history(&self, subject: SubjectId) -> Result<Vec<ClassificationVersion>, StorageError> {
        let mut out = Vec::new();
        for n in self.numbers(subject)? {
            if let Some(v) = self.read_version(subject, n)? {
                out.push(v);
            }
        }
        Ok(out)
    }

    fn subjects(&self) -> Result<Vec<SubjectId>, StorageError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(e) => e,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(id) = entry
                .file_name()
                .to_str()
                .and_then(|n| SubjectId::parse(n).ok())
            else {
                continue;
            };
            if !self.numbers(id)?.is_empty() {
                ids.push(id);
            }
        }
        ids.sort_by_key(|id| *id.as_uuid());
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::tests::pending;

    fn seeded(dir: &Path) -> (FileLedger, SubjectId, ClassificationVersion, ClassificationVersion) {
        let ledger = FileLedger::new(dir);
        let s = SubjectId::new();
        let v1 = pending(s, 1).seal(None).unwrap();
        ledger.append(None, v1.clone()).unwrap();
        let v2 = pending(s, 2).seal(Some(&v1)).unwrap();
        ledger.append(Some(v1.number()), v2.clone()).unwrap();
        (ledger, s, v1, v2)
    }

    #[test]
    fn append_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let (_, s, v1, v2) = seeded(dir.path());

        let reopened = FileLedger::new(dir.path());
        assert_eq!(reopened.latest(s).unwrap(), Some(v2));
        assert_eq!(reopened.get(s, VersionNumber::FIRST).unwrap(), Some(v1));
        assert_eq!(reopened.history(s).unwrap().len(), 2);
        assert_eq!(reopened.subjects().unwrap(), vec![s]);
    }

    #[test]
    fn file_layout_is_zero_padded() {
        let dir = tempfile::tempdir().unwrap();
        let (_, s, _, _) = seeded(dir.path());
        let p = dir.path().join(s.to_string()).join("0000000002.json");
        assert!(p.exists());
        let leftovers: Vec<_> = fs::read_dir(dir.path().join(s.to_string()))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn empty_root_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileLedger::new(dir.path().join("not-yet"));
        let s = SubjectId::new();
        assert!(ledger.latest(s).unwrap().is_none());
        assert!(ledger.history(s).unwrap().is_empty());
        assert!(ledger.subjects().unwrap().is_empty());
    }

    #[test]
    fn stale_expectation_is_concurrent_reassessment() {
        let dir = tempfile::tempdir().unwrap();
        let (ledger, s, v1, _) = seeded(dir.path());
        let loser = pending(s, 2).seal(Some(&v1)).unwrap();
        assert!(matches!(
            ledger.append(Some(v1.number()), loser),
            Err(EngineError::ConcurrentReassessment { expected: 1, found: 2, .. })
        ));
    }

    #[test]
    fn existing_file_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileLedger::new(dir.path());
        let path = dir.path().join("x").join("0000000001.json");
        assert!(ledger.write_new(&path, b"first").unwrap());
        assert!(!ledger.write_new(&path, b"second").unwrap());
        assert_eq!(fs::read(&path).unwrap(), b"first");
    }

    #[test]
    fn tampered_file_fails_integrity_check() {
        let dir = tempfile::tempdir().unwrap();
        let (ledger, s, _, _) = seeded(dir.path());
        let path = dir.path().join(s.to_string()).join("0000000001.json");
        let mut value: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        value["final_classification"] = serde_json::json!("HIGH_RISK_CANDIDATE");
        fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();

        assert!(matches!(
            ledger.get(s, VersionNumber::FIRST),
            Err(StorageError::Integrity { version: 1, .. })
        ));
        assert!(ledger.history(s).is_err());
    }

    #[test]
    fn misplaced_file_fails_integrity_check() {
        let dir = tempfile::tempdir().unwrap();
        let (ledger, s, _, _) = seeded(dir.path());
        let subject_dir = dir.path().join(s.to_string());
        fs::copy(
            subject_dir.join("0000000001.json"),
            subject_dir.join("0000000003.json"),
        )
        .unwrap();
        assert!(matches!(
            ledger.latest(s),
            Err(StorageError::Integrity { version: 3, .. })
        ));
    }

    #[test]
    fn garbage_file_is_integrity_error() {
        let dir = tempfile::tempdir().unwrap();
        let (ledger, s, _, _) = seeded(dir.path());
        let path = dir.path().join(s.to_string()).join("0000000002.json");
        fs::write(&path, b"not json").unwrap();
        assert!(matches!(
            ledger.latest(s),
            Err(StorageError::Integrity { .. })
        ));
    }
}
