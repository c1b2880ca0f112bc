//! # Engine Audit Trail
//!
//! Records every trigger, run, seal, review and failure for operator review.
//!
//! Entries are individually digestable. The trail holds at most
//! `audit_capacity` entries and drops the oldest first. The ledger, not this
//! trail, is the record of what a subject's classification is.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use airc_core::{sha256_digest, CanonicalBytes, ContentDigest, SubjectId, Timestamp};

// ─── AuditEntryType ─────────────────────────────────────────────────

/// The type of audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntryType {
    /// A reassessment trigger was registered.
    TriggerReceived,
    /// A pipeline run started.
    EvaluationStarted,
    /// A version was sealed into the ledger.
    VersionSealed,
    /// A sign-off or override was sealed.
    ReviewApplied,
    /// A run or review ended without sealing.
    EvaluationFailed,
    /// A side-effect sink rejected an event.
    DispatchFailed,
}

impl AuditEntryType {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TriggerReceived => "trigger_received",
            Self::EvaluationStarted => "evaluation_started",
            Self::VersionSealed => "version_sealed",
            Self::ReviewApplied => "review_applied",
            Self::EvaluationFailed => "evaluation_failed",
            Self::DispatchFailed => "dispatch_failed",
        }
    }
}

impl std::fmt::Display for AuditEntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── AuditEntry ─────────────────────────────────────────────────────

/// A single entry in the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// The type of audit event.
    pub entry_type: AuditEntryType,
    /// When the event occurred.
    pub timestamp: Timestamp,
    /// Subject the event concerns.
    pub subject_id: SubjectId,
    /// Structured payload.
    pub metadata: serde_json::Value,
}

impl AuditEntry {
    /// Create an entry stamped with the current time.
    pub fn new(
        entry_type: AuditEntryType,
        subject_id: SubjectId,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            entry_type,
            timestamp: Timestamp::now(),
            subject_id,
            metadata,
        }
    }

    /// Content digest of this entry. `None` if the metadata cannot be
    /// canonicalized (floats).
    pub fn digest(&self) -> Option<ContentDigest> {
        match CanonicalBytes::new(self) {
            Ok(c) => Some(sha256_digest(&c)),
            Err(e) => {
                tracing::warn!(entry_type = %self.entry_type, error = %e, "audit entry has no digest");
                None
            }
        }
    }
}

// ─── AuditTrail ─────────────────────────────────────────────────────

/// Bounded audit ring. The engine wraps it in a mutex.
pub struct AuditTrail {
    entries: VecDeque<AuditEntry>,
    capacity: usize,
}

impl AuditTrail {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Append, dropping the oldest entry when full.
    pub fn append(&mut self, entry: AuditEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries_for_subject(&self, subject: SubjectId) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter().filter(move |e| e.subject_id == subject)
    }
}

impl std::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrail")
            .field("entries", &self.entries.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
