//! Trigger reasons for reassessment.

use serde::{Deserialize, Serialize};

use airc_core::Timestamp;

/// Why a subject's classification may no longer reflect reality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerReason {
    /// Intake recorded a new profile revision.
    ProfileChanged {
        /// The new profile revision.
        profile_version: u64,
    },
    /// A vendor or component the subject depends on changed.
    LinkedVendorChanged {
        /// Vendor reference.
        vendor: String,
    },
    /// A critical incident was logged against the subject.
    CriticalIncident {
        /// Incident reference.
        incident: String,
    },
    /// The periodic review date was reached.
    ScheduledReview {
        /// The review date that passed.
        due: Timestamp,
    },
}

impl TriggerReason {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProfileChanged { .. } => "profile_changed",
            Self::LinkedVendorChanged { .. } => "linked_vendor_changed",
            Self::CriticalIncident { .. } => "critical_incident",
            Self::ScheduledReview { .. } => "scheduled_review",
        }
    }
}

impl std::fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProfileChanged { profile_version } => {
                write!(f, "profile changed (revision {profile_version})")
            }
            Self::LinkedVendorChanged { vendor } => write!(f, "linked vendor changed ({vendor})"),
            Self::CriticalIncident { incident } => write!(f, "critical incident ({incident})"),
            Self::ScheduledReview { due } => write!(f, "scheduled review due {due}"),
        }
    }
}

/// Append `incoming` to `into`, skipping reasons already present.
/// Arrival order is kept. Returns true if anything was added.
pub fn collapse_reasons(into: &mut Vec<TriggerReason>, incoming: impl IntoIterator<Item = TriggerReason>) -> bool {
    let mut added = false;
    for reason in incoming {
        if !into.contains(&reason) {
            into.push(reason);
            added = true;
        }
    }
    added
}
