//! # Subject Monitor
//!
//! Runtime-checked state machine for one subject. Transition methods
//! validate the current state, mutate, and append to the transition log.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use airc_core::{SubjectId, Timestamp, VersionNumber};

use crate::trigger::{collapse_reasons, TriggerReason};

// ─── Monitor State ──────────────────────────────────────────────────

/// Lifecycle state of a subject's classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    /// The latest version reflects the latest known inputs.
    Current,
    /// At least one trigger fired since the latest version.
    StaleTriggered,
    /// A pipeline run is in flight.
    Reassessing,
    /// The subject was retired (terminal). History stays queryable.
    Retired,
}

impl MonitorState {
    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Retired)
    }
}

impl std::fmt::Display for MonitorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Current => "CURRENT",
            Self::StaleTriggered => "STALE_TRIGGERED",
            Self::Reassessing => "REASSESSING",
            Self::Retired => "RETIRED",
        };
        f.write_str(s)
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

/// Errors raised by monitor transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    /// Attempted transition is not valid from the current state.
    #[error("invalid monitor transition for subject {subject}: {from} -> {to}")]
    InvalidTransition {
        /// The subject.
        subject: String,
        /// Current state.
        from: MonitorState,
        /// Attempted target state.
        to: MonitorState,
    },

    /// A run is already in flight for the subject.
    #[error("subject {subject} is already being reassessed")]
    AlreadyReassessing {
        /// The subject.
        subject: String,
    },

    /// The subject is retired.
    #[error("subject {subject} is retired")]
    Retired {
        /// The subject.
        subject: String,
    },
}

// ─── Transition log ─────────────────────────────────────────────────

/// Record of one state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorTransitionRecord {
    /// State before the transition.
    pub from_state: MonitorState,
    /// State after the transition.
    pub to_state: MonitorState,
    /// When the transition occurred.
    pub timestamp: Timestamp,
    /// Why.
    pub reason: String,
}

/// What happened to an incoming trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerDisposition {
    /// The subject moved from `Current` to `StaleTriggered`.
    Queued,
    /// The subject was already stale; the reason joined the pending set.
    Collapsed,
    /// A run is in flight; the reason will be replayed after it seals.
    Deferred,
}

// ─── Subject Monitor ────────────────────────────────────────────────

/// Reassessment state of one subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectMonitor {
    /// The subject.
    pub subject_id: SubjectId,
    /// Current state.
    pub state: MonitorState,
    /// Reasons collected since the latest seal, not yet taken by a run.
    pub pending: Vec<TriggerReason>,
    /// Reasons taken by the run in flight.
    pub in_flight: Vec<TriggerReason>,
    /// Reasons that arrived while a run was in flight.
    pub deferred: Vec<TriggerReason>,
    /// Latest version sealed while monitored.
    pub last_sealed: Option<VersionNumber>,
    /// When the next scheduled review falls due.
    pub next_review_at: Option<Timestamp>,
    /// Ordered log of all state transitions.
    pub transitions: Vec<MonitorTransitionRecord>,
}

impl SubjectMonitor {
    /// A monitor for a subject with nothing pending.
    pub fn new(subject_id: SubjectId) -> Self {
        Self {
            subject_id,
            state: MonitorState::Current,
            pending: Vec::new(),
            in_flight: Vec::new(),
            deferred: Vec::new(),
            last_sealed: None,
            next_review_at: None,
            transitions: Vec::new(),
        }
    }

    /// Register a trigger.
    ///
    /// Idempotent while `Reassessing`: no second run is started, but the
    /// reason is kept and replayed once the current run seals.
    pub fn trigger(&mut self, reason: TriggerReason) -> Result<TriggerDisposition, MonitorError> {
        match self.state {
            MonitorState::Retired => Err(self.retired()),
            MonitorState::Current => {
                let label = reason.to_string();
                collapse_reasons(&mut self.pending, [reason]);
                self.do_transition(MonitorState::StaleTriggered, &label);
                Ok(TriggerDisposition::Queued)
            }
            MonitorState::StaleTriggered => {
                collapse_reasons(&mut self.pending, [reason]);
                Ok(TriggerDisposition::Collapsed)
            }
            MonitorState::Reassessing => {
                if !self.in_flight.contains(&reason) {
                    collapse_reasons(&mut self.deferred, [reason]);
                }
                Ok(TriggerDisposition::Deferred)
            }
        }
    }

    /// Start a run (`Current` or `StaleTriggered` → `Reassessing`).
    ///
    /// Returns the reasons the run covers; empty for an explicit re-run
    /// from `Current`.
    pub fn begin(&mut self) -> Result<Vec<TriggerReason>, MonitorError> {
        match self.state {
            MonitorState::Retired => Err(self.retired()),
            MonitorState::Reassessing => Err(MonitorError::AlreadyReassessing {
                subject: self.subject_id.to_string(),
            }),
            MonitorState::Current | MonitorState::StaleTriggered => {
                self.in_flight = std::mem::take(&mut self.pending);
                let label = if self.in_flight.is_empty() {
                    "evaluation requested".to_string()
                } else {
                    format!("{} trigger reason(s)", self.in_flight.len())
                };
                self.do_transition(MonitorState::Reassessing, &label);
                Ok(self.in_flight.clone())
            }
        }
    }

    /// A run sealed `version` (`Reassessing` → `Current`, or back to
    /// `StaleTriggered` if triggers were deferred during the run).
    pub fn complete(
        &mut self,
        version: VersionNumber,
        next_review_at: Option<Timestamp>,
    ) -> Result<MonitorState, MonitorError> {
        self.require_state(MonitorState::Reassessing, MonitorState::Current)?;
        self.in_flight.clear();
        self.last_sealed = Some(version);
        self.next_review_at = next_review_at;
        let label = format!("sealed {version}");
        if self.deferred.is_empty() {
            self.do_transition(MonitorState::Current, &label);
        } else {
            self.pending = std::mem::take(&mut self.deferred);
            self.do_transition(MonitorState::StaleTriggered, &label);
        }
        Ok(self.state)
    }

    /// A run failed without sealing. The reasons it covered are restored
    /// together with any deferred ones.
    pub fn fail(&mut self, error: &str) -> Result<MonitorState, MonitorError> {
        self.require_state(MonitorState::Reassessing, MonitorState::StaleTriggered)?;
        let mut restored = std::mem::take(&mut self.in_flight);
        collapse_reasons(&mut restored, std::mem::take(&mut self.deferred));
        let label = format!("run failed: {error}");
        if restored.is_empty() {
            self.do_transition(MonitorState::Current, &label);
        } else {
            self.pending = restored;
            self.do_transition(MonitorState::StaleTriggered, &label);
        }
        Ok(self.state)
    }

    /// Record a version sealed outside a pipeline run, such as a review.
    /// Reasons already pending still apply to the new version.
    pub fn record_seal(&mut self, version: VersionNumber, next_review_at: Option<Timestamp>) {
        self.last_sealed = Some(version);
        self.next_review_at = next_review_at;
    }

    /// Retire the subject (terminal). Not allowed while a run is in flight.
    pub fn retire(&mut self, reason: &str) -> Result<(), MonitorError> {
        match self.state {
            MonitorState::Retired => Err(self.retired()),
            MonitorState::Reassessing => Err(MonitorError::InvalidTransition {
                subject: self.subject_id.to_string(),
                from: self.state,
                to: MonitorState::Retired,
            }),
            MonitorState::Current | MonitorState::StaleTriggered => {
                self.pending.clear();
                self.next_review_at = None;
                self.do_transition(MonitorState::Retired, reason);
                Ok(())
            }
        }
    }

    /// Whether the scheduled review date has passed and no review is
    /// already pending for it.
    pub fn review_due(&self, now: &Timestamp) -> Option<Timestamp> {
        let due = self.next_review_at?;
        if self.state.is_terminal() || due > *now {
            return None;
        }
        let reason = TriggerReason::ScheduledReview { due };
        let already = self.pending.contains(&reason)
            || self.in_flight.contains(&reason)
            || self.deferred.contains(&reason);
        (!already).then_some(due)
    }

    fn retired(&self) -> MonitorError {
        MonitorError::Retired {
            subject: self.subject_id.to_string(),
        }
    }

    fn require_state(&self, expected: MonitorState, target: MonitorState) -> Result<(), MonitorError> {
        if self.state.is_terminal() {
            return Err(self.retired());
        }
        if self.state != expected {
            return Err(MonitorError::InvalidTransition {
                subject: self.subject_id.to_string(),
                from: self.state,
                to: target,
            });
        }
        Ok(())
    }

    fn do_transition(&mut self, to: MonitorState, reason: &str) {
        self.transitions.push(MonitorTransitionRecord {
            from_state: self.state,
            to_state: to,
            timestamp: Timestamp::now(),
            reason: reason.to_string(),
        });
        self.state = to;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Trigger(u64),
        Begin,
        Complete,
        Fail,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u64..5).prop_map(Op::Trigger),
            Just(Op::Begin),
            Just(Op::Complete),
            Just(Op::Fail),
        ]
    }

    proptest! {
        /// Sealed version numbers only move forward, and no reason is lost
        /// while in flight.
        #[test]
        fn seals_are_monotonic(ops in prop::collection::vec(op(), 0..40)) {
            let mut m = SubjectMonitor::new(SubjectId::new());
            let mut next = 1u64;
            for o in ops {
                match o {
                    Op::Trigger(n) => {
                        let _ = m.trigger(TriggerReason::ProfileChanged { profile_version: n });
                    }
                    Op::Begin => { let _ = m.begin(); }
                    Op::Complete => {
                        if m.complete(VersionNumber::new(next).unwrap(), None).is_ok() {
                            prop_assert_eq!(m.last_sealed.map(|v| v.get()), Some(next));
                            next += 1;
                        }
                    }
                    Op::Fail => { let _ = m.fail("x"); }
                }
                match m.state {
                    MonitorState::Current => prop_assert!(m.pending.is_empty()),
                    MonitorState::StaleTriggered => prop_assert!(!m.pending.is_empty()),
                    MonitorState::Reassessing => {}
                    MonitorState::Retired => prop_assert!(false),
                }
                if m.state != MonitorState::Reassessing {
                    prop_assert!(m.in_flight.is_empty());
                    prop_assert!(m.deferred.is_empty());
                }
            }
        }
    }
}
