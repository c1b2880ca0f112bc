//! # airc-state: Reassessment Monitor
//!
//! The per-subject state machine that decides when a classification is stale
//! and must be re-derived.
//!
//! ```text
//! Current ──trigger──▶ StaleTriggered ──begin──▶ Reassessing ──complete──▶ Current
//!    │                                               │  ▲
//!    └──────────────────begin (explicit re-run)──────┘  │ trigger: deferred,
//!                                                       │ replayed after complete
//! any but Reassessing ──retire──▶ Retired (terminal)
//! ```
//!
//! The machine holds no classification data; the ledger is the only record
//! of what the classification is.

pub mod monitor;
pub mod trigger;

pub use monitor::{
    MonitorError, MonitorState, MonitorTransitionRecord, SubjectMonitor, TriggerDisposition,
};
pub use trigger::{collapse_reasons, TriggerReason};
