//! # airc-engine: Classification & Reassessment Engine
//!
//! The facade the API server and CLI drive. It reads profiles through
//! [`ProfileSource`], runs the stage pipeline, seals versions into a
//! [`LedgerStore`](airc_ledger::LedgerStore), checks reviewer capabilities
//! through [`Authorizer`], and publishes sealed versions to
//! [`EventSink`]s.
//!
//! - **Engine** (`engine.rs`): evaluate, review, reads, triggers, scheduled
//!   reviews, retirement, chain verification. One run or review in flight
//!   per subject.
//! - **Collaborators** (`collaborators.rs`): profile source and authorizer
//!   traits with in-process implementations.
//! - **Dispatch** (`dispatch.rs`): task and evidence requests derived from
//!   sealed versions. Fire-and-forget.
//! - **Audit** (`audit.rs`): bounded, digestable record of engine activity.
//! - **Config** (`config.rs`): environment-driven tunables.

pub mod audit;
pub mod collaborators;
pub mod config;
pub mod dispatch;
pub mod engine;

pub use audit::{AuditEntry, AuditEntryType, AuditTrail};
pub use collaborators::{
    Authorizer, Capability, InMemoryProfileStore, ProfileSource, StaticAuthorizer, SubmitOutcome,
};
pub use config::{ConfigError, EngineConfig};
pub use dispatch::{
    derive_requests, Dispatch, Dispatcher, EventSink, RecordingSink, SideEffectRequest, SinkError,
    TracingSink, VersionSealedEvent,
};
pub use engine::{ClassificationEngine, ReviewRequest};
