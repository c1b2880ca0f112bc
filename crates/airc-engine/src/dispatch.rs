//! # Side-Effect Dispatch
//!
//! Turns a freshly sealed version into requests for the task and evidence
//! collaborators and publishes them to every registered sink.
//!
//! Fire-and-forget: sink failures are logged and returned to the engine
//! for auditing, never propagated to the caller. Consumers handle
//! duplicates themselves; the engine does not track what was already sent.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use airc_classify::ObligationId;
use airc_core::{Classification, SubjectId, VersionNumber};
use airc_ledger::ClassificationVersion;

/// Payload describing a sealed version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSealedEvent {
    /// The subject.
    pub subject_id: SubjectId,
    /// The sealed version.
    pub version: VersionNumber,
    /// Obligations of the sealed version.
    pub obligations: BTreeSet<ObligationId>,
    /// Final classification of the sealed version.
    pub classification: Classification,
}

impl VersionSealedEvent {
    /// Build from a sealed version.
    pub fn from_version(version: &ClassificationVersion) -> Self {
        Self {
            subject_id: version.subject_id(),
            version: version.number(),
            obligations: version.obligations().clone(),
            classification: version.final_classification(),
        }
    }
}

/// A request to an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SideEffectRequest {
    /// Create a work item for an obligation.
    CreateTask {
        /// The obligation.
        obligation: ObligationId,
    },
    /// Ask for evidence that an obligation is met.
    RequestEvidence {
        /// The obligation.
        obligation: ObligationId,
    },
    /// Route a blocked subject to legal review.
    LegalReview,
}

/// What a sink receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispatch {
    /// The sealed-version event.
    pub event: VersionSealedEvent,
    /// Requests derived from it.
    pub requests: Vec<SideEffectRequest>,
}

/// A sink refused or failed to take a dispatch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("sink {sink} failed: {reason}")]
pub struct SinkError {
    /// Sink name.
    pub sink: String,
    /// Diagnostic detail.
    pub reason: String,
}

/// A consumer of sealed-version dispatches.
pub trait EventSink: Send + Sync + std::fmt::Debug {
    /// Short name for logs.
    fn name(&self) -> &str;
    /// Deliver one dispatch.
    fn publish(&self, dispatch: &Dispatch) -> Result<(), SinkError>;
}

/// Derive the requests for a sealed version.
pub fn derive_requests(version: &ClassificationVersion) -> Vec<SideEffectRequest> {
    let mut requests: Vec<SideEffectRequest> = version
        .obligations()
        .iter()
        .flat_map(|&obligation| {
            [
                SideEffectRequest::CreateTask { obligation },
                SideEffectRequest::RequestEvidence { obligation },
            ]
        })
        .collect();
    if version.final_classification() == Classification::Blocked {
        requests.push(SideEffectRequest::LegalReview);
    }
    requests
}

/// Fans a dispatch out to every registered sink.
#[derive(Debug, Default, Clone)]
pub struct Dispatcher {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl Dispatcher {
    /// A dispatcher with no sinks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Number of registered sinks.
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Publish a sealed version. Returns the failures; never fails itself.
    pub fn dispatch(&self, version: &ClassificationVersion) -> Vec<SinkError> {
        let dispatch = Dispatch {
            event: VersionSealedEvent::from_version(version),
            requests: derive_requests(version),
        };
        let mut failures = Vec::new();
        for sink in &self.sinks {
            if let Err(e) = sink.publish(&dispatch) {
                tracing::warn!(
                    subject_id = %dispatch.event.subject_id,
                    version = %dispatch.event.version,
                    sink = sink.name(),
                    error = %e,
                    "side-effect dispatch failed"
                );
                failures.push(e);
            }
        }
        failures
    }
}

/// Keeps every dispatch in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    published: Mutex<Vec<Dispatch>>,
}

impl RecordingSink {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far.
    pub fn published(&self) -> Vec<Dispatch> {
        self.published.lock().clone()
    }
}

impl EventSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    fn publish(&self, dispatch: &Dispatch) -> Result<(), SinkError> {
        self.published.lock().push(dispatch.clone());
        Ok(())
    }
}

/// Logs each dispatch at `info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn name(&self) -> &str {
        "tracing"
    }

    fn publish(&self, dispatch: &Dispatch) -> Result<(), SinkError> {
        tracing::info!(
            subject_id = %dispatch.event.subject_id,
            version = %dispatch.event.version,
            classification = %dispatch.event.classification,
            obligations = dispatch.event.obligations.len(),
            requests = dispatch.requests.len(),
            "version sealed"
        );
        Ok(())
    }
}
