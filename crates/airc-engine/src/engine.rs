//! # Classification Engine
//!
//! The operations the rest of the product calls: evaluate, review,
//! current/history reads, reassessment triggers and chain verification.
//!
//! ## Serialization
//!
//! At most one run or review is in flight per subject. A claim on the
//! subject is held from the profile read through the ledger append; a
//! second caller that finds the claim taken fails with
//! `ConcurrentReassessment`. The ledger's compare-and-increment append is
//! the second line, covering writers in other processes.
//!
//! ## Failure
//!
//! Nothing is sealed unless the whole version is appended. A failed run
//! leaves `get_current` unchanged and restores the trigger reasons it
//! covered. A lost append race is retried once, and only when the subject
//! is still `StaleTriggered` afterwards.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;

use airc_classify::{gap_report, ClassificationOrchestrator, GapReport};
use airc_core::{
    Classification, EngineError, ReviewerId, SubjectId, Timestamp, ValidationError,
    VersionNumber,
};
use airc_ledger::{
    verify_subject, ChainReport, ClassificationVersion, LedgerStore, OverrideRecord,
    PendingVersion, ReviewKind, VersionOrigin,
};
use airc_state::{MonitorError, MonitorState, SubjectMonitor, TriggerDisposition, TriggerReason};

use crate::audit::{AuditEntry, AuditEntryType, AuditTrail};
use crate::collaborators::{Authorizer, Capability, ProfileSource};
use crate::config::EngineConfig;
use crate::dispatch::Dispatcher;

/// A human decision on the subject's current version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRequest {
    /// The subject.
    pub subject_id: SubjectId,
    /// The version being reviewed. Must be the subject's latest.
    pub version: VersionNumber,
    /// The reviewer's final classification.
    pub final_classification: Classification,
    /// Who decided.
    pub reviewer: ReviewerId,
    /// Why. Required when the final differs from the suggestion.
    pub rationale: String,
}

/// Claim on a subject, released on drop.
struct SubjectClaim<'a> {
    claims: &'a Mutex<HashSet<SubjectId>>,
    subject: SubjectId,
}

impl Drop for SubjectClaim<'_> {
    fn drop(&mut self) {
        self.claims.lock().remove(&self.subject);
    }
}

/// The classification & reassessment engine.
pub struct ClassificationEngine {
    config: EngineConfig,
    profiles: Arc<dyn ProfileSource>,
    authorizer: Arc<dyn Authorizer>,
    ledger: Arc<dyn LedgerStore>,
    orchestrator: ClassificationOrchestrator,
    dispatcher: Dispatcher,
    monitors: Mutex<HashMap<SubjectId, SubjectMonitor>>,
    claims: Mutex<HashSet<SubjectId>>,
    audit: Mutex<AuditTrail>,
}

impl std::fmt::Debug for ClassificationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationEngine")
            .field("config", &self.config)
            .field("monitors", &self.monitors.lock().len())
            .field("sinks", &self.dispatcher.sink_count())
            .finish()
    }
}

impl ClassificationEngine {
    /// Assemble an engine over its collaborators.
    pub fn new(
        config: EngineConfig,
        profiles: Arc<dyn ProfileSource>,
        authorizer: Arc<dyn Authorizer>,
        ledger: Arc<dyn LedgerStore>,
    ) -> Self {
        let audit = AuditTrail::new(config.audit_capacity);
        Self {
            config,
            profiles,
            authorizer,
            ledger,
            orchestrator: ClassificationOrchestrator::new(),
            dispatcher: Dispatcher::new(),
            monitors: Mutex::new(HashMap::new()),
            claims: Mutex::new(HashSet::new()),
            audit: Mutex::new(audit),
        }
    }

    /// Replace the side-effect dispatcher.
    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Runs ────────────────────────────────────────────────────────

    /// Run the pipeline for a subject and seal a new version.
    ///
    /// Covers any pending trigger reasons. With none pending this is an
    /// explicit re-run (or the initial evaluation).
    pub fn evaluate(&self, subject: SubjectId) -> Result<ClassificationVersion, EngineError> {
        let mut retried = false;
        loop {
            match self.run_once(subject) {
                Err(e)
                    if e.is_retryable()
                        && !retried
                        && self.monitor_state(subject) == Some(MonitorState::StaleTriggered) =>
                {
                    tracing::info!(subject_id = %subject, error = %e, "retrying after lost reassessment race");
                    retried = true;
                }
                other => return other,
            }
        }
    }

    fn run_once(&self, subject: SubjectId) -> Result<ClassificationVersion, EngineError> {
        let _claim = match self.claim(subject) {
            Ok(c) => c,
            Err(e) => {
                self.record_failure(subject, &e);
                return Err(e);
            }
        };
        let reasons = match self.with_monitor(subject, SubjectMonitor::begin)? {
            Ok(r) => r,
            Err(e) => {
                let err = self.monitor_error(subject, e);
                self.record_failure(subject, &err);
                return Err(err);
            }
        };
        self.record(
            AuditEntryType::EvaluationStarted,
            subject,
            json!({ "reasons": reasons }),
        );

        match self.seal_run(subject, reasons) {
            Ok(version) => {
                let next_review_at = version.record().next_review_at;
                let number = version.number();
                if let Err(e) = self.with_monitor(subject, |m| m.complete(number, next_review_at))? {
                    tracing::warn!(subject_id = %subject, error = %e, "monitor out of step after seal");
                }
                self.record(
                    AuditEntryType::VersionSealed,
                    subject,
                    json!({
                        "version": number,
                        "origin": version.origin().kind(),
                        "classification": version.final_classification(),
                        "confidence": version.confidence(),
                        "digest": version.digest(),
                    }),
                );
                tracing::info!(
                    subject_id = %subject,
                    version = %number,
                    classification = %version.final_classification(),
                    "classification version sealed"
                );
                self.dispatch(&version);
                Ok(version)
            }
            Err(e) => {
                let message = e.to_string();
                if let Err(me) = self.with_monitor(subject, |m| m.fail(&message))? {
                    tracing::warn!(subject_id = %subject, error = %me, "monitor out of step after failure");
                }
                self.record_failure(subject, &e);
                Err(e)
            }
        }
    }

    fn seal_run(
        &self,
        subject: SubjectId,
        reasons: Vec<TriggerReason>,
    ) -> Result<ClassificationVersion, EngineError> {
        let latest = self.ledger.latest(subject)?;
        let profile = self.profiles.get_profile(subject)?;
        if profile.subject_id != subject {
            return Err(ValidationError::SubjectMismatch {
                expected: subject.to_string(),
                found: profile.subject_id.to_string(),
            }
            .into());
        }
        let outcome = self.orchestrator.classify(&profile)?;

        let origin = match (&latest, reasons.is_empty()) {
            (None, _) => VersionOrigin::Initial,
            (Some(_), true) => VersionOrigin::Rerun,
            (Some(_), false) => VersionOrigin::Reassessment { reasons },
        };
        let expected = latest.as_ref().map(ClassificationVersion::number);
        let now = Timestamp::now();
        let mut pending = PendingVersion::from_outcome(
            subject,
            VersionNumber::after(expected),
            outcome,
            origin,
            now,
        );
        let interval = self.config.review_interval_days;
        let next_review = now
            .plus_days(interval)
            .ok_or(ValidationError::ReviewIntervalOutOfRange(interval))?;
        pending.set_next_review_at(Some(next_review));
        let version = pending.seal(latest.as_ref())?;
        self.ledger.append(expected, version.clone())?;
        Ok(version)
    }

    // ── Reviews ─────────────────────────────────────────────────────

    /// Apply a sign-off or override to the subject's current version and
    /// seal the result as a new version.
    ///
    /// # Errors
    ///
    /// - `Validation` if an override has no rationale or a short one.
    /// - `Authorization` if the reviewer lacks the capability.
    /// - `ConcurrentReassessment` if the reviewed version is superseded or
    ///   a run is in flight.
    /// - `NotFound` if the version does not exist.
    pub fn override_classification(
        &self,
        request: ReviewRequest,
    ) -> Result<ClassificationVersion, EngineError> {
        let subject = request.subject_id;
        let result = self.claim(subject).and_then(|_claim| self.seal_review(&request));
        match &result {
            Ok(version) => {
                let record = version.override_record();
                self.record(
                    AuditEntryType::ReviewApplied,
                    subject,
                    json!({
                        "version": version.number(),
                        "reviewed_version": request.version,
                        "kind": record.map(|r| r.kind),
                        "reviewer": request.reviewer,
                        "suggested": version.suggested(),
                        "final": version.final_classification(),
                        "digest": version.digest(),
                    }),
                );
                tracing::info!(
                    subject_id = %subject,
                    version = %version.number(),
                    classification = %version.final_classification(),
                    reviewer = %request.reviewer,
                    "review sealed"
                );
                self.dispatch(version);
            }
            Err(e) => self.record_failure(subject, e),
        }
        result
    }

    fn seal_review(&self, request: &ReviewRequest) -> Result<ClassificationVersion, EngineError> {
        let subject = request.subject_id;
        if self.monitor_state(subject) == Some(MonitorState::Retired) {
            return Err(ValidationError::SubjectRetired(subject.to_string()).into());
        }
        let latest = self
            .ledger
            .latest(subject)?
            .ok_or_else(|| EngineError::NotFound(format!("subject {subject} has no versions")))?;
        if request.version > latest.number() {
            return Err(EngineError::NotFound(format!(
                "subject {subject} has no version {}",
                request.version
            )));
        }
        if request.version < latest.number() {
            return Err(EngineError::ConcurrentReassessment {
                subject: subject.to_string(),
                expected: request.version.get(),
                found: latest.number().get(),
            });
        }

        let kind = ReviewKind::of(latest.suggested(), request.final_classification);
        let rationale = request.rationale.trim();
        if kind == ReviewKind::Override {
            if rationale.is_empty() {
                return Err(ValidationError::MissingRationale.into());
            }
            let actual = rationale.chars().count();
            if actual < self.config.min_rationale_chars {
                return Err(ValidationError::RationaleTooShort {
                    min: self.config.min_rationale_chars,
                    actual,
                }
                .into());
            }
        }

        let capability = match kind {
            ReviewKind::Override => Capability::ClassificationOverride,
            ReviewKind::SignOff => Capability::ClassificationSignoff,
        };
        if !self.authorizer.has_capability(&request.reviewer, capability)? {
            return Err(EngineError::Authorization {
                reviewer: request.reviewer.to_string(),
                capability: capability.to_string(),
            });
        }

        let now = Timestamp::now();
        let mut pending = PendingVersion::review_of(&latest, latest.number().next(), now);
        pending.apply_review(
            request.final_classification,
            OverrideRecord {
                reviewer: request.reviewer.clone(),
                decided_at: now,
                rationale: rationale.to_string(),
                kind,
            },
        );
        let version = pending.seal(Some(&latest))?;
        self.ledger.append(Some(latest.number()), version.clone())?;
        let next_review_at = version.record().next_review_at;
        self.with_monitor(subject, |m| m.record_seal(version.number(), next_review_at))?;
        Ok(version)
    }

    // ── Reads ───────────────────────────────────────────────────────

    /// Latest sealed version.
    pub fn get_current(&self, subject: SubjectId) -> Result<ClassificationVersion, EngineError> {
        self.ledger
            .latest(subject)?
            .ok_or_else(|| EngineError::NotFound(format!("subject {subject} has no versions")))
    }

    /// Every sealed version, ascending.
    pub fn get_history(&self, subject: SubjectId) -> Result<Vec<ClassificationVersion>, EngineError> {
        let history = self.ledger.history(subject)?;
        if history.is_empty() {
            return Err(EngineError::NotFound(format!(
                "subject {subject} has no versions"
            )));
        }
        Ok(history)
    }

    /// One sealed version.
    pub fn get_version(
        &self,
        subject: SubjectId,
        number: VersionNumber,
    ) -> Result<ClassificationVersion, EngineError> {
        self.ledger.get(subject, number)?.ok_or_else(|| {
            EngineError::NotFound(format!("subject {subject} has no version {number}"))
        })
    }

    /// Transparency gap report for one version.
    pub fn gap_report(
        &self,
        subject: SubjectId,
        number: VersionNumber,
    ) -> Result<GapReport, EngineError> {
        let version = self.get_version(subject, number)?;
        Ok(gap_report(
            version.final_classification(),
            version.obligations(),
            version.stage_results(),
        ))
    }

    /// Re-derive every digest and link of the subject's history.
    pub fn verify_history(&self, subject: SubjectId) -> Result<ChainReport, EngineError> {
        let report = verify_subject(self.ledger.as_ref(), subject)?;
        if !report.intact {
            tracing::error!(
                subject_id = %subject,
                first_break = ?report.first_break,
                "ledger chain verification failed"
            );
        }
        Ok(report)
    }

    /// Monitor state, if the subject has been seen.
    pub fn monitor_state(&self, subject: SubjectId) -> Option<MonitorState> {
        self.monitors.lock().get(&subject).map(|m| m.state)
    }

    /// Monitored subjects per state.
    pub fn monitor_counts(&self) -> HashMap<MonitorState, usize> {
        let mut counts = HashMap::new();
        for monitor in self.monitors.lock().values() {
            *counts.entry(monitor.state).or_insert(0) += 1;
        }
        counts
    }

    /// Audit entries currently held.
    pub fn audit_len(&self) -> usize {
        self.audit.lock().len()
    }

    /// Audit entries, optionally for one subject, oldest first.
    pub fn audit_entries(&self, subject: Option<SubjectId>) -> Vec<AuditEntry> {
        let trail = self.audit.lock();
        match subject {
            Some(s) => trail.entries_for_subject(s).cloned().collect(),
            None => trail.entries().cloned().collect(),
        }
    }

    // ── Reassessment ────────────────────────────────────────────────

    /// Register a trigger. Idempotent while a run is in flight.
    pub fn trigger_reassessment(
        &self,
        subject: SubjectId,
        reason: TriggerReason,
    ) -> Result<TriggerDisposition, EngineError> {
        let disposition = self
            .with_monitor(subject, |m| m.trigger(reason.clone()))?
            .map_err(|e| self.monitor_error(subject, e))?;
        self.record(
            AuditEntryType::TriggerReceived,
            subject,
            json!({ "reason": reason, "disposition": disposition }),
        );
        tracing::info!(subject_id = %subject, reason = %reason, ?disposition, "reassessment trigger");
        Ok(disposition)
    }

    /// Run the subject if it is `StaleTriggered`.
    pub fn reassess_subject(
        &self,
        subject: SubjectId,
    ) -> Result<Option<ClassificationVersion>, EngineError> {
        if self.monitor_state(subject) == Some(MonitorState::StaleTriggered) {
            self.evaluate(subject).map(Some)
        } else {
            Ok(None)
        }
    }

    /// One run for every `StaleTriggered` subject.
    pub fn reassess_pending(&self) -> Vec<(SubjectId, Result<ClassificationVersion, EngineError>)> {
        let mut stale: Vec<SubjectId> = self
            .monitors
            .lock()
            .values()
            .filter(|m| m.state == MonitorState::StaleTriggered)
            .map(|m| m.subject_id)
            .collect();
        stale.sort();
        stale
            .into_iter()
            .map(|s| (s, self.evaluate(s)))
            .collect()
    }

    /// Fire `ScheduledReview` for every subject whose review date has passed.
    pub fn enqueue_due_reviews(&self, now: Timestamp) -> Result<Vec<SubjectId>, EngineError> {
        for subject in self.ledger.subjects()? {
            self.with_monitor(subject, |_| ())?;
        }
        let mut due: Vec<(SubjectId, Timestamp)> = self
            .monitors
            .lock()
            .values()
            .filter_map(|m| m.review_due(&now).map(|d| (m.subject_id, d)))
            .collect();
        due.sort_by_key(|(s, _)| *s);
        let mut fired = Vec::with_capacity(due.len());
        for (subject, at) in due {
            self.trigger_reassessment(subject, TriggerReason::ScheduledReview { due: at })?;
            fired.push(subject);
        }
        Ok(fired)
    }

    /// Stop accepting triggers and reviews for a subject. History stays
    /// queryable.
    pub fn retire_subject(&self, subject: SubjectId, reason: &str) -> Result<(), EngineError> {
        self.with_monitor(subject, |m| m.retire(reason))?
            .map_err(|e| self.monitor_error(subject, e))?;
        tracing::info!(subject_id = %subject, reason, "subject retired");
        Ok(())
    }

    // ── Internals ───────────────────────────────────────────────────

    fn claim(&self, subject: SubjectId) -> Result<SubjectClaim<'_>, EngineError> {
        if self.claims.lock().insert(subject) {
            Ok(SubjectClaim {
                claims: &self.claims,
                subject,
            })
        } else {
            let found = self.latest_number(subject);
            Err(EngineError::ConcurrentReassessment {
                subject: subject.to_string(),
                expected: found,
                found,
            })
        }
    }

    fn latest_number(&self, subject: SubjectId) -> u64 {
        self.monitors
            .lock()
            .get(&subject)
            .and_then(|m| m.last_sealed)
            .map_or(0, |v| v.get())
    }

    /// Run `f` on the subject's monitor, creating it from the ledger's
    /// latest version on first use.
    fn with_monitor<R>(
        &self,
        subject: SubjectId,
        f: impl FnOnce(&mut SubjectMonitor) -> R,
    ) -> Result<R, EngineError> {
        let known = self.monitors.lock().contains_key(&subject);
        let hydrated = if known {
            None
        } else {
            let mut monitor = SubjectMonitor::new(subject);
            if let Some(latest) = self.ledger.latest(subject)? {
                monitor.record_seal(latest.number(), latest.record().next_review_at);
            }
            Some(monitor)
        };
        let mut monitors = self.monitors.lock();
        let monitor = match hydrated {
            Some(m) => monitors.entry(subject).or_insert(m),
            None => monitors
                .entry(subject)
                .or_insert_with(|| SubjectMonitor::new(subject)),
        };
        Ok(f(monitor))
    }

    fn monitor_error(&self, subject: SubjectId, error: MonitorError) -> EngineError {
        match error {
            MonitorError::Retired { .. } => {
                ValidationError::SubjectRetired(subject.to_string()).into()
            }
            MonitorError::AlreadyReassessing { .. } | MonitorError::InvalidTransition { .. } => {
                let found = self.latest_number(subject);
                EngineError::ConcurrentReassessment {
                    subject: subject.to_string(),
                    expected: found,
                    found,
                }
            }
        }
    }

    fn dispatch(&self, version: &ClassificationVersion) {
        for failure in self.dispatcher.dispatch(version) {
            self.record(
                AuditEntryType::DispatchFailed,
                version.subject_id(),
                json!({
                    "version": version.number(),
                    "sink": failure.sink,
                    "reason": failure.reason,
                }),
            );
        }
    }

    fn record(&self, entry_type: AuditEntryType, subject: SubjectId, metadata: serde_json::Value) {
        self.audit
            .lock()
            .append(AuditEntry::new(entry_type, subject, metadata));
    }

    fn record_failure(&self, subject: SubjectId, error: &EngineError) {
        tracing::warn!(subject_id = %subject, code = error.code(), error = %error, "evaluation did not complete");
        self.record(
            AuditEntryType::EvaluationFailed,
            subject,
            json!({ "code": error.code(), "error": error.to_string() }),
        );
    }
}
