//! # Classification Versions
//!
//! A [`PendingVersion`] is assembled from a pipeline outcome (or from the
//! version under review), may receive review metadata, and is then sealed
//! into an immutable [`ClassificationVersion`]. Sealing links the record to
//! its predecessor's digest and computes its own digest over the canonical
//! bytes of the record.
//!
//! A sealed version exposes no mutators. Corrections are new versions.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use airc_classify::{map_obligations, ClassificationOutcome, ObligationId, StageResult};
use airc_core::{
    sha256_digest, CanonicalBytes, CanonicalizationError, Classification, Confidence,
    ContentDigest, EngineError, ReviewerId, StorageError, SubjectId, Timestamp, VersionNumber,
};
use airc_state::TriggerReason;

// ─── Review metadata ────────────────────────────────────────────────

/// Whether a reviewer agreed with the suggestion or replaced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewKind {
    /// Final equals suggested.
    SignOff,
    /// Final differs from suggested.
    Override,
}

impl ReviewKind {
    /// Classify a review decision.
    pub fn of(suggested: Classification, final_classification: Classification) -> Self {
        if suggested == final_classification {
            Self::SignOff
        } else {
            Self::Override
        }
    }
}

/// Human review recorded on a version before it is sealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRecord {
    /// Who decided.
    pub reviewer: ReviewerId,
    /// When the decision was taken.
    pub decided_at: Timestamp,
    /// Why. Mandatory for overrides; may be empty for sign-offs.
    pub rationale: String,
    /// Sign-off or override.
    pub kind: ReviewKind,
}

/// Why a version was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VersionOrigin {
    /// First evaluation of the subject.
    Initial,
    /// Explicit re-run with no trigger pending.
    Rerun,
    /// Run covering one or more trigger reasons.
    Reassessment {
        /// Every reason that fired since the previous version.
        reasons: Vec<TriggerReason>,
    },
    /// Human review of an earlier version.
    Review {
        /// The version that was reviewed.
        reviewed_version: VersionNumber,
    },
}

impl VersionOrigin {
    /// Short label for logs and audit metadata.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Rerun => "rerun",
            Self::Reassessment { .. } => "reassessment",
            Self::Review { .. } => "review",
        }
    }
}

// ─── Record ─────────────────────────────────────────────────────────

/// Every field of a version except its own digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Sequential per subject, from 1.
    pub number: VersionNumber,
    /// The subject.
    pub subject_id: SubjectId,
    /// Profile revision the stage results were computed from.
    pub profile_version: u64,
    /// Stage results in evaluation order.
    pub stage_results: Vec<StageResult>,
    /// Engine suggestion.
    pub suggested: Classification,
    /// Confidence in the suggestion.
    pub confidence: Confidence,
    /// Final classification; equals `suggested` unless overridden.
    pub final_classification: Classification,
    /// Review metadata, if a human reviewed this version's suggestion.
    pub override_record: Option<OverrideRecord>,
    /// Obligations derived from the final classification.
    pub obligations: BTreeSet<ObligationId>,
    /// Why this version exists.
    pub origin: VersionOrigin,
    /// Creation time.
    pub created_at: Timestamp,
    /// Scheduled review date.
    pub next_review_at: Option<Timestamp>,
    /// Digest of the previous version; none for version 1.
    pub previous_digest: Option<ContentDigest>,
}

/// A version that has not been sealed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVersion {
    record: VersionRecord,
}

impl PendingVersion {
    /// Build from a pipeline outcome. Final equals suggested.
    pub fn from_outcome(
        subject_id: SubjectId,
        number: VersionNumber,
        outcome: ClassificationOutcome,
        origin: VersionOrigin,
        created_at: Timestamp,
    ) -> Self {
        let obligations = map_obligations(outcome.suggested, &outcome.stage_results);
        Self {
            record: VersionRecord {
                number,
                subject_id,
                profile_version: outcome.profile_version,
                stage_results: outcome.stage_results,
                suggested: outcome.suggested,
                confidence: outcome.confidence,
                final_classification: outcome.suggested,
                override_record: None,
                obligations,
                origin,
                created_at,
                next_review_at: None,
                previous_digest: None,
            },
        }
    }

    /// Start a review version from the version under review. Stage results,
    /// suggestion, confidence and profile revision are carried over.
    pub fn review_of(
        reviewed: &ClassificationVersion,
        number: VersionNumber,
        created_at: Timestamp,
    ) -> Self {
        let prior = reviewed.record();
        Self {
            record: VersionRecord {
                number,
                subject_id: prior.subject_id,
                profile_version: prior.profile_version,
                stage_results: prior.stage_results.clone(),
                suggested: prior.suggested,
                confidence: prior.confidence,
                final_classification: prior.suggested,
                override_record: None,
                obligations: map_obligations(prior.suggested, &prior.stage_results),
                origin: VersionOrigin::Review {
                    reviewed_version: prior.number,
                },
                created_at,
                next_review_at: prior.next_review_at,
                previous_digest: None,
            },
        }
    }

    /// Write review metadata and the reviewer's final classification onto
    /// the pending record. Obligations are re-derived from the new final.
    pub fn apply_review(&mut self, final_classification: Classification, review: OverrideRecord) {
        self.record.final_classification = final_classification;
        self.record.obligations = map_obligations(final_classification, &self.record.stage_results);
        self.record.override_record = Some(review);
    }

    /// Set the scheduled review date.
    pub fn set_next_review_at(&mut self, at: Option<Timestamp>) {
        self.record.next_review_at = at;
    }

    /// Read access before sealing.
    pub fn record(&self) -> &VersionRecord {
        &self.record
    }

    /// Seal against the subject's current latest version.
    ///
    /// # Errors
    ///
    /// `Storage(OutOfSequence | VersionExists)` if the number is not
    /// `previous + 1`; `Storage(Integrity)` if `previous` belongs to another
    /// subject; `Canonicalization` if the digest cannot be computed.
    pub fn seal(
        mut self,
        previous: Option<&ClassificationVersion>,
    ) -> Result<ClassificationVersion, EngineError> {
        let subject = self.record.subject_id.to_string();
        let expected = VersionNumber::after(previous.map(ClassificationVersion::number));
        let number = self.record.number;
        if number != expected {
            let latest = previous.map_or(0, |p| p.number().get());
            return Err(if number.get() <= latest {
                StorageError::VersionExists {
                    subject,
                    version: number.get(),
                }
            } else {
                StorageError::OutOfSequence {
                    subject,
                    version: number.get(),
                    latest,
                }
            }
            .into());
        }
        if let Some(p) = previous {
            if p.subject_id() != self.record.subject_id {
                return Err(StorageError::Integrity {
                    subject,
                    version: number.get(),
                    reason: format!("predecessor belongs to subject {}", p.subject_id()),
                }
                .into());
            }
        }
        self.record.previous_digest = previous.map(|p| *p.digest());
        let digest = record_digest(&self.record)?;
        Ok(ClassificationVersion {
            record: self.record,
            digest,
        })
    }
}

fn record_digest(record: &VersionRecord) -> Result<ContentDigest, CanonicalizationError> {
    Ok(sha256_digest(&CanonicalBytes::new(record)?))
}

// ─── Sealed version ─────────────────────────────────────────────────

/// An immutable, sealed classification version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationVersion {
    #[serde(flatten)]
    record: VersionRecord,
    digest: ContentDigest,
}

impl ClassificationVersion {
    /// All fields except the digest.
    pub fn record(&self) -> &VersionRecord {
        &self.record
    }

    /// Version number.
    pub fn number(&self) -> VersionNumber {
        self.record.number
    }

    /// Subject.
    pub fn subject_id(&self) -> SubjectId {
        self.record.subject_id
    }

    /// Final classification.
    pub fn final_classification(&self) -> Classification {
        self.record.final_classification
    }

    /// Engine suggestion.
    pub fn suggested(&self) -> Classification {
        self.record.suggested
    }

    /// Confidence in the suggestion.
    pub fn confidence(&self) -> Confidence {
        self.record.confidence
    }

    /// Stage results in evaluation order.
    pub fn stage_results(&self) -> &[StageResult] {
        &self.record.stage_results
    }

    /// Derived obligations.
    pub fn obligations(&self) -> &BTreeSet<ObligationId> {
        &self.record.obligations
    }

    /// Review metadata, if any.
    pub fn override_record(&self) -> Option<&OverrideRecord> {
        self.record.override_record.as_ref()
    }

    /// Why this version exists.
    pub fn origin(&self) -> &VersionOrigin {
        &self.record.origin
    }

    /// Creation time.
    pub fn created_at(&self) -> Timestamp {
        self.record.created_at
    }

    /// This version's digest.
    pub fn digest(&self) -> &ContentDigest {
        &self.digest
    }

    /// Recompute the digest from the record.
    pub fn recompute_digest(&self) -> Result<ContentDigest, CanonicalizationError> {
        record_digest(&self.record)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use airc_classify::ClassificationOrchestrator;
    use airc_core::{Answer, AnswerMap, Profile, TriState, YesNoUnknown};

    pub(crate) fn profile(subject: SubjectId, prohibited_yes: bool, high_risk_yes: bool) -> Profile {
        use airc_classify::questions::keys;
        let mut answers = AnswerMap::new();
        for key in [
            keys::DEF_INFERS_OUTPUTS,
            keys::DEF_USES_INFERENCE,
            keys::DEF_OPERATES_AUTONOMOUSLY,
        ] {
            answers.insert(key.into(), Answer::TriState(TriState::No));
        }
        for key in keys::PROHIBITED.iter().chain(keys::HIGH_RISK.iter()) {
            answers.insert((*key).into(), Answer::TriState(TriState::No));
        }
        for key in keys::TRANSPARENCY {
            answers.insert(key.into(), Answer::YesNoUnknown(YesNoUnknown::No));
        }
        if prohibited_yes {
            answers.insert(keys::PROHIBITED[0].into(), Answer::TriState(TriState::Yes));
        }
        if high_risk_yes {
            answers.insert(keys::HIGH_RISK[0].into(), Answer::TriState(TriState::Yes));
        }
        Profile::new(subject, answers)
    }

    pub(crate) fn pending(subject: SubjectId, n: u64) -> PendingVersion {
        let outcome = ClassificationOrchestrator::new()
            .classify(&profile(subject, false, false))
            .unwrap();
        PendingVersion::from_outcome(
            subject,
            VersionNumber::new(n).unwrap(),
            outcome,
            if n == 1 {
                VersionOrigin::Initial
            } else {
                VersionOrigin::Rerun
            },
            Timestamp::parse("2026-03-01T09:00:00Z").unwrap(),
        )
    }

    #[test]
    fn first_version_has_no_previous_digest() {
        let s = SubjectId::new();
        let v1 = pending(s, 1).seal(None).unwrap();
        assert_eq!(v1.record().previous_digest, None);
        assert_eq!(v1.recompute_digest().unwrap(), *v1.digest());
        assert_eq!(v1.final_classification(), Classification::MinimalRisk);
    }

    #[test]
    fn second_version_links_to_first() {
        let s = SubjectId::new();
        let v1 = pending(s, 1).seal(None).unwrap();
        let v2 = pending(s, 2).seal(Some(&v1)).unwrap();
        assert_eq!(v2.record().previous_digest, Some(*v1.digest()));
        assert_ne!(v1.digest(), v2.digest());
    }

    #[test]
    fn seal_rejects_gap_and_repeat() {
        let s = SubjectId::new();
        let v1 = pending(s, 1).seal(None).unwrap();
        assert!(matches!(
            pending(s, 3).seal(Some(&v1)),
            Err(EngineError::Storage(StorageError::OutOfSequence { .. }))
        ));
        assert!(matches!(
            pending(s, 1).seal(Some(&v1)),
            Err(EngineError::Storage(StorageError::VersionExists { .. }))
        ));
        assert!(matches!(
            pending(s, 2).seal(None),
            Err(EngineError::Storage(StorageError::OutOfSequence { .. }))
        ));
    }

    #[test]
    fn seal_rejects_foreign_predecessor() {
        let v1 = pending(SubjectId::new(), 1).seal(None).unwrap();
        assert!(matches!(
            pending(SubjectId::new(), 2).seal(Some(&v1)),
            Err(EngineError::Storage(StorageError::Integrity { .. }))
        ));
    }

    #[test]
    fn review_rederives_obligations_and_records_origin() {
        let s = SubjectId::new();
        let outcome = ClassificationOrchestrator::new()
            .classify(&profile(s, true, false))
            .unwrap();
        let v1 = PendingVersion::from_outcome(
            s,
            VersionNumber::FIRST,
            outcome,
            VersionOrigin::Initial,
            Timestamp::now(),
        )
        .seal(None)
        .unwrap();
        assert_eq!(v1.final_classification(), Classification::Blocked);
        assert!(v1.obligations().is_empty());

        let mut p = PendingVersion::review_of(&v1, v1.number().next(), Timestamp::now());
        p.apply_review(
            Classification::HighRiskCandidate,
            OverrideRecord {
                reviewer: ReviewerId::new("legal@example.org").unwrap(),
                decided_at: Timestamp::now(),
                rationale: "cleared by counsel, treat as high risk".into(),
                kind: ReviewKind::Override,
            },
        );
        let v2 = p.seal(Some(&v1)).unwrap();
        assert_eq!(v2.suggested(), Classification::Blocked);
        assert_eq!(v2.final_classification(), Classification::HighRiskCandidate);
        assert!(v2.obligations().contains(&ObligationId::OversightAssignment));
        assert_eq!(
            v2.origin(),
            &VersionOrigin::Review {
                reviewed_version: VersionNumber::FIRST
            }
        );
        assert_eq!(v2.stage_results(), v1.stage_results());
    }

    #[test]
    fn json_roundtrip_preserves_digest() {
        let s = SubjectId::new();
        let v1 = pending(s, 1).seal(None).unwrap();
        let json = serde_json::to_string(&v1).unwrap();
        let back: ClassificationVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v1);
        assert_eq!(back.recompute_digest().unwrap(), *back.digest());
    }

    #[test]
    fn tampered_record_changes_digest() {
        let s = SubjectId::new();
        let v1 = pending(s, 1).seal(None).unwrap();
        let mut value = serde_json::to_value(&v1).unwrap();
        value["final_classification"] = serde_json::json!("BLOCKED");
        let tampered: ClassificationVersion = serde_json::from_value(value).unwrap();
        assert_ne!(tampered.recompute_digest().unwrap(), *tampered.digest());
    }

    #[test]
    fn review_kind_of() {
        use Classification::*;
        assert_eq!(ReviewKind::of(Blocked, Blocked), ReviewKind::SignOff);
        assert_eq!(ReviewKind::of(Blocked, MinimalRisk), ReviewKind::Override);
    }
}
