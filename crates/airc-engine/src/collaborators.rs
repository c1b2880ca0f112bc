//! # External Collaborators
//!
//! The engine reads profiles from the intake side and asks an authorization
//! service about reviewer capabilities. Both are traits so deployments can
//! plug in remote clients. The in-process implementations here are the
//! reference ones used by the API server, the CLI and the tests.
//!
//! Suggested answers from any assistant enter through
//! [`InMemoryProfileStore::submit`] like human answers. Nothing else writes
//! profile data.

use std::collections::{BTreeSet, HashMap};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use airc_classify::questions;
use airc_core::{AnswerMap, EngineError, Profile, ReviewerId, SubjectId, ValidationError};

// ─── Profile source ─────────────────────────────────────────────────

/// Read access to the current profile of a subject.
pub trait ProfileSource: Send + Sync {
    /// Current answers and profile revision.
    ///
    /// # Errors
    ///
    /// `NotFound` if intake has no profile for the subject,
    /// `UpstreamUnavailable` if the source cannot be reached.
    fn get_profile(&self, subject: SubjectId) -> Result<Profile, EngineError>;
}

/// Result of an intake submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    /// Profile revision after the submission.
    pub profile_version: u64,
    /// False if the answers were identical to the stored ones.
    pub changed: bool,
}

/// In-process profile store.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<SubjectId, Profile>>,
}

impl InMemoryProfileStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a subject's answers.
    ///
    /// Answers are checked against the question catalogue first. The profile
    /// revision increments only if the answers differ from what is stored.
    pub fn submit(
        &self,
        subject: SubjectId,
        answers: AnswerMap,
    ) -> Result<SubmitOutcome, ValidationError> {
        questions::validate_answers(&answers)?;
        let mut guard = self.profiles.write();
        match guard.get_mut(&subject) {
            Some(existing) if existing.answers == answers => Ok(SubmitOutcome {
                profile_version: existing.profile_version,
                changed: false,
            }),
            Some(existing) => {
                existing.answers = answers;
                existing.profile_version += 1;
                tracing::debug!(
                    subject_id = %subject,
                    profile_version = existing.profile_version,
                    "profile updated"
                );
                Ok(SubmitOutcome {
                    profile_version: existing.profile_version,
                    changed: true,
                })
            }
            None => {
                let profile = Profile::new(subject, answers);
                let version = profile.profile_version;
                guard.insert(subject, profile);
                Ok(SubmitOutcome {
                    profile_version: version,
                    changed: true,
                })
            }
        }
    }
}

impl ProfileSource for InMemoryProfileStore {
    fn get_profile(&self, subject: SubjectId) -> Result<Profile, EngineError> {
        self.profiles
            .read()
            .get(&subject)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("no profile for subject {subject}")))
    }
}

// ─── Authorization ──────────────────────────────────────────────────

/// Capabilities a reviewer may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Replace the engine's suggestion with a different classification.
    #[serde(rename = "classification.override")]
    ClassificationOverride,
    /// Confirm the engine's suggestion.
    #[serde(rename = "classification.signoff")]
    ClassificationSignoff,
}

impl Capability {
    /// The capability string sent to the authorization service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClassificationOverride => "classification.override",
            Self::ClassificationSignoff => "classification.signoff",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability checks for reviewers.
pub trait Authorizer: Send + Sync {
    /// Whether `reviewer` holds `capability`.
    ///
    /// # Errors
    ///
    /// `UpstreamUnavailable` if the service cannot answer. The caller must
    /// treat that as a denial and seal nothing.
    fn has_capability(
        &self,
        reviewer: &ReviewerId,
        capability: Capability,
    ) -> Result<bool, EngineError>;
}

/// Fixed grant table, loadable from JSON of the form
/// `{"reviewer@example.org": ["classification.override", "classification.signoff"]}`.
#[derive(Debug, Default, Clone)]
pub struct StaticAuthorizer {
    grants: HashMap<ReviewerId, BTreeSet<Capability>>,
}

impl StaticAuthorizer {
    /// An authorizer that denies everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant capabilities to a reviewer.
    pub fn grant(mut self, reviewer: ReviewerId, capabilities: &[Capability]) -> Self {
        self.grants
            .entry(reviewer)
            .or_default()
            .extend(capabilities.iter().copied());
        self
    }

    /// Parse a grant table.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let grants: HashMap<ReviewerId, BTreeSet<Capability>> = serde_json::from_str(json)?;
        Ok(Self { grants })
    }
}

impl Authorizer for StaticAuthorizer {
    fn has_capability(
        &self,
        reviewer: &ReviewerId,
        capability: Capability,
    ) -> Result<bool, EngineError> {
        Ok(self
            .grants
            .get(reviewer)
            .is_some_and(|caps| caps.contains(&capability)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airc_classify::questions::keys;
    use airc_core::{Answer, TriState};

    fn answers(infers: TriState) -> AnswerMap {
        AnswerMap::from([(keys::DEF_INFERS_OUTPUTS.to_string(), Answer::TriState(infers))])
    }

    #[test]
    fn submit_bumps_version_only_on_change() {
        let store = InMemoryProfileStore::new();
        let s = SubjectId::new();
        let first = store.submit(s, answers(TriState::No)).unwrap();
        assert_eq!(first, SubmitOutcome { profile_version: 1, changed: true });

        let same = store.submit(s, answers(TriState::No)).unwrap();
        assert_eq!(same, SubmitOutcome { profile_version: 1, changed: false });

        let changed = store.submit(s, answers(TriState::Yes)).unwrap();
        assert_eq!(changed, SubmitOutcome { profile_version: 2, changed: true });
        assert_eq!(store.get_profile(s).unwrap().profile_version, 2);
    }

    #[test]
    fn submit_rejects_malformed_answers() {
        let store = InMemoryProfileStore::new();
        let s = SubjectId::new();
        let bad = AnswerMap::from([(
            keys::DEF_INFERS_OUTPUTS.to_string(),
            Answer::text("maybe"),
        )]);
        assert!(matches!(
            store.submit(s, bad),
            Err(ValidationError::WrongAnswerKind { .. })
        ));
        let unknown = AnswerMap::from([(
            "definition.favourite_colour".to_string(),
            Answer::TriState(TriState::Yes),
        )]);
        assert!(matches!(
            store.submit(s, unknown),
            Err(ValidationError::UnknownQuestion(_))
        ));
        assert!(matches!(store.get_profile(s), Err(EngineError::NotFound(_))));
    }

    #[test]
    fn static_authorizer_grants() {
        let alice = ReviewerId::new("alice@example.org").unwrap();
        let bob = ReviewerId::new("bob@example.org").unwrap();
        let auth = StaticAuthorizer::new().grant(alice.clone(), &[Capability::ClassificationSignoff]);
        assert!(auth
            .has_capability(&alice, Capability::ClassificationSignoff)
            .unwrap());
        assert!(!auth
            .has_capability(&alice, Capability::ClassificationOverride)
            .unwrap());
        assert!(!auth
            .has_capability(&bob, Capability::ClassificationSignoff)
            .unwrap());
    }

    #[test]
    fn static_authorizer_from_json() {
        let auth = StaticAuthorizer::from_json(
            r#"{"legal@example.org": ["classification.override", "classification.signoff"]}"#,
        )
        .unwrap();
        let legal = ReviewerId::new("legal@example.org").unwrap();
        assert!(auth
            .has_capability(&legal, Capability::ClassificationOverride)
            .unwrap());
        assert!(StaticAuthorizer::from_json(r#"{"x": ["classification.delete"]}"#).is_err());
        assert!(StaticAuthorizer::from_json(r#"{"  ": []}"#).is_err());
    }
}
