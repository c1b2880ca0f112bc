//! # Profile
//!
//! The structured answer-set describing one subject system. Owned by the
//! intake side; the engine reads it and never writes it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::answer::Answer;
use crate::identity::SubjectId;

/// Answers keyed by question key, in sorted order.
pub type AnswerMap = BTreeMap<String, Answer>;

/// A subject's current answers and the revision counter they were read at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// The subject these answers describe.
    pub subject_id: SubjectId,
    /// Incremented by intake on every answer change. Starts at 1.
    pub profile_version: u64,
    /// Answers keyed by question key.
    #[serde(default)]
    pub answers: AnswerMap,
}

impl Profile {
    /// Build a profile at version 1.
    pub fn new(subject_id: SubjectId, answers: AnswerMap) -> Self {
        Self {
            subject_id,
            profile_version: 1,
            answers,
        }
    }

    /// Look up an answer.
    pub fn answer(&self, key: &str) -> Option<&Answer> {
        self.answers.get(key)
    }
}
