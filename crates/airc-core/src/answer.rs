//! # Answer Model
//!
//! A profile answer is one of a closed set of kinds. Stage evaluators
//! pattern-match on [`Answer`] instead of comparing strings, and the
//! question catalogue declares which kind each key expects.
//!
//! Wire form is adjacently tagged:
//!
//! ```json
//! {"kind": "tri_state", "value": "unsure"}
//! {"kind": "tags", "value": ["content", "predictions"]}
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Yes / no / unsure. Used where the respondent may not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriState {
    /// Affirmative.
    Yes,
    /// Negative.
    No,
    /// The respondent is not sure.
    Unsure,
}

/// Yes / no / unknown. Used for disclosure scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YesNoUnknown {
    /// Affirmative.
    Yes,
    /// Negative.
    No,
    /// Not known.
    Unknown,
}

/// A single profile answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Answer {
    /// Yes / no / unsure.
    TriState(TriState),
    /// Yes / no / unknown.
    YesNoUnknown(YesNoUnknown),
    /// Free text.
    Text(String),
    /// A set of tags drawn from the question's closed enumeration.
    Tags(BTreeSet<String>),
    /// An integer on the question's scale.
    Number(i64),
}

/// The kind of an [`Answer`], without its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    /// [`Answer::TriState`].
    TriState,
    /// [`Answer::YesNoUnknown`].
    YesNoUnknown,
    /// [`Answer::Text`].
    Text,
    /// [`Answer::Tags`].
    Tags,
    /// [`Answer::Number`].
    Number,
}

impl AnswerKind {
    /// The serialized kind tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TriState => "tri_state",
            Self::YesNoUnknown => "yes_no_unknown",
            Self::Text => "text",
            Self::Tags => "tags",
            Self::Number => "number",
        }
    }
}

impl std::fmt::Display for AnswerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Answer {
    /// The kind of this answer.
    pub fn kind(&self) -> AnswerKind {
        match self {
            Self::TriState(_) => AnswerKind::TriState,
            Self::YesNoUnknown(_) => AnswerKind::YesNoUnknown,
            Self::Text(_) => AnswerKind::Text,
            Self::Tags(_) => AnswerKind::Tags,
            Self::Number(_) => AnswerKind::Number,
        }
    }

    /// Convenience constructor for a tag answer.
    pub fn tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Tags(tags.into_iter().map(Into::into).collect())
    }

    /// Convenience constructor for a text answer.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }
}
