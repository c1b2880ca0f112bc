//! # Stage Results and the Evaluator Seam
//!
//! Each of the four stages produces one variant of [`StageResult`]: a
//! stage-specific outcome, the sub-questions it read with their raw answers,
//! the free-text rationale, and whether it blocks downstream evaluation.
//!
//! ```text
//! Definition ──▶ Prohibited ──▶ HighRisk ──▶ Transparency
//!  (never blocks)    │
//!                    └── Flagged / NeedsReview: blocks, pipeline stops
//! ```

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use airc_core::{Answer, AnswerKind, Profile, TriState, ValidationError, YesNoUnknown};

// ─── Stage ──────────────────────────────────────────────────────────

/// The four stages, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Is the subject an AI system at all?
    Definition,
    /// Prohibited-practice screen.
    Prohibited,
    /// High-risk category screen.
    HighRisk,
    /// Disclosure scenarios.
    Transparency,
}

impl Stage {
    /// Stages in the fixed evaluation order.
    pub const ORDER: [Stage; 4] = [
        Stage::Definition,
        Stage::Prohibited,
        Stage::HighRisk,
        Stage::Transparency,
    ];

    /// The serialized name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Definition => "definition",
            Self::Prohibited => "prohibited",
            Self::HighRisk => "high_risk",
            Self::Transparency => "transparency",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Outcomes ───────────────────────────────────────────────────────

/// Outcome of the definition stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionOutcome {
    /// An inference signal is yes and an output type is selected.
    LikelyInScope,
    /// Not an AI system under the definition.
    LikelyOutOfScope,
    /// An inference or autonomy answer is unsure.
    NeedsReview,
}

/// Outcome of the prohibited-practice stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProhibitedOutcome {
    /// All eight answers are no.
    Clear,
    /// At least one answer is yes.
    Flagged,
    /// No yes, at least one unsure.
    NeedsReview,
}

/// Outcome of the high-risk stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighRiskOutcome {
    /// All nine categories are no.
    NotHighRisk,
    /// At least one category is yes.
    HighRiskCandidate,
    /// No yes, at least one unsure.
    NeedsReview,
}

/// Outcome of the transparency stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransparencyOutcome {
    /// No disclosure scenario answered yes.
    NoObligations,
    /// At least one disclosure scenario answered yes.
    ObligationsApply,
}

/// Human-entered status of transparency measures. Feeds gap reporting only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImplementationStatus {
    /// No transparency measure is needed.
    NotApplicable,
    /// All measures are in place.
    Implemented,
    /// Some measures are missing.
    GapsExist,
}

impl ImplementationStatus {
    /// Parse the catalogue tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "not_applicable" => Some(Self::NotApplicable),
            "implemented" => Some(Self::Implemented),
            "gaps_exist" => Some(Self::GapsExist),
            _ => None,
        }
    }
}

/// The disclosure scenarios, keyed by their transparency question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransparencyScenario {
    /// Direct interaction with natural persons.
    InteractsWithPersons,
    /// Synthetic content generation.
    GeneratesSyntheticContent,
    /// Emotion recognition or biometric categorisation exposure.
    EmotionOrBiometricExposure,
    /// Deepfake content.
    DeepfakeContent,
    /// Text published on matters of public interest.
    PublicInterestText,
}

impl TransparencyScenario {
    /// All scenarios in catalogue order.
    pub const ALL: [TransparencyScenario; 5] = [
        Self::InteractsWithPersons,
        Self::GeneratesSyntheticContent,
        Self::EmotionOrBiometricExposure,
        Self::DeepfakeContent,
        Self::PublicInterestText,
    ];

    /// The question key for this scenario.
    pub fn key(&self) -> &'static str {
        use crate::questions::keys;
        match self {
            Self::InteractsWithPersons => keys::TR_INTERACTS,
            Self::GeneratesSyntheticContent => keys::TR_SYNTHETIC,
            Self::EmotionOrBiometricExposure => keys::TR_EMOTION,
            Self::DeepfakeContent => keys::TR_DEEPFAKE,
            Self::PublicInterestText => keys::TR_PUBLIC_TEXT,
        }
    }

    /// Reverse lookup from a question key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.key() == key)
    }
}

// ─── Results ────────────────────────────────────────────────────────

/// One sub-question a stage read, with its raw answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnsweredQuestion {
    /// The question key.
    pub key: String,
    /// The answer as supplied.
    pub answer: Answer,
}

/// Result of the definition stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionResult {
    /// Stage outcome.
    pub outcome: DefinitionOutcome,
    /// Sub-questions read.
    pub answers: Vec<AnsweredQuestion>,
    /// Free-text rationale, possibly empty.
    pub rationale: String,
    /// Always false.
    pub blocks: bool,
}

/// Result of the prohibited-practice stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProhibitedResult {
    /// Stage outcome.
    pub outcome: ProhibitedOutcome,
    /// Sub-questions read.
    pub answers: Vec<AnsweredQuestion>,
    /// Free-text rationale, possibly empty.
    pub rationale: String,
    /// True unless the outcome is `Clear`.
    pub blocks: bool,
}

/// Result of the high-risk stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighRiskResult {
    /// Stage outcome.
    pub outcome: HighRiskOutcome,
    /// Sub-questions read.
    pub answers: Vec<AnsweredQuestion>,
    /// Free-text rationale, possibly empty.
    pub rationale: String,
    /// Always false.
    pub blocks: bool,
    /// Candidate with a workplace or public-sector deployer context.
    /// A flag for downstream assessments; not evaluated here.
    pub downstream_assessments_relevant: bool,
}

/// Result of the transparency stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransparencyResult {
    /// Stage outcome.
    pub outcome: TransparencyOutcome,
    /// Sub-questions read.
    pub answers: Vec<AnsweredQuestion>,
    /// Free-text rationale, possibly empty.
    pub rationale: String,
    /// Always false.
    pub blocks: bool,
    /// Human-entered status, if answered.
    pub implementation_status: Option<ImplementationStatus>,
}

impl TransparencyResult {
    /// Scenarios answered yes, in catalogue order.
    pub fn scenarios_applying(&self) -> Vec<TransparencyScenario> {
        let mut out: Vec<TransparencyScenario> = self
            .answers
            .iter()
            .filter(|a| a.answer == Answer::YesNoUnknown(YesNoUnknown::Yes))
            .filter_map(|a| TransparencyScenario::from_key(&a.key))
            .collect();
        out.sort();
        out.dedup();
        out
    }
}

/// Tagged result of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageResult {
    /// Definition stage.
    Definition(DefinitionResult),
    /// Prohibited-practice stage.
    Prohibited(ProhibitedResult),
    /// High-risk stage.
    HighRisk(HighRiskResult),
    /// Transparency stage.
    Transparency(TransparencyResult),
}

impl StageResult {
    /// Which stage produced this result.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Definition(_) => Stage::Definition,
            Self::Prohibited(_) => Stage::Prohibited,
            Self::HighRisk(_) => Stage::HighRisk,
            Self::Transparency(_) => Stage::Transparency,
        }
    }

    /// Whether this result halts the pipeline.
    pub fn blocks(&self) -> bool {
        match self {
            Self::Definition(r) => r.blocks,
            Self::Prohibited(r) => r.blocks,
            Self::HighRisk(r) => r.blocks,
            Self::Transparency(r) => r.blocks,
        }
    }

    /// Whether the outcome is the stage's `NeedsReview` variant.
    pub fn needs_review(&self) -> bool {
        match self {
            Self::Definition(r) => r.outcome == DefinitionOutcome::NeedsReview,
            Self::Prohibited(r) => r.outcome == ProhibitedOutcome::NeedsReview,
            Self::HighRisk(r) => r.outcome == HighRiskOutcome::NeedsReview,
            Self::Transparency(_) => false,
        }
    }

    /// Sub-questions read by the stage.
    pub fn answers(&self) -> &[AnsweredQuestion] {
        match self {
            Self::Definition(r) => &r.answers,
            Self::Prohibited(r) => &r.answers,
            Self::HighRisk(r) => &r.answers,
            Self::Transparency(r) => &r.answers,
        }
    }

    /// The stage rationale.
    pub fn rationale(&self) -> &str {
        match self {
            Self::Definition(r) => &r.rationale,
            Self::Prohibited(r) => &r.rationale,
            Self::HighRisk(r) => &r.rationale,
            Self::Transparency(r) => &r.rationale,
        }
    }
}

// ─── Evaluator Trait ────────────────────────────────────────────────

/// A pure, per-stage rule.
///
/// Receives the profile and the result of the stage before it (none for the
/// first stage). Implementations must be deterministic: same inputs, same
/// result.
pub trait StageEvaluator: Send + Sync + fmt::Debug {
    /// The stage this evaluator produces.
    fn stage(&self) -> Stage;

    /// Evaluate the stage.
    fn evaluate(
        &self,
        profile: &Profile,
        previous: Option<&StageResult>,
    ) -> Result<StageResult, ValidationError>;
}

// ─── Answer readers ─────────────────────────────────────────────────
//
// Shape has already been checked against the catalogue by the orchestrator;
// these still fail on a wrong kind so that an evaluator called directly
// never misreads an answer.

fn wrong_kind(key: &str, expected: AnswerKind, found: &Answer) -> ValidationError {
    ValidationError::WrongAnswerKind {
        key: key.to_string(),
        expected: expected.as_str().to_string(),
        found: found.kind().as_str().to_string(),
    }
}

fn missing(key: &str) -> ValidationError {
    ValidationError::MissingAnswer {
        key: key.to_string(),
    }
}

/// Collects the answers a stage reads, in the order it reads them.
#[derive(Debug)]
pub(crate) struct AnswerReader<'p> {
    profile: &'p Profile,
    read: Vec<AnsweredQuestion>,
}

impl<'p> AnswerReader<'p> {
    pub(crate) fn new(profile: &'p Profile) -> Self {
        Self {
            profile,
            read: Vec::new(),
        }
    }

    fn record(&mut self, key: &str, answer: &Answer) {
        self.read.push(AnsweredQuestion {
            key: key.to_string(),
            answer: answer.clone(),
        });
    }

    /// Required tri-state answer.
    pub(crate) fn tri_state(&mut self, key: &str) -> Result<TriState, ValidationError> {
        let profile = self.profile;
        let answer = profile.answer(key).ok_or_else(|| missing(key))?;
        match answer {
            Answer::TriState(v) => {
                self.record(key, answer);
                Ok(*v)
            }
            other => Err(wrong_kind(key, AnswerKind::TriState, other)),
        }
    }

    /// Required yes/no/unknown answer.
    pub(crate) fn yes_no_unknown(&mut self, key: &str) -> Result<YesNoUnknown, ValidationError> {
        let profile = self.profile;
        let answer = profile.answer(key).ok_or_else(|| missing(key))?;
        match answer {
            Answer::YesNoUnknown(v) => {
                self.record(key, answer);
                Ok(*v)
            }
            other => Err(wrong_kind(key, AnswerKind::YesNoUnknown, other)),
        }
    }

    /// Optional tag set; absent reads as empty.
    pub(crate) fn tags(&mut self, key: &str) -> Result<BTreeSet<String>, ValidationError> {
        let profile = self.profile;
        match profile.answer(key) {
            Some(Answer::Tags(v)) => {
                self.record(key, &Answer::Tags(v.clone()));
                Ok(v.clone())
            }
            Some(other) => Err(wrong_kind(key, AnswerKind::Tags, other)),
            None => Ok(BTreeSet::new()),
        }
    }

    /// Optional number.
    pub(crate) fn number(&mut self, key: &str) -> Result<Option<i64>, ValidationError> {
        let profile = self.profile;
        match profile.answer(key) {
            Some(Answer::Number(v)) => {
                self.record(key, &Answer::Number(*v));
                Ok(Some(*v))
            }
            Some(other) => Err(wrong_kind(key, AnswerKind::Number, other)),
            None => Ok(None),
        }
    }

    /// Optional free text; absent reads as empty. Not recorded as a
    /// sub-question since it becomes the stage rationale.
    pub(crate) fn rationale(&self, key: &str) -> Result<String, ValidationError> {
        match self.profile.answer(key) {
            Some(Answer::Text(v)) => Ok(v.trim().to_string()),
            Some(other) => Err(wrong_kind(key, AnswerKind::Text, other)),
            None => Ok(String::new()),
        }
    }

    pub(crate) fn finish(self) -> Vec<AnsweredQuestion> {
        self.read
    }
}

/// Shared rule for the two tri-state screens: any yes wins, then any unsure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScreenVerdict {
    AnyYes,
    AnyUnsure,
    AllNo,
}

pub(crate) fn screen(answers: &[TriState]) -> ScreenVerdict {
    if answers.contains(&TriState::Yes) {
        ScreenVerdict::AnyYes
    } else if answers.contains(&TriState::Unsure) {
        ScreenVerdict::AnyUnsure
    } else {
        ScreenVerdict::AllNo
    }
}
