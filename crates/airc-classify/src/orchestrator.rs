//! # Classification Orchestrator
//!
//! Runs the four stages in fixed order and stops at the first result that
//! blocks. Derives the suggested classification by precedence and the
//! confidence from the number of `NeedsReview` outcomes.
//!
//! The orchestrator is a pure function of the profile. Sealing, versioning
//! and serialization of concurrent runs are the ledger's and the engine's
//! concern.

use serde::{Deserialize, Serialize};

use airc_core::{Classification, Confidence, Profile, ValidationError};

use crate::questions;
use crate::stage::{HighRiskOutcome, StageEvaluator, StageResult, TransparencyOutcome};
use crate::stages::{
    DefinitionEvaluator, HighRiskEvaluator, ProhibitedEvaluator, TransparencyEvaluator,
};

/// What one pipeline run produced, before any human review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationOutcome {
    /// Profile revision the run read.
    pub profile_version: u64,
    /// Stage results in evaluation order. Stops at the first blocking stage.
    pub stage_results: Vec<StageResult>,
    /// Engine-suggested classification.
    pub suggested: Classification,
    /// Confidence in the suggestion.
    pub confidence: Confidence,
}

/// Runs the stage pipeline.
#[derive(Debug)]
pub struct ClassificationOrchestrator {
    stages: [Box<dyn StageEvaluator>; 4],
}

impl Default for ClassificationOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassificationOrchestrator {
    /// The standard Definition → Prohibited → HighRisk → Transparency pipeline.
    pub fn new() -> Self {
        Self {
            stages: [
                Box::new(DefinitionEvaluator),
                Box::new(ProhibitedEvaluator),
                Box::new(HighRiskEvaluator),
                Box::new(TransparencyEvaluator),
            ],
        }
    }

    /// Classify a profile.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if a catalogue answer is malformed or a
    /// stage that runs is missing a required answer. Stages skipped because
    /// of a block are not validated for completeness.
    pub fn classify(&self, profile: &Profile) -> Result<ClassificationOutcome, ValidationError> {
        questions::validate_known_answers(&profile.answers)?;

        let mut stage_results: Vec<StageResult> = Vec::with_capacity(self.stages.len());
        for evaluator in &self.stages {
            let result = evaluator.evaluate(profile, stage_results.last())?;
            let blocks = result.blocks();
            tracing::debug!(
                subject_id = %profile.subject_id,
                stage = %evaluator.stage(),
                blocks,
                needs_review = result.needs_review(),
                "stage evaluated"
            );
            stage_results.push(result);
            if blocks {
                break;
            }
        }

        let suggested = derive_classification(&stage_results);
        let confidence = derive_confidence(&stage_results, suggested);
        Ok(ClassificationOutcome {
            profile_version: profile.profile_version,
            stage_results,
            suggested,
            confidence,
        })
    }
}

/// Precedence: `Blocked` > `HighRiskCandidate` > `LimitedRisk` > `MinimalRisk`.
pub fn derive_classification(stage_results: &[StageResult]) -> Classification {
    let mut suggested = Classification::MinimalRisk;
    for result in stage_results {
        let candidate = match result {
            StageResult::Prohibited(r) if r.blocks => Classification::Blocked,
            StageResult::HighRisk(r) if r.outcome == HighRiskOutcome::HighRiskCandidate => {
                Classification::HighRiskCandidate
            }
            StageResult::Transparency(r) if r.outcome == TransparencyOutcome::ObligationsApply => {
                Classification::LimitedRisk
            }
            _ => continue,
        };
        if candidate.precedence() < suggested.precedence() {
            suggested = candidate;
        }
    }
    suggested
}

/// `High` with no `NeedsReview` outcome, `Low` with two or more, `Medium`
/// otherwise. A `Blocked` suggestion is a hard rule and is always `High`.
pub fn derive_confidence(stage_results: &[StageResult], suggested: Classification) -> Confidence {
    if suggested == Classification::Blocked {
        return Confidence::High;
    }
    let needs_review = stage_results.iter().filter(|r| r.needs_review()).count();
    Confidence::from_needs_review_count(needs_review)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questions::keys;
    use crate::stage::Stage;
    use crate::stages::fixtures::{all_no, with};
    use airc_core::{Answer, TriState, YesNoUnknown};

    fn stages_of(outcome: &ClassificationOutcome) -> Vec<Stage> {
        outcome.stage_results.iter().map(StageResult::stage).collect()
    }

    #[test]
    fn minimal_risk_runs_all_stages() {
        let out = ClassificationOrchestrator::new().classify(&all_no()).unwrap();
        assert_eq!(out.suggested, Classification::MinimalRisk);
        assert_eq!(out.confidence, Confidence::High);
        assert_eq!(stages_of(&out), Stage::ORDER.to_vec());
        assert_eq!(out.profile_version, 1);
    }

    #[test]
    fn prohibited_yes_halts_pipeline() {
        let p = with(all_no(), keys::PROHIBITED[2], Answer::TriState(TriState::Yes));
        let out = ClassificationOrchestrator::new().classify(&p).unwrap();
        assert_eq!(out.suggested, Classification::Blocked);
        assert_eq!(out.confidence, Confidence::High);
        assert_eq!(stages_of(&out), vec![Stage::Definition, Stage::Prohibited]);
    }

    #[test]
    fn blocked_run_ignores_missing_downstream_answers() {
        let mut p = with(all_no(), keys::PROHIBITED[0], Answer::TriState(TriState::Unsure));
        for key in keys::HIGH_RISK {
            p.answers.remove(key);
        }
        let out = ClassificationOrchestrator::new().classify(&p).unwrap();
        assert_eq!(out.suggested, Classification::Blocked);
    }

    #[test]
    fn high_risk_beats_limited_risk() {
        let p = with(all_no(), keys::HIGH_RISK[0], Answer::TriState(TriState::Yes));
        let p = with(p, keys::TR_INTERACTS, Answer::YesNoUnknown(YesNoUnknown::Yes));
        let out = ClassificationOrchestrator::new().classify(&p).unwrap();
        assert_eq!(out.suggested, Classification::HighRiskCandidate);
    }

    #[test]
    fn transparency_alone_is_limited_risk() {
        let p = with(all_no(), keys::TR_SYNTHETIC, Answer::YesNoUnknown(YesNoUnknown::Yes));
        let out = ClassificationOrchestrator::new().classify(&p).unwrap();
        assert_eq!(out.suggested, Classification::LimitedRisk);
    }

    #[test]
    fn one_needs_review_is_medium_two_is_low() {
        let one = with(
            all_no(),
            keys::DEF_INFERS_OUTPUTS,
            Answer::TriState(TriState::Unsure),
        );
        let out = ClassificationOrchestrator::new().classify(&one).unwrap();
        assert_eq!(out.confidence, Confidence::Medium);

        let two = with(one, keys::HIGH_RISK[4], Answer::TriState(TriState::Unsure));
        let out = ClassificationOrchestrator::new().classify(&two).unwrap();
        assert_eq!(out.confidence, Confidence::Low);
    }

    #[test]
    fn malformed_catalogue_answer_fails_before_stages() {
        let p = with(all_no(), keys::DEF_OUTPUT_TYPES, Answer::tags(["vibes"]));
        assert!(matches!(
            ClassificationOrchestrator::new().classify(&p),
            Err(ValidationError::UnknownTag { .. })
        ));
    }

    #[test]
    fn unknown_keys_are_ignored_at_evaluation() {
        let p = with(all_no(), "system.name", Answer::text("Hiring assistant"));
        assert!(ClassificationOrchestrator::new().classify(&p).is_ok());
    }
}
