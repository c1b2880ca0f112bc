//! High-risk category stage.
//!
//! Does not block. Its outcome gates the high-risk obligation set and the
//! `downstream_assessments_relevant` flag.

use airc_core::{Profile, ValidationError};

use crate::questions::keys;
use crate::stage::{
    screen, AnswerReader, HighRiskOutcome, HighRiskResult, ScreenVerdict, Stage, StageEvaluator,
    StageResult,
};

/// Evaluates the nine high-risk categories.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighRiskEvaluator;

impl StageEvaluator for HighRiskEvaluator {
    fn stage(&self) -> Stage {
        Stage::HighRisk
    }

    fn evaluate(
        &self,
        profile: &Profile,
        _previous: Option<&StageResult>,
    ) -> Result<StageResult, ValidationError> {
        let mut reader = AnswerReader::new(profile);
        let answers = keys::HIGH_RISK
            .iter()
            .map(|key| reader.tri_state(key))
            .collect::<Result<Vec<_>, _>>()?;
        let deployer_context = reader.tags(keys::HIGH_RISK_DEPLOYER_CONTEXT)?;
        let rationale = reader.rationale(keys::HIGH_RISK_RATIONALE)?;

        let outcome = match screen(&answers) {
            ScreenVerdict::AnyYes => HighRiskOutcome::HighRiskCandidate,
            ScreenVerdict::AnyUnsure => HighRiskOutcome::NeedsReview,
            ScreenVerdict::AllNo => HighRiskOutcome::NotHighRisk,
        };

        Ok(StageResult::HighRisk(HighRiskResult {
            outcome,
            answers: reader.finish(),
            rationale,
            blocks: false,
            downstream_assessments_relevant: outcome == HighRiskOutcome::HighRiskCandidate
                && !deployer_context.is_empty(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::fixtures::{all_no, with};
    use airc_core::{Answer, TriState};

    fn result(profile: &Profile) -> HighRiskResult {
        match HighRiskEvaluator.evaluate(profile, None).unwrap() {
            StageResult::HighRisk(r) => r,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn all_no_is_not_high_risk() {
        let r = result(&all_no());
        assert_eq!(r.outcome, HighRiskOutcome::NotHighRisk);
        assert!(!r.blocks);
        assert!(!r.downstream_assessments_relevant);
    }

    #[test]
    fn one_yes_is_candidate_and_never_blocks() {
        let r = result(&with(
            all_no(),
            keys::HIGH_RISK[3],
            Answer::TriState(TriState::Yes),
        ));
        assert_eq!(r.outcome, HighRiskOutcome::HighRiskCandidate);
        assert!(!r.blocks);
    }

    #[test]
    fn unsure_needs_review() {
        let r = result(&with(
            all_no(),
            keys::HIGH_RISK[8],
            Answer::TriState(TriState::Unsure),
        ));
        assert_eq!(r.outcome, HighRiskOutcome::NeedsReview);
    }

    #[test]
    fn downstream_flag_requires_candidate_and_context() {
        let with_context = with(
            all_no(),
            keys::HIGH_RISK_DEPLOYER_CONTEXT,
            Answer::tags(["workplace"]),
        );
        assert!(!result(&with_context).downstream_assessments_relevant);

        let candidate = with(
            with_context,
            keys::HIGH_RISK[0],
            Answer::TriState(TriState::Yes),
        );
        assert!(result(&candidate).downstream_assessments_relevant);
    }
}
