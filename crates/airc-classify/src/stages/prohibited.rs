//! Prohibited-practice stage.
//!
//! The only blocking stage. `Flagged` and `NeedsReview` both halt the
//! pipeline; only a human override can clear the result.

use airc_core::{Profile, ValidationError};

use crate::questions::keys;
use crate::stage::{
    screen, AnswerReader, ProhibitedOutcome, ProhibitedResult, ScreenVerdict, Stage,
    StageEvaluator, StageResult,
};

/// Evaluates the eight prohibited-practice questions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProhibitedEvaluator;

impl StageEvaluator for ProhibitedEvaluator {
    fn stage(&self) -> Stage {
        Stage::Prohibited
    }

    fn evaluate(
        &self,
        profile: &Profile,
        _previous: Option<&StageResult>,
    ) -> Result<StageResult, ValidationError> {
        let mut reader = AnswerReader::new(profile);
        let answers = keys::PROHIBITED
            .iter()
            .map(|key| reader.tri_state(key))
            .collect::<Result<Vec<_>, _>>()?;
        let rationale = reader.rationale(keys::PROHIBITED_RATIONALE)?;

        let outcome = match screen(&answers) {
            ScreenVerdict::AnyYes => ProhibitedOutcome::Flagged,
            ScreenVerdict::AnyUnsure => ProhibitedOutcome::NeedsReview,
            ScreenVerdict::AllNo => ProhibitedOutcome::Clear,
        };

        Ok(StageResult::Prohibited(ProhibitedResult {
            outcome,
            answers: reader.finish(),
            rationale,
            blocks: outcome != ProhibitedOutcome::Clear,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::fixtures::{all_no, with};
    use airc_core::{Answer, TriState};

    fn result(profile: &Profile) -> ProhibitedResult {
        match ProhibitedEvaluator.evaluate(profile, None).unwrap() {
            StageResult::Prohibited(r) => r,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn all_no_is_clear_and_does_not_block() {
        let r = result(&all_no());
        assert_eq!(r.outcome, ProhibitedOutcome::Clear);
        assert!(!r.blocks);
        assert_eq!(r.answers.len(), 8);
    }

    #[test]
    fn any_yes_flags_and_blocks() {
        for key in keys::PROHIBITED {
            let r = result(&with(all_no(), key, Answer::TriState(TriState::Yes)));
            assert_eq!(r.outcome, ProhibitedOutcome::Flagged, "{key}");
            assert!(r.blocks);
        }
    }

    #[test]
    fn yes_beats_unsure() {
        let p = with(all_no(), keys::PROHIBITED[0], Answer::TriState(TriState::Unsure));
        let p = with(p, keys::PROHIBITED[7], Answer::TriState(TriState::Yes));
        assert_eq!(result(&p).outcome, ProhibitedOutcome::Flagged);
    }

    #[test]
    fn unsure_needs_review_and_blocks() {
        let r = result(&with(
            all_no(),
            keys::PROHIBITED[3],
            Answer::TriState(TriState::Unsure),
        ));
        assert_eq!(r.outcome, ProhibitedOutcome::NeedsReview);
        assert!(r.blocks);
    }

    #[test]
    fn wrong_kind_rejected() {
        let p = with(all_no(), keys::PROHIBITED[2], Answer::text("no"));
        assert!(matches!(
            ProhibitedEvaluator.evaluate(&p, None),
            Err(ValidationError::WrongAnswerKind { .. })
        ));
    }
}
