//! Transparency stage.
//!
//! `ObligationsApply` iff any of the five disclosure scenarios is yes. The
//! implementation status is carried on the result for gap reporting and
//! never changes the outcome.

use airc_core::{Profile, ValidationError, YesNoUnknown};

use crate::questions::keys;
use crate::stage::{
    AnswerReader, ImplementationStatus, Stage, StageEvaluator, StageResult, TransparencyOutcome,
    TransparencyResult,
};

/// Evaluates the five disclosure scenarios.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransparencyEvaluator;

impl StageEvaluator for TransparencyEvaluator {
    fn stage(&self) -> Stage {
        Stage::Transparency
    }

    fn evaluate(
        &self,
        profile: &Profile,
        _previous: Option<&StageResult>,
    ) -> Result<StageResult, ValidationError> {
        let mut reader = AnswerReader::new(profile);
        let scenarios = keys::TRANSPARENCY
            .iter()
            .map(|key| reader.yes_no_unknown(key))
            .collect::<Result<Vec<_>, _>>()?;
        let status_tags = reader.tags(keys::TR_IMPLEMENTATION_STATUS)?;
        let rationale = reader.rationale(keys::TR_RATIONALE)?;

        let implementation_status = match status_tags.len() {
            0 => None,
            1 => status_tags
                .iter()
                .next()
                .and_then(|t| ImplementationStatus::from_tag(t)),
            count => {
                return Err(ValidationError::SingleSelect {
                    key: keys::TR_IMPLEMENTATION_STATUS.to_string(),
                    count,
                })
            }
        };

        let outcome = if scenarios.contains(&YesNoUnknown::Yes) {
            TransparencyOutcome::ObligationsApply
        } else {
            TransparencyOutcome::NoObligations
        };

        Ok(StageResult::Transparency(TransparencyResult {
            outcome,
            answers: reader.finish(),
            rationale,
            blocks: false,
            implementation_status,
        }))
    }
}
