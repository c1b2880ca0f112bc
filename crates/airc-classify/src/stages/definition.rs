//! Definition stage: is the subject an AI system at all?
//!
//! Never blocks. A subject that is likely out of scope stays in inventory
//! and continues through the remaining stages.

use airc_core::{Profile, TriState, ValidationError};

use crate::questions::keys;
use crate::stage::{
    AnswerReader, DefinitionOutcome, DefinitionResult, Stage, StageEvaluator, StageResult,
};

/// Evaluates the definition stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefinitionEvaluator;

impl StageEvaluator for DefinitionEvaluator {
    fn stage(&self) -> Stage {
        Stage::Definition
    }

    fn evaluate(
        &self,
        profile: &Profile,
        _previous: Option<&StageResult>,
    ) -> Result<StageResult, ValidationError> {
        let mut reader = AnswerReader::new(profile);
        let inference = [
            reader.tri_state(keys::DEF_INFERS_OUTPUTS)?,
            reader.tri_state(keys::DEF_USES_INFERENCE)?,
        ];
        let autonomy = reader.tri_state(keys::DEF_OPERATES_AUTONOMOUSLY)?;
        let output_types = reader.tags(keys::DEF_OUTPUT_TYPES)?;
        reader.number(keys::DEF_AUTONOMY_LEVEL)?;
        let rationale = reader.rationale(keys::DEF_RATIONALE)?;

        let any_unsure = inference.contains(&TriState::Unsure) || autonomy == TriState::Unsure;
        let outcome = if any_unsure {
            DefinitionOutcome::NeedsReview
        } else if inference.contains(&TriState::Yes) && !output_types.is_empty() {
            DefinitionOutcome::LikelyInScope
        } else {
            DefinitionOutcome::LikelyOutOfScope
        };

        Ok(StageResult::Definition(DefinitionResult {
            outcome,
            answers: reader.finish(),
            rationale,
            blocks: false,
        }))
    }
}
