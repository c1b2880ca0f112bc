//! # Stage Evaluators
//!
//! One unit struct per stage, each implementing [`StageEvaluator`]. All four
//! are pure functions of the profile.
//!
//! [`StageEvaluator`]: crate::stage::StageEvaluator

pub mod definition;
pub mod high_risk;
pub mod prohibited;
pub mod transparency;

pub use definition::DefinitionEvaluator;
pub use high_risk::HighRiskEvaluator;
pub use prohibited::ProhibitedEvaluator;
pub use transparency::TransparencyEvaluator;

#[cfg(test)]
pub(crate) mod fixtures {
    use airc_core::{Answer, AnswerMap, Profile, SubjectId, TriState, YesNoUnknown};

    use crate::questions::keys;

    /// A profile that answers every required question with "no" and selects
    /// no output types.
    pub(crate) fn all_no() -> Profile {
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
        Profile::new(SubjectId::new(), answers)
    }

    pub(crate) fn with(mut profile: Profile, key: &str, answer: Answer) -> Profile {
        profile.answers.insert(key.into(), answer);
        profile
    }
}
