//! # Question Catalogue
//!
//! Single definition of every question key the stages read, the answer kind
//! each expects, and the closed tag enumerations. Intake validates submitted
//! answers against this table; the orchestrator re-validates the catalogue
//! keys present on a profile before any stage runs.

use airc_core::{Answer, AnswerKind, AnswerMap, ValidationError};

/// Question keys, grouped by stage.
pub mod keys {
    /// Inference signal: does the system infer outputs from inputs?
    pub const DEF_INFERS_OUTPUTS: &str = "definition.infers_outputs";
    /// Inference signal: does it use machine-learning or logic-based techniques?
    pub const DEF_USES_INFERENCE: &str = "definition.uses_inference_techniques";
    /// Autonomy signal.
    pub const DEF_OPERATES_AUTONOMOUSLY: &str = "definition.operates_autonomously";
    /// Output types produced.
    pub const DEF_OUTPUT_TYPES: &str = "definition.output_types";
    /// Optional autonomy level, 0 to 5.
    pub const DEF_AUTONOMY_LEVEL: &str = "definition.autonomy_level";
    /// Free-text rationale for the definition stage.
    pub const DEF_RATIONALE: &str = "definition.rationale";

    /// The eight prohibited-practice questions.
    pub const PROHIBITED: [&str; 8] = [
        "prohibited.subliminal_manipulation",
        "prohibited.exploitation_of_vulnerabilities",
        "prohibited.social_scoring",
        "prohibited.predictive_policing_profiling",
        "prohibited.untargeted_facial_scraping",
        "prohibited.emotion_recognition_workplace_education",
        "prohibited.biometric_categorisation_sensitive",
        "prohibited.realtime_remote_biometric_identification",
    ];
    /// Free-text rationale for the prohibited stage.
    pub const PROHIBITED_RATIONALE: &str = "prohibited.rationale";

    /// The nine high-risk category questions.
    pub const HIGH_RISK: [&str; 9] = [
        "high_risk.biometrics",
        "high_risk.critical_infrastructure",
        "high_risk.education_training",
        "high_risk.employment_workers",
        "high_risk.essential_services",
        "high_risk.law_enforcement",
        "high_risk.migration_border",
        "high_risk.justice_democracy",
        "high_risk.product_safety_component",
    ];
    /// Deployer contexts that make downstream assessments relevant.
    pub const HIGH_RISK_DEPLOYER_CONTEXT: &str = "high_risk.deployer_context";
    /// Free-text rationale for the high-risk stage.
    pub const HIGH_RISK_RATIONALE: &str = "high_risk.rationale";

    /// Disclosure scenario: the system interacts directly with natural persons.
    pub const TR_INTERACTS: &str = "transparency.interacts_with_persons";
    /// Disclosure scenario: synthetic audio, image, video or text output.
    pub const TR_SYNTHETIC: &str = "transparency.generates_synthetic_content";
    /// Disclosure scenario: emotion recognition or biometric categorisation exposure.
    pub const TR_EMOTION: &str = "transparency.emotion_or_biometric_exposure";
    /// Disclosure scenario: deepfake content.
    pub const TR_DEEPFAKE: &str = "transparency.deepfake_content";
    /// Disclosure scenario: text published to inform the public.
    pub const TR_PUBLIC_TEXT: &str = "transparency.public_interest_text";
    /// The five disclosure scenarios in catalogue order.
    pub const TRANSPARENCY: [&str; 5] =
        [TR_INTERACTS, TR_SYNTHETIC, TR_EMOTION, TR_DEEPFAKE, TR_PUBLIC_TEXT];
    /// Human-entered implementation status of transparency measures.
    pub const TR_IMPLEMENTATION_STATUS: &str = "transparency.implementation_status";
    /// Free-text rationale for the transparency stage.
    pub const TR_RATIONALE: &str = "transparency.rationale";
}

/// Closed enumeration for `definition.output_types`.
pub const OUTPUT_TYPES: &[&str] = &["predictions", "content", "recommendations", "decisions"];

/// Closed enumeration for `high_risk.deployer_context`.
pub const DEPLOYER_CONTEXTS: &[&str] = &["workplace", "public_authority", "public_service_provider"];

/// Closed enumeration for `transparency.implementation_status`.
pub const IMPLEMENTATION_STATUSES: &[&str] = &["not_applicable", "implemented", "gaps_exist"];

/// Declaration of one catalogue question.
#[derive(Debug, Clone, Copy)]
pub struct Question {
    /// The question key.
    pub key: &'static str,
    /// The answer kind it expects.
    pub kind: AnswerKind,
    /// Whether the owning stage fails when it is absent.
    pub required: bool,
    /// Allowed tags, for tag questions.
    pub allowed_tags: &'static [&'static str],
    /// Whether a tag question takes exactly one tag.
    pub single_select: bool,
    /// Inclusive bounds, for number questions.
    pub range: Option<(i64, i64)>,
}

impl Question {
    const fn tri(key: &'static str) -> Self {
        Self::of(key, AnswerKind::TriState, true)
    }

    const fn yes_no(key: &'static str) -> Self {
        Self::of(key, AnswerKind::YesNoUnknown, true)
    }

    const fn text(key: &'static str) -> Self {
        Self::of(key, AnswerKind::Text, false)
    }

    const fn tags(key: &'static str, allowed: &'static [&'static str], single: bool) -> Self {
        Self {
            key,
            kind: AnswerKind::Tags,
            required: false,
            allowed_tags: allowed,
            single_select: single,
            range: None,
        }
    }

    const fn of(key: &'static str, kind: AnswerKind, required: bool) -> Self {
        Self {
            key,
            kind,
            required,
            allowed_tags: &[],
            single_select: false,
            range: None,
        }
    }

    /// Check one answer against this declaration.
    pub fn validate(&self, answer: &Answer) -> Result<(), ValidationError> {
        if answer.kind() != self.kind {
            return Err(ValidationError::WrongAnswerKind {
                key: self.key.to_string(),
                expected: self.kind.as_str().to_string(),
                found: answer.kind().as_str().to_string(),
            });
        }
        match answer {
            Answer::Tags(tags) => {
                if let Some(bad) = tags.iter().find(|t| !self.allowed_tags.contains(&t.as_str())) {
                    return Err(ValidationError::UnknownTag {
                        key: self.key.to_string(),
                        tag: bad.clone(),
                    });
                }
                if self.single_select && tags.len() != 1 {
                    return Err(ValidationError::SingleSelect {
                        key: self.key.to_string(),
                        count: tags.len(),
                    });
                }
            }
            Answer::Number(value) => {
                if let Some((min, max)) = self.range {
                    if *value < min || *value > max {
                        return Err(ValidationError::NumberOutOfRange {
                            key: self.key.to_string(),
                            min,
                            max,
                            value: *value,
                        });
                    }
                }
            }
            Answer::TriState(_) | Answer::YesNoUnknown(_) | Answer::Text(_) => {}
        }
        Ok(())
    }
}

/// Every question the stages read.
pub static CATALOGUE: &[Question] = &[
    // -- Definition ---------------------------------------------------------
    Question::tri(keys::DEF_INFERS_OUTPUTS),
    Question::tri(keys::DEF_USES_INFERENCE),
    Question::tri(keys::DEF_OPERATES_AUTONOMOUSLY),
    Question::tags(keys::DEF_OUTPUT_TYPES, OUTPUT_TYPES, false),
    Question {
        key: keys::DEF_AUTONOMY_LEVEL,
        kind: AnswerKind::Number,
        required: false,
        allowed_tags: &[],
        single_select: false,
        range: Some((0, 5)),
    },
    Question::text(keys::DEF_RATIONALE),
    // -- Prohibited ---------------------------------------------------------
    Question::tri(keys::PROHIBITED[0]),
    Question::tri(keys::PROHIBITED[1]),
    Question::tri(keys::PROHIBITED[2]),
    Question::tri(keys::PROHIBITED[3]),
    Question::tri(keys::PROHIBITED[4]),
    Question::tri(keys::PROHIBITED[5]),
    Question::tri(keys::PROHIBITED[6]),
    Question::tri(keys::PROHIBITED[7]),
    Question::text(keys::PROHIBITED_RATIONALE),
    // -- High risk ----------------------------------------------------------
    Question::tri(keys::HIGH_RISK[0]),
    Question::tri(keys::HIGH_RISK[1]),
    Question::tri(keys::HIGH_RISK[2]),
    Question::tri(keys::HIGH_RISK[3]),
    Question::tri(keys::HIGH_RISK[4]),
    Question::tri(keys::HIGH_RISK[5]),
    Question::tri(keys::HIGH_RISK[6]),
    Question::tri(keys::HIGH_RISK[7]),
    Question::tri(keys::HIGH_RISK[8]),
    Question::tags(keys::HIGH_RISK_DEPLOYER_CONTEXT, DEPLOYER_CONTEXTS, false),
    Question::text(keys::HIGH_RISK_RATIONALE),
    // -- Transparency -------------------------------------------------------
    Question::yes_no(keys::TR_INTERACTS),
    Question::yes_no(keys::TR_SYNTHETIC),
    Question::yes_no(keys::TR_EMOTION),
    Question::yes_no(keys::TR_DEEPFAKE),
    Question::yes_no(keys::TR_PUBLIC_TEXT),
    Question::tags(keys::TR_IMPLEMENTATION_STATUS, IMPLEMENTATION_STATUSES, true),
    Question::text(keys::TR_RATIONALE),
];

/// Look up a question by key.
pub fn lookup(key: &str) -> Option<&'static Question> {
    CATALOGUE.iter().find(|q| q.key == key)
}

/// Strict validation for intake: every key must be in the catalogue and
/// every answer must match its declaration.
pub fn validate_answers(answers: &AnswerMap) -> Result<(), ValidationError> {
    for (key, answer) in answers {
        let question = lookup(key).ok_or_else(|| ValidationError::UnknownQuestion(key.clone()))?;
        question.validate(answer)?;
    }
    Ok(())
}

/// Validation at evaluation time: catalogue keys present on the profile
/// must match their declarations. Keys outside the catalogue are ignored.
pub fn validate_known_answers(answers: &AnswerMap) -> Result<(), ValidationError> {
    CATALOGUE.iter().try_for_each(|q| match answers.get(q.key) {
        Some(answer) => q.validate(answer),
        None => Ok(()),
    })
}
