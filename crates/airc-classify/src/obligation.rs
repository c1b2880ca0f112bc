//! # Obligation Mapper
//!
//! Deterministic table lookup from `(final classification, stage results)`
//! to a set of obligation identifiers. No hidden state: the same inputs
//! always yield the same set.
//!
//! | Final classification | Obligations |
//! |---|---|
//! | `HighRiskCandidate` | high-risk set ∪ transparency obligations that apply |
//! | `LimitedRisk` | transparency obligations that apply, else `transparency-review` |
//! | `MinimalRisk` | none |
//! | `Blocked` | none (legal review is a side effect, not an obligation) |

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use airc_core::Classification;

use crate::stage::{ImplementationStatus, StageResult, TransparencyResult, TransparencyScenario};

/// Closed set of obligation identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObligationId {
    // High-risk
    /// Assign human oversight with authority to intervene.
    OversightAssignment,
    /// Retain automatically generated logs for at least six months.
    #[serde(rename = "log-retention-6mo")]
    LogRetention6mo,
    /// Report serious incidents to the provider and authority.
    IncidentReporting,
    /// Monitor operation against the provider's instructions.
    MonitoringPlan,
    /// Use the system in accordance with the instructions for use.
    UsePerInstructions,
    /// Ensure input data is relevant and representative.
    InputDataQuality,
    // Transparency
    /// Inform persons that they are interacting with an AI system.
    DiscloseAiInteraction,
    /// Mark synthetic output in a machine-readable format.
    MarkSyntheticContent,
    /// Inform exposed persons of emotion recognition or biometric categorisation.
    InformExposedPersons,
    /// Disclose that deepfake content is artificially generated.
    LabelDeepfakes,
    /// Disclose that public-interest text is AI-generated.
    LabelAiGeneratedText,
    /// Review which transparency duties apply.
    TransparencyReview,
}

impl ObligationId {
    /// The high-risk deployer obligation set.
    pub const HIGH_RISK: [ObligationId; 6] = [
        Self::OversightAssignment,
        Self::LogRetention6mo,
        Self::IncidentReporting,
        Self::MonitoringPlan,
        Self::UsePerInstructions,
        Self::InputDataQuality,
    ];

    /// Stable kebab-case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OversightAssignment => "oversight-assignment",
            Self::LogRetention6mo => "log-retention-6mo",
            Self::IncidentReporting => "incident-reporting",
            Self::MonitoringPlan => "monitoring-plan",
            Self::UsePerInstructions => "use-per-instructions",
            Self::InputDataQuality => "input-data-quality",
            Self::DiscloseAiInteraction => "disclose-ai-interaction",
            Self::MarkSyntheticContent => "mark-synthetic-content",
            Self::InformExposedPersons => "inform-exposed-persons",
            Self::LabelDeepfakes => "label-deepfakes",
            Self::LabelAiGeneratedText => "label-ai-generated-text",
            Self::TransparencyReview => "transparency-review",
        }
    }

    /// Human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::OversightAssignment => {
                "Assign human oversight to competent persons with authority to intervene"
            }
            Self::LogRetention6mo => "Retain automatically generated logs for at least six months",
            Self::IncidentReporting => {
                "Report serious incidents to the provider and the market surveillance authority"
            }
            Self::MonitoringPlan => "Monitor operation of the system on the basis of the instructions for use",
            Self::UsePerInstructions => "Use the system in accordance with the provider's instructions for use",
            Self::InputDataQuality => {
                "Ensure input data under deployer control is relevant and sufficiently representative"
            }
            Self::DiscloseAiInteraction => {
                "Inform natural persons that they are interacting with an AI system"
            }
            Self::MarkSyntheticContent => {
                "Mark synthetic audio, image, video or text output as artificially generated"
            }
            Self::InformExposedPersons => {
                "Inform exposed persons of emotion recognition or biometric categorisation"
            }
            Self::LabelDeepfakes => "Disclose that deepfake content has been artificially generated or manipulated",
            Self::LabelAiGeneratedText => {
                "Disclose that text published to inform the public was artificially generated"
            }
            Self::TransparencyReview => "Review which transparency duties apply to this system",
        }
    }

    /// Whether this obligation belongs to the transparency family.
    pub fn is_transparency(&self) -> bool {
        !Self::HIGH_RISK.contains(self)
    }

    /// The obligation triggered by a disclosure scenario.
    pub fn for_scenario(scenario: TransparencyScenario) -> Self {
        match scenario {
            TransparencyScenario::InteractsWithPersons => Self::DiscloseAiInteraction,
            TransparencyScenario::GeneratesSyntheticContent => Self::MarkSyntheticContent,
            TransparencyScenario::EmotionOrBiometricExposure => Self::InformExposedPersons,
            TransparencyScenario::DeepfakeContent => Self::LabelDeepfakes,
            TransparencyScenario::PublicInterestText => Self::LabelAiGeneratedText,
        }
    }

    /// Identifier and description together.
    pub fn obligation(&self) -> Obligation {
        Obligation {
            id: *self,
            description: self.description().to_string(),
        }
    }
}

impl std::fmt::Display for ObligationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An obligation identifier with its description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obligation {
    /// Stable identifier.
    pub id: ObligationId,
    /// Human-readable description.
    pub description: String,
}

fn transparency_result(stage_results: &[StageResult]) -> Option<&TransparencyResult> {
    stage_results.iter().find_map(|r| match r {
        StageResult::Transparency(t) => Some(t),
        _ => None,
    })
}

fn transparency_obligations(stage_results: &[StageResult]) -> BTreeSet<ObligationId> {
    transparency_result(stage_results)
        .map(|t| {
            t.scenarios_applying()
                .into_iter()
                .map(ObligationId::for_scenario)
                .collect()
        })
        .unwrap_or_default()
}

/// Map a final classification and its stage results to obligations.
pub fn map_obligations(
    final_classification: Classification,
    stage_results: &[StageResult],
) -> BTreeSet<ObligationId> {
    match final_classification {
        Classification::HighRiskCandidate => {
            let mut set: BTreeSet<ObligationId> = ObligationId::HIGH_RISK.into_iter().collect();
            set.extend(transparency_obligations(stage_results));
            set
        }
        Classification::LimitedRisk => {
            let set = transparency_obligations(stage_results);
            if set.is_empty() {
                BTreeSet::from([ObligationId::TransparencyReview])
            } else {
                set
            }
        }
        Classification::MinimalRisk | Classification::Blocked => BTreeSet::new(),
    }
}

// ─── Gap report ─────────────────────────────────────────────────────

/// One transparency obligation and whether it is an open gap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapRow {
    /// The obligation.
    pub obligation: Obligation,
    /// True when the implementation status is `gaps_exist` or unanswered.
    pub gap: bool,
}

/// Transparency obligations of a version, with the implementation status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapReport {
    /// Final classification of the version.
    pub classification: Classification,
    /// Status from the transparency stage, if it ran and was answered.
    pub implementation_status: Option<ImplementationStatus>,
    /// One row per transparency obligation.
    pub rows: Vec<GapRow>,
}

impl GapReport {
    /// Number of rows flagged as gaps.
    pub fn open_gaps(&self) -> usize {
        self.rows.iter().filter(|r| r.gap).count()
    }
}

/// Build the gap report for a version's obligations.
pub fn gap_report(
    final_classification: Classification,
    obligations: &BTreeSet<ObligationId>,
    stage_results: &[StageResult],
) -> GapReport {
    let implementation_status = transparency_result(stage_results).and_then(|t| t.implementation_status);
    let gap = !matches!(
        implementation_status,
        Some(ImplementationStatus::Implemented | ImplementationStatus::NotApplicable)
    );
    let rows = obligations
        .iter()
        .filter(|o| o.is_transparency())
        .map(|o| GapRow {
            obligation: o.obligation(),
            gap,
        })
        .collect();
    GapReport {
        classification: final_classification,
        implementation_status,
        rows,
    }
}
