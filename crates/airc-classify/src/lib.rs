//! # airc-classify: Staged Risk Classification
//!
//! - **Questions** (`questions.rs`): the catalogue of question keys, answer
//!   kinds and closed tag enumerations.
//!
//! - **Stages** (`stage.rs`, `stages/`): the [`StageEvaluator`] seam and the
//!   four evaluators (Definition, Prohibited, HighRisk, Transparency).
//!
//! - **Orchestrator** (`orchestrator.rs`): fixed-order pipeline with
//!   short-circuit on the first blocking stage, classification precedence
//!   and confidence derivation.
//!
//! - **Obligations** (`obligation.rs`): deterministic obligation table and
//!   the transparency gap report.
//!
//! Everything here is a pure function of its inputs. No I/O, no clocks.

pub mod obligation;
pub mod orchestrator;
pub mod questions;
pub mod stage;
pub mod stages;

pub use obligation::{gap_report, map_obligations, GapReport, GapRow, Obligation, ObligationId};
pub use orchestrator::{ClassificationOrchestrator, ClassificationOutcome};
pub use stage::{
    AnsweredQuestion, DefinitionOutcome, HighRiskOutcome, ImplementationStatus, ProhibitedOutcome,
    Stage, StageEvaluator, StageResult, TransparencyOutcome,
};
