//! # Review Subcommand
//!
//! Records a human sign-off or override against the latest sealed version.
//! `--final` equal to the engine's suggestion is a sign-off; anything else is
//! an override and needs `--rationale`.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use airc_core::{Classification, ReviewerId, VersionNumber};
use airc_engine::ReviewRequest;
use airc_ledger::ClassificationVersion;

use crate::profile::NoProfiles;
use crate::{open_engine, parse_subject, print_json, LedgerArgs};

/// Arguments for `airc review`.
#[derive(Args, Debug)]
pub struct ReviewArgs {
    #[command(flatten)]
    pub ledger: LedgerArgs,

    /// Subject UUID.
    #[arg(long)]
    pub subject: String,

    /// Version being reviewed; must be the latest.
    #[arg(long)]
    pub version: u64,

    /// Final classification, e.g. `LIMITED_RISK` or `limited-risk`.
    #[arg(long = "final")]
    pub final_classification: String,

    /// Reviewer identity, checked against the `--reviewers` grant table.
    #[arg(long)]
    pub reviewer: String,

    /// Why the suggestion was changed. Required for overrides.
    #[arg(long, default_value = "")]
    pub rationale: String,
}

/// Execute `airc review`.
pub fn run_review(args: &ReviewArgs) -> Result<u8> {
    let version = review(args)?;
    print_json(&version)?;
    Ok(0)
}

/// Apply the review and return the new version.
pub fn review(args: &ReviewArgs) -> Result<ClassificationVersion> {
    let request = ReviewRequest {
        subject_id: parse_subject(&args.subject)?,
        version: VersionNumber::new(args.version).context("invalid --version")?,
        final_classification: args
            .final_classification
            .parse::<Classification>()
            .context("invalid --final")?,
        reviewer: ReviewerId::new(args.reviewer.as_str()).context("invalid --reviewer")?,
        rationale: args.rationale.clone(),
    };
    let engine = open_engine(&args.ledger, Arc::new(NoProfiles))?;
    engine
        .override_classification(request)
        .context("review was not recorded")
}
