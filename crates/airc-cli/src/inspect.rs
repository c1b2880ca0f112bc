//! # Read-only Subcommands
//!
//! `current`, `history`, `gaps` and `verify` read the ledger without
//! sealing anything. `verify` exits with status 2 when the chain is broken.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use airc_core::VersionNumber;

use crate::profile::NoProfiles;
use crate::{open_engine, parse_subject, print_json, LedgerArgs};

/// Arguments naming one subject.
#[derive(Args, Debug)]
pub struct SubjectArgs {
    #[command(flatten)]
    pub ledger: LedgerArgs,

    /// Subject UUID.
    #[arg(long)]
    pub subject: String,
}

/// Arguments naming one version of a subject.
#[derive(Args, Debug)]
pub struct VersionArgs {
    #[command(flatten)]
    pub subject: SubjectArgs,

    /// Version number, from 1.
    #[arg(long)]
    pub version: u64,
}

/// Execute `airc current`.
pub fn run_current(args: &SubjectArgs) -> Result<u8> {
    let subject = parse_subject(&args.subject)?;
    let engine = open_engine(&args.ledger, Arc::new(NoProfiles))?;
    print_json(&engine.get_current(subject)?)?;
    Ok(0)
}

/// Execute `airc history`.
pub fn run_history(args: &SubjectArgs) -> Result<u8> {
    let subject = parse_subject(&args.subject)?;
    let engine = open_engine(&args.ledger, Arc::new(NoProfiles))?;
    print_json(&engine.get_history(subject)?)?;
    Ok(0)
}

/// Execute `airc gaps`.
pub fn run_gaps(args: &VersionArgs) -> Result<u8> {
    let subject = parse_subject(&args.subject.subject)?;
    let number = VersionNumber::new(args.version).context("invalid --version")?;
    let engine = open_engine(&args.subject.ledger, Arc::new(NoProfiles))?;
    let report = engine.gap_report(subject, number)?;
    tracing::info!(
        subject_id = %subject,
        version = %number,
        open_gaps = report.open_gaps(),
        "gap report"
    );
    print_json(&report)?;
    Ok(0)
}

/// Execute `airc verify`.
pub fn run_verify(args: &SubjectArgs) -> Result<u8> {
    let subject = parse_subject(&args.subject)?;
    let engine = open_engine(&args.ledger, Arc::new(NoProfiles))?;
    let report = engine.verify_history(subject)?;
    print_json(&report)?;
    Ok(if report.intact { 0 } else { 2 })
}
