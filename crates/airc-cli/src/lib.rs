//! # airc-cli: Command-Line Interface
//!
//! Provides the `airc` binary: a one-shot front end over a file-backed
//! version ledger. Each invocation assembles a fresh engine over the ledger
//! directory, so monitor state is rebuilt from the sealed versions on disk.
//!
//! ## Subcommands
//!
//! - `airc evaluate`: Classify a profile file and seal a version.
//! - `airc review`: Sign off or override a sealed version.
//! - `airc current` / `airc history`: Read sealed versions.
//! - `airc gaps`: Transparency gap report for a version.
//! - `airc verify`: Re-derive the digest chain of a subject.
//!
//! ```bash
//! airc evaluate --ledger ./ledger --profile chatbot.yaml
//! airc review --ledger ./ledger --reviewers reviewers.json \
//!     --subject 5b0c... --version 1 --final LIMITED_RISK \
//!     --reviewer legal@example.org --rationale "disclosure banner shipped"
//! airc verify --ledger ./ledger --subject 5b0c...
//! ```
//!
//! Results are printed to stdout as pretty JSON; logs go to stderr.

pub mod evaluate;
pub mod inspect;
pub mod profile;
pub mod review;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use airc_core::SubjectId;
use airc_engine::{
    ClassificationEngine, Dispatcher, EngineConfig, ProfileSource, StaticAuthorizer, TracingSink,
};
use airc_ledger::FileLedger;

/// Ledger and reviewer options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct LedgerArgs {
    /// Directory holding the version ledger.
    #[arg(long)]
    pub ledger: PathBuf,

    /// JSON grant table of reviewer capabilities. Without it every review
    /// is denied.
    #[arg(long)]
    pub reviewers: Option<PathBuf>,
}

/// Assemble an engine over the ledger directory.
pub fn open_engine(
    args: &LedgerArgs,
    profiles: Arc<dyn ProfileSource>,
) -> Result<ClassificationEngine> {
    let config = EngineConfig::from_env().context("invalid engine configuration")?;
    let authorizer = match &args.reviewers {
        Some(path) => load_reviewers(path)?,
        None => StaticAuthorizer::new(),
    };
    tracing::debug!(ledger = %args.ledger.display(), ?config, "opening ledger");
    Ok(ClassificationEngine::new(
        config,
        profiles,
        Arc::new(authorizer),
        Arc::new(FileLedger::new(args.ledger.clone())),
    )
    .with_dispatcher(Dispatcher::new().with_sink(Arc::new(TracingSink))))
}

/// Read a reviewer grant table.
pub fn load_reviewers(path: &Path) -> Result<StaticAuthorizer> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read reviewers file: {}", path.display()))?;
    StaticAuthorizer::from_json(&raw)
        .with_context(|| format!("invalid reviewers file: {}", path.display()))
}

/// Parse a `--subject` value.
pub fn parse_subject(raw: &str) -> Result<SubjectId> {
    SubjectId::parse(raw).with_context(|| format!("invalid subject id: {raw:?}"))
}

/// Print a value to stdout as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
