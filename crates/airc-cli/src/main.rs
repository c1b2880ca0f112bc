//! # airc CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use airc_cli::evaluate::{run_evaluate, EvaluateArgs};
use airc_cli::inspect::{run_current, run_gaps, run_history, run_verify, SubjectArgs, VersionArgs};
use airc_cli::review::{run_review, ReviewArgs};

/// AI risk classification over a file-backed version ledger.
#[derive(Parser, Debug)]
#[command(name = "airc", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify a profile file and seal a new version.
    Evaluate(EvaluateArgs),

    /// Sign off or override the latest version.
    Review(ReviewArgs),

    /// Print the latest sealed version.
    Current(SubjectArgs),

    /// Print every sealed version, oldest first.
    History(SubjectArgs),

    /// Print the transparency gap report of a version.
    Gaps(VersionArgs),

    /// Re-derive the digest chain of a subject.
    Verify(SubjectArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Evaluate(args) => run_evaluate(args),
        Commands::Review(args) => run_review(args),
        Commands::Current(args) => run_current(args),
        Commands::History(args) => run_history(args),
        Commands::Gaps(args) => run_gaps(args),
        Commands::Verify(args) => run_verify(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn cli_parse_evaluate() {
        let cli = Cli::try_parse_from([
            "airc",
            "evaluate",
            "--ledger",
            "ledger",
            "--profile",
            "p.yaml",
            "--incident",
            "INC-1",
            "--incident",
            "INC-2",
        ])
        .unwrap();
        let Commands::Evaluate(args) = cli.command else {
            panic!("expected evaluate");
        };
        assert_eq!(args.ledger.ledger, PathBuf::from("ledger"));
        assert!(args.ledger.reviewers.is_none());
        assert_eq!(args.profile, PathBuf::from("p.yaml"));
        assert_eq!(args.incident, vec!["INC-1", "INC-2"]);
    }

    #[test]
    fn cli_parse_review() {
        let cli = Cli::try_parse_from([
            "airc",
            "review",
            "--ledger",
            "ledger",
            "--reviewers",
            "reviewers.json",
            "--subject",
            "5b0c4bb4-2c43-4c56-9f1c-1f0c2b1f7a10",
            "--version",
            "3",
            "--final",
            "LIMITED_RISK",
            "--reviewer",
            "legal@example.org",
        ])
        .unwrap();
        let Commands::Review(args) = cli.command else {
            panic!("expected review");
        };
        assert_eq!(args.version, 3);
        assert_eq!(args.final_classification, "LIMITED_RISK");
        assert_eq!(args.rationale, "");
        assert_eq!(
            args.ledger.reviewers,
            Some(PathBuf::from("reviewers.json"))
        );
    }

    #[test]
    fn cli_parse_gaps_and_verbosity() {
        let cli = Cli::try_parse_from([
            "airc", "-vv", "gaps", "--ledger", "l", "--subject", "s", "--version", "2",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Gaps(args) = cli.command else {
            panic!("expected gaps");
        };
        assert_eq!(args.version, 2);
        assert_eq!(args.subject.subject, "s");
    }

    #[test]
    fn cli_requires_ledger() {
        assert!(Cli::try_parse_from(["airc", "current", "--subject", "s"]).is_err());
        assert!(Cli::try_parse_from(["airc", "history", "--ledger", "l"]).is_err());
    }
}
