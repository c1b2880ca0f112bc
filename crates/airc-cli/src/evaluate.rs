//! # Evaluate Subcommand
//!
//! Classifies a profile file and seals the next version for its subject.
//! When the subject already has versions, a newer `profile_version` in the
//! file and any `--incident` references are registered as reassessment
//! triggers first, so the sealed version records why it exists. A file
//! older than the latest sealed revision is refused.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use airc_core::EngineError;
use airc_ledger::ClassificationVersion;
use airc_state::TriggerReason;

use crate::profile::{load_profile, FileProfileSource};
use crate::{open_engine, print_json, LedgerArgs};

/// Arguments for `airc evaluate`.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub ledger: LedgerArgs,

    /// Profile file (JSON, or YAML with a `.yaml`/`.yml` extension).
    #[arg(long)]
    pub profile: PathBuf,

    /// Critical incident reference to record as a trigger. Repeatable.
    #[arg(long)]
    pub incident: Vec<String>,
}

/// Execute `airc evaluate`.
pub fn run_evaluate(args: &EvaluateArgs) -> Result<u8> {
    let version = evaluate(args)?;
    print_json(&version)?;
    Ok(0)
}

/// Evaluate and return the sealed version.
pub fn evaluate(args: &EvaluateArgs) -> Result<ClassificationVersion> {
    let profile = load_profile(&args.profile)?;
    let subject = profile.subject_id;
    let profile_version = profile.profile_version;
    let engine = open_engine(&args.ledger, Arc::new(FileProfileSource::new(profile)))?;

    let mut reasons = Vec::new();
    match engine.get_current(subject) {
        Ok(latest) => {
            let sealed = latest.record().profile_version;
            anyhow::ensure!(
                profile_version >= sealed,
                "profile_version {profile_version} in {} is older than revision {sealed} \
                 already sealed for subject {subject}",
                args.profile.display()
            );
            if sealed < profile_version {
                reasons.push(TriggerReason::ProfileChanged { profile_version });
            }
            reasons.extend(
                args.incident
                    .iter()
                    .map(|incident| TriggerReason::CriticalIncident {
                        incident: incident.clone(),
                    }),
            );
        }
        Err(EngineError::NotFound(_)) => {
            if !args.incident.is_empty() {
                tracing::warn!(subject_id = %subject, "no sealed version yet, incidents ignored");
            }
        }
        Err(e) => return Err(e).context("failed to read current version"),
    }
    for reason in reasons {
        engine
            .trigger_reassessment(subject, reason)
            .context("failed to register trigger")?;
    }

    engine
        .evaluate(subject)
        .with_context(|| format!("evaluation of subject {subject} failed"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use airc_core::Classification;
    use airc_ledger::VersionOrigin;
    use serde_json::json;

    fn write_profile(
        dir: &std::path::Path,
        subject: &str,
        profile_version: u64,
        synthetic: &str,
    ) -> PathBuf {
        let mut answers = serde_json::Map::new();
        for key in [
            airc_classify::questions::keys::DEF_INFERS_OUTPUTS,
            airc_classify::questions::keys::DEF_USES_INFERENCE,
            airc_classify::questions::keys::DEF_OPERATES_AUTONOMOUSLY,
        ]
        .into_iter()
        .chain(airc_classify::questions::keys::PROHIBITED)
        .chain(airc_classify::questions::keys::HIGH_RISK)
        {
            answers.insert(key.into(), json!({"kind": "tri_state", "value": "no"}));
        }
        for key in airc_classify::questions::keys::TRANSPARENCY {
            answers.insert(key.into(), json!({"kind": "yes_no_unknown", "value": "no"}));
        }
        answers.insert(
            airc_classify::questions::keys::TR_SYNTHETIC.into(),
            json!({"kind": "yes_no_unknown", "value": synthetic}),
        );
        let path = dir.join(format!("profile-{profile_version}.json"));
        std::fs::write(
            &path,
            json!({"subject_id": subject, "profile_version": profile_version, "answers": answers})
                .to_string(),
        )
        .unwrap();
        path
    }

    #[test]
    fn evaluate_then_reassess_on_newer_profile() {
        let dir = tempfile::tempdir().unwrap();
        let subject = airc_core::SubjectId::new().to_string();
        let ledger = LedgerArgs {
            ledger: dir.path().join("ledger"),
            reviewers: None,
        };

        let v1 = evaluate(&EvaluateArgs {
            ledger: ledger.clone(),
            profile: write_profile(dir.path(), &subject, 1, "no"),
            incident: vec!["INC-1".into()],
        })
        .unwrap();
        assert_eq!(v1.number().get(), 1);
        assert_eq!(v1.final_classification(), Classification::MinimalRisk);
        assert_eq!(v1.origin(), &VersionOrigin::Initial);

        let v2 = evaluate(&EvaluateArgs {
            ledger: ledger.clone(),
            profile: write_profile(dir.path(), &subject, 2, "yes"),
            incident: vec![],
        })
        .unwrap();
        assert_eq!(v2.number().get(), 2);
        assert_eq!(v2.final_classification(), Classification::LimitedRisk);
        assert_eq!(
            v2.origin(),
            &VersionOrigin::Reassessment {
                reasons: vec![TriggerReason::ProfileChanged { profile_version: 2 }],
            }
        );

        let v3 = evaluate(&EvaluateArgs {
            ledger,
            profile: write_profile(dir.path(), &subject, 2, "yes"),
            incident: vec![],
        })
        .unwrap();
        assert_eq!(v3.origin(), &VersionOrigin::Rerun);
        assert_eq!(v3.record().previous_digest.as_ref(), Some(v2.digest()));
    }

    #[test]
    fn older_profile_revision_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let subject = airc_core::SubjectId::new().to_string();
        let ledger = LedgerArgs {
            ledger: dir.path().join("ledger"),
            reviewers: None,
        };

        evaluate(&EvaluateArgs {
            ledger: ledger.clone(),
            profile: write_profile(dir.path(), &subject, 3, "no"),
            incident: vec![],
        })
        .unwrap();

        let err = evaluate(&EvaluateArgs {
            ledger: ledger.clone(),
            profile: write_profile(dir.path(), &subject, 2, "yes"),
            incident: vec![],
        })
        .unwrap_err();
        assert!(err.to_string().contains("older than revision 3"));

        let subject_id = airc_core::SubjectId::parse(&subject).unwrap();
        let engine = open_engine(
            &ledger,
            Arc::new(FileProfileSource::new(
                load_profile(&write_profile(dir.path(), &subject, 3, "no")).unwrap(),
            )),
        )
        .unwrap();
        assert_eq!(engine.get_history(subject_id).unwrap().len(), 1);
    }
}
