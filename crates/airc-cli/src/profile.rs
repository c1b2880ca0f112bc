//! # Profile Files
//!
//! A profile file is one subject's answers in JSON or YAML, picked by
//! extension (`.yaml`/`.yml`, anything else is JSON):
//!
//! ```yaml
//! subject_id: 5b0c4bb4-2c43-4c56-9f1c-1f0c2b1f7a10
//! profile_version: 2
//! answers:
//!   definition.infers_outputs: { kind: tri_state, value: "yes" }
//!   transparency.interacts_with_persons: { kind: yes_no_unknown, value: "yes" }
//! ```
//!
//! `profile_version` defaults to 1. Answers are checked against the
//! question catalogue on load.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use airc_classify::questions;
use airc_core::{AnswerMap, EngineError, Profile, SubjectId};
use airc_engine::ProfileSource;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProfileFile {
    subject_id: SubjectId,
    #[serde(default = "first_revision")]
    profile_version: u64,
    answers: AnswerMap,
}

fn first_revision() -> u64 {
    1
}

/// Load and validate a profile file.
pub fn load_profile(path: &Path) -> Result<Profile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read profile: {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let file: ProfileFile = if is_yaml {
        serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse YAML profile: {}", path.display()))?
    } else {
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse JSON profile: {}", path.display()))?
    };
    anyhow::ensure!(
        file.profile_version >= 1,
        "profile_version must be at least 1 in {}",
        path.display()
    );
    questions::validate_answers(&file.answers)
        .with_context(|| format!("invalid answers in {}", path.display()))?;
    Ok(Profile {
        subject_id: file.subject_id,
        profile_version: file.profile_version,
        answers: file.answers,
    })
}

/// Serves the single profile read from disk.
#[derive(Debug)]
pub struct FileProfileSource {
    profile: Profile,
}

impl FileProfileSource {
    pub fn new(profile: Profile) -> Self {
        Self { profile }
    }
}

impl ProfileSource for FileProfileSource {
    fn get_profile(&self, subject: SubjectId) -> Result<Profile, EngineError> {
        if subject == self.profile.subject_id {
            Ok(self.profile.clone())
        } else {
            Err(EngineError::NotFound(format!(
                "no profile loaded for subject {subject}"
            )))
        }
    }
}

/// Source for commands that never evaluate.
#[derive(Debug, Default)]
pub struct NoProfiles;

impl ProfileSource for NoProfiles {
    fn get_profile(&self, subject: SubjectId) -> Result<Profile, EngineError> {
        Err(EngineError::NotFound(format!(
            "no profile loaded for subject {subject}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airc_core::{Answer, TriState};

    #[test]
    fn yaml_and_json_profiles_load() {
        let dir = tempfile::tempdir().unwrap();
        let s = SubjectId::new();

        let yaml = dir.path().join("p.yaml");
        std::fs::write(
            &yaml,
            format!(
                "subject_id: {s}\nanswers:\n  definition.infers_outputs: {{ kind: tri_state, value: \"no\" }}\n"
            ),
        )
        .unwrap();
        let p = load_profile(&yaml).unwrap();
        assert_eq!(p.subject_id, s);
        assert_eq!(p.profile_version, 1);
        assert_eq!(
            p.answer("definition.infers_outputs"),
            Some(&Answer::TriState(TriState::No))
        );

        let json = dir.path().join("p.json");
        std::fs::write(
            &json,
            serde_json::json!({
                "subject_id": s,
                "profile_version": 4,
                "answers": {"definition.infers_outputs": {"kind": "tri_state", "value": "yes"}}
            })
            .to_string(),
        )
        .unwrap();
        assert_eq!(load_profile(&json).unwrap().profile_version, 4);
    }

    #[test]
    fn unknown_question_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        std::fs::write(
            &path,
            serde_json::json!({
                "subject_id": SubjectId::new(),
                "answers": {"definition.vibes": {"kind": "text", "value": "good"}}
            })
            .to_string(),
        )
        .unwrap();
        let err = load_profile(&path).unwrap_err();
        assert!(format!("{err:#}").contains("definition.vibes"));
    }

    #[test]
    fn source_serves_only_its_subject() {
        let s = SubjectId::new();
        let source = FileProfileSource::new(Profile::new(s, AnswerMap::new()));
        assert!(source.get_profile(s).is_ok());
        assert!(matches!(
            source.get_profile(SubjectId::new()),
            Err(EngineError::NotFound(_))
        ));
        assert!(NoProfiles.get_profile(s).is_err());
    }
}
