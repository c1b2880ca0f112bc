//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor. Holds the engine and the in-process profile store
//! that backs it. Engine operations are synchronous and may touch the file
//! ledger, so handlers run them through [`AppState::blocking`].

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use airc_engine::{
    Authorizer, ClassificationEngine, ConfigError, Dispatcher, EngineConfig,
    InMemoryProfileStore, StaticAuthorizer, TracingSink,
};
use airc_ledger::{FileLedger, InMemoryLedger, LedgerStore};

use crate::error::AppError;

/// Server configuration.
///
/// Custom `Debug` redacts the `auth_token`.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer token. If `None`, authentication is disabled.
    pub auth_token: Option<String>,
    /// Ledger directory. If `None`, versions are kept in memory only.
    pub ledger_dir: Option<PathBuf>,
    /// JSON grant table of reviewer capabilities. If `None`, every review
    /// is denied.
    pub reviewers_file: Option<PathBuf>,
    /// Serve `/metrics` and record request metrics.
    pub metrics_enabled: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("ledger_dir", &self.ledger_dir)
            .field("reviewers_file", &self.reviewers_file)
            .field("metrics_enabled", &self.metrics_enabled)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            ledger_dir: None,
            reviewers_file: None,
            metrics_enabled: true,
        }
    }
}

impl AppConfig {
    /// Load from `PORT`, `AUTH_TOKEN`, `AIRC_LEDGER_DIR`,
    /// `AIRC_REVIEWERS_FILE` and `AIRC_METRICS_ENABLED` (on unless `false`).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            None => 8080,
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| {
                    ConfigError::Invalid("PORT".into(), e.to_string())
                })?,
        };
        let non_empty = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        Ok(Self {
            port,
            auth_token: non_empty("AUTH_TOKEN"),
            ledger_dir: non_empty("AIRC_LEDGER_DIR").map(PathBuf::from),
            reviewers_file: non_empty("AIRC_REVIEWERS_FILE").map(PathBuf::from),
            metrics_enabled: lookup("AIRC_METRICS_ENABLED")
                .map(|v| !v.trim().eq_ignore_ascii_case("false"))
                .unwrap_or(true),
        })
    }
}

/// Failure assembling the application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("cannot read reviewers file {path}: {source}")]
    ReviewersRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid reviewers file {path}: {source}")]
    ReviewersParse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: Arc<ClassificationEngine>,
    pub profiles: Arc<InMemoryProfileStore>,
    pub config: AppConfig,
}

impl AppState {
    /// In-memory ledger, no reviewers, default configuration.
    pub fn new() -> Self {
        Self::with_parts(
            AppConfig::default(),
            EngineConfig::default(),
            Arc::new(InMemoryLedger::new()),
            Arc::new(StaticAuthorizer::new()),
        )
    }

    /// Assemble from explicit collaborators.
    pub fn with_parts(
        config: AppConfig,
        engine_config: EngineConfig,
        ledger: Arc<dyn LedgerStore>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        let profiles = Arc::new(InMemoryProfileStore::new());
        let engine = ClassificationEngine::new(engine_config, profiles.clone(), authorizer, ledger)
            .with_dispatcher(Dispatcher::new().with_sink(Arc::new(TracingSink)));
        Self {
            engine: Arc::new(engine),
            profiles,
            config,
        }
    }

    /// Assemble from configuration: file ledger if a directory is set,
    /// grant table if a reviewers file is set.
    pub fn from_config(config: AppConfig, engine_config: EngineConfig) -> Result<Self, StateError> {
        let ledger: Arc<dyn LedgerStore> = match &config.ledger_dir {
            Some(dir) => {
                tracing::info!(ledger_dir = %dir.display(), "using file ledger");
                Arc::new(FileLedger::new(dir.clone()))
            }
            None => {
                tracing::warn!("AIRC_LEDGER_DIR not set, ledger is in-memory only");
                Arc::new(InMemoryLedger::new())
            }
        };
        let authorizer = match &config.reviewers_file {
            Some(path) => load_reviewers(path)?,
            None => {
                tracing::warn!("AIRC_REVIEWERS_FILE not set, all reviews will be denied");
                StaticAuthorizer::new()
            }
        };
        Ok(Self::with_parts(
            config,
            engine_config,
            ledger,
            Arc::new(authorizer),
        ))
    }
}

impl AppState {
    /// Run `f` against this state on the blocking thread pool.
    pub async fn blocking<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&AppState) -> Result<T, AppError> + Send + 'static,
        T: Send + 'static,
    {
        let state = self.clone();
        tokio::task::spawn_blocking(move || f(&state)).await?
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a reviewer grant table.
pub fn load_reviewers(path: &std::path::Path) -> Result<StaticAuthorizer, StateError> {
    let raw = std::fs::read_to_string(path).map_err(|source| StateError::ReviewersRead {
        path: path.to_path_buf(),
        source,
    })?;
    StaticAuthorizer::from_json(&raw).map_err(|source| StateError::ReviewersParse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn config_defaults_and_overrides() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.port, 8080);
        assert!(cfg.auth_token.is_none());
        assert!(cfg.metrics_enabled);

        let cfg = AppConfig::from_lookup(lookup(&[
            ("PORT", "9090"),
            ("AUTH_TOKEN", "t0ken"),
            ("AIRC_LEDGER_DIR", "/var/lib/airc"),
            ("AIRC_REVIEWERS_FILE", ""),
            ("AIRC_METRICS_ENABLED", "FALSE"),
        ]))
        .unwrap();
        assert_eq!(cfg.port, 9090);
        assert_eq!(cfg.auth_token.as_deref(), Some("t0ken"));
        assert_eq!(cfg.ledger_dir, Some(PathBuf::from("/var/lib/airc")));
        assert!(cfg.reviewers_file.is_none());
        assert!(!cfg.metrics_enabled);
    }

    #[test]
    fn bad_port_is_rejected() {
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("PORT", "eighty")])),
            Err(ConfigError::Invalid(var, _)) if var == "PORT"
        ));
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = AppConfig {
            auth_token: Some("t0ken".into()),
            ..AppConfig::default()
        };
        assert!(!format!("{cfg:?}").contains("t0ken"));
    }

    #[tokio::test]
    async fn blocking_runs_off_the_runtime_thread() {
        let state = AppState::new();
        let runtime_thread = std::thread::current().id();
        let (thread, versions) = state
            .blocking(|s| {
                let subject = airc_core::SubjectId::new();
                let versions = match s.engine.get_history(subject) {
                    Ok(v) => v.len(),
                    Err(_) => 0,
                };
                Ok((std::thread::current().id(), versions))
            })
            .await
            .unwrap();
        assert_ne!(thread, runtime_thread);
        assert_eq!(versions, 0);
    }

    #[tokio::test]
    async fn blocking_panic_becomes_app_error() {
        let state = AppState::new();
        let result: Result<(), AppError> = state
            .blocking(|_| panic!("ledger mutex poisoned"))
            .await;
        assert!(matches!(result, Err(AppError::Join(_))));
    }

    #[test]
    fn reviewers_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            load_reviewers(&missing),
            Err(StateError::ReviewersRead { .. })
        ));
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "not json").unwrap();
        assert!(matches!(
            load_reviewers(&bad),
            Err(StateError::ReviewersParse { .. })
        ));
    }
}
