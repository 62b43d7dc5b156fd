//! Environment handed to child processes

use crate::core::config::EnvironmentConfig;
use crate::runner::RunnerError;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Variables set on every step's process, on top of the inherited environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildEnvironment {
    vars: Vec<(OsString, OsString)>,
}

impl ChildEnvironment {
    /// Build the child environment for a run
    ///
    /// `current_search_path` is the driver's own value of `config.path_var`;
    /// `working_dir` is appended to it rather than replacing it.
    pub fn build(
        config: &EnvironmentConfig,
        working_dir: &Path,
        current_search_path: Option<OsString>,
        overrides: &[(String, String)],
    ) -> Result<Self, RunnerError> {
        let mut env = Self::default();

        let search_path = extend_search_path(current_search_path.as_deref(), working_dir)?;
        debug!(
            "{} for child processes: {}",
            config.path_var,
            search_path.to_string_lossy()
        );
        env.set(&config.path_var, search_path);

        for (key, value) in &config.extra {
            env.set(key, value);
        }
        for (key, value) in overrides {
            env.set(key, value);
        }

        Ok(env)
    }

    /// Build from the driver's own process environment
    pub fn from_process(
        config: &EnvironmentConfig,
        overrides: &[(String, String)],
    ) -> Result<Self, RunnerError> {
        let working_dir = std::env::current_dir()
            .map_err(|e| RunnerError::Environment(format!("cannot read working directory: {}", e)))?;
        Self::build(
            config,
            &working_dir,
            std::env::var_os(&config.path_var),
            overrides,
        )
    }

    /// Set or replace a variable
    pub fn set(&mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) {
        let key = key.as_ref().to_os_string();
        let value = value.as_ref().to_os_string();
        match self.vars.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.vars.push((key, value)),
        }
    }

    /// Look up a variable
    pub fn get(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.vars
            .iter()
            .find(|(k, _)| k.as_os_str() == key.as_ref())
            .map(|(_, v)| v.as_os_str())
    }

    pub fn vars(&self) -> &[(OsString, OsString)] {
        &self.vars
    }
}

/// Append `dir` to a search-path value, keeping existing entries
pub fn extend_search_path(current: Option<&OsStr>, dir: &Path) -> Result<OsString, RunnerError> {
    let mut entries: Vec<PathBuf> = current
        .map(|value| std::env::split_paths(value).filter(|p| !p.as_os_str().is_empty()).collect())
        .unwrap_or_default();

    if !entries.iter().any(|p| p == dir) {
        entries.push(dir.to_path_buf());
    }

    std::env::join_paths(entries).map_err(|e| RunnerError::Environment(e.to_string()))
}

/// Load `.env` into the driver's environment if it exists
///
/// Variables already set are left untouched. Returns whether a file was loaded.
pub fn load_dotenv(path: &Path) -> bool {
    if !path.is_file() {
        debug!("No {} file found", path.display());
        return false;
    }

    match dotenvy::from_path(path) {
        Ok(()) => {
            info!("Loaded environment from {}", path.display());
            true
        }
        Err(e) => {
            warn!("Failed to load {}: {}", path.display(), e);
            false
        }
    }
}
