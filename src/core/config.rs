//! Pipeline configuration from YAML

use crate::core::{step, Pipeline};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Models compared by the analysis step, in forwarding order
pub const DEFAULT_MODELS: [&str; 4] = ["Llama2", "MPT", "Phi-2", "Falcon"];

/// Files the download step is expected to leave in the raw data directory
pub const DEFAULT_DATA_FILES: [&str; 3] = ["corpus.json", "nq_train.json", "nq_test.json"];

/// Top-level pipeline configuration loaded from YAML
///
/// Every section is optional. A missing section takes the built-in defaults,
/// so `PipelineConfig::default()` describes the stock benchmark pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pipeline name (used in history)
    pub name: String,

    /// Directory layout shared by all steps
    pub directories: DirectoryLayout,

    /// Model names forwarded to the analysis step
    pub models: Vec<String>,

    /// Data files the verification step checks under `raw_data_dir`
    pub data_files: Vec<String>,

    /// Commands for the external steps
    pub steps: StepCommands,

    /// What a non-zero exit from the analysis step means
    pub analysis_failure: FailurePolicy,

    /// Wait for the download step's files
    pub flush: FlushConfig,

    /// Child process environment
    pub environment: EnvironmentConfig,

    /// Artifact summary options
    pub summary: SummaryConfig,
}

/// The four fixed directories of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryLayout {
    pub raw_results_dir: PathBuf,
    pub organized_results_dir: PathBuf,
    pub analysis_dir: PathBuf,
    pub raw_data_dir: PathBuf,
}

impl Default for DirectoryLayout {
    fn default() -> Self {
        Self {
            raw_results_dir: PathBuf::from("results/raw"),
            organized_results_dir: PathBuf::from("results/organized"),
            analysis_dir: PathBuf::from("results/analysis"),
            raw_data_dir: PathBuf::from("data/raw"),
        }
    }
}

impl DirectoryLayout {
    /// Directories the analysis step writes into
    pub fn results_dirs(&self) -> [&Path; 3] {
        [
            &self.raw_results_dir,
            &self.organized_results_dir,
            &self.analysis_dir,
        ]
    }

    /// Named entries, in a stable order
    pub fn entries(&self) -> [(&'static str, &Path); 4] {
        [
            ("raw_results_dir", &self.raw_results_dir),
            ("organized_results_dir", &self.organized_results_dir),
            ("analysis_dir", &self.analysis_dir),
            ("raw_data_dir", &self.raw_data_dir),
        ]
    }
}

/// Command overrides for the three external steps
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StepCommands {
    pub setup_check: CommandConfig,
    pub download_data: CommandConfig,
    pub analysis: CommandConfig,
}

/// External command as written in YAML
///
/// Unset fields fall back to the step's built-in command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Program to execute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,

    /// Argument template (`{{ name }}` placeholders allowed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,

    /// Kill the process after this many seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// How a step failure affects the rest of the run
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Abort the pipeline with a non-zero exit
    Abort,
    /// Log a warning and keep going
    #[default]
    Warn,
}

/// Polling parameters for the post-download wait
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlushConfig {
    /// Upper bound on the wait; 0 disables it
    pub timeout_secs: u64,

    /// Delay between two polls
    pub poll_interval_ms: u64,
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            poll_interval_ms: 250,
        }
    }
}

/// Environment handed to child processes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Search-path variable extended with the working directory
    pub path_var: String,

    /// Load `.env` from the working directory before running steps
    pub load_dotenv: bool,

    /// Extra variables set on every child
    pub extra: BTreeMap<String, String>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            path_var: "PYTHONPATH".to_string(),
            load_dotenv: true,
            extra: BTreeMap::new(),
        }
    }
}

/// Artifact summary options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Also list artifacts in subdirectories of the analysis directory
    pub recursive: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "llm-benchmark-analysis".to_string(),
            directories: DirectoryLayout::default(),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            data_files: DEFAULT_DATA_FILES.iter().map(|f| f.to_string()).collect(),
            steps: StepCommands::default(),
            analysis_failure: FailurePolicy::Warn,
            flush: FlushConfig::default(),
            environment: EnvironmentConfig::default(),
            summary: SummaryConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse pipeline configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an optional path, falling back to the built-in defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Pipeline name must not be empty");
        }

        if self.models.is_empty() {
            anyhow::bail!("At least one model must be configured");
        }
        let mut seen = HashSet::new();
        for model in &self.models {
            if model.trim().is_empty() {
                anyhow::bail!("Model names must not be empty");
            }
            if !seen.insert(model) {
                anyhow::bail!("Duplicate model name: {}", model);
            }
        }

        for (key, dir) in self.directories.entries() {
            if dir.as_os_str().is_empty() {
                anyhow::bail!("Directory '{}' must not be empty", key);
            }
        }

        for file in &self.data_files {
            if file.trim().is_empty() {
                anyhow::bail!("Data file names must not be empty");
            }
        }

        if self.flush.poll_interval_ms == 0 {
            anyhow::bail!("flush.poll_interval_ms must be greater than zero");
        }

        if self.environment.path_var.trim().is_empty() {
            anyhow::bail!("environment.path_var must not be empty");
        }

        for (step_id, command) in self.step_commands() {
            if let Some(program) = &command.program {
                if program.trim().is_empty() {
                    anyhow::bail!("Step '{}' has an empty program", step_id);
                }
            }
            if command.timeout_secs == Some(0) {
                anyhow::bail!("Step '{}' timeout_secs must be greater than zero", step_id);
            }
            for arg in command.args.iter().flatten() {
                for name in step::template_placeholders(arg) {
                    if !step::is_known_variable(&name) {
                        anyhow::bail!(
                            "Step '{}' references unknown variable '{{{{ {} }}}}'",
                            step_id,
                            name
                        );
                    }
                }
            }
        }

        Ok(())
    }

    fn step_commands(&self) -> [(&'static str, &CommandConfig); 3] {
        [
            ("setup_check", &self.steps.setup_check),
            ("download_data", &self.steps.download_data),
            ("analysis", &self.steps.analysis),
        ]
    }

    /// Convert config to a Pipeline domain model
    pub fn to_pipeline(&self) -> Pipeline {
        Pipeline::from_config(self)
    }
}
