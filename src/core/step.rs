//! Step domain model

use crate::core::{
    config::{CommandConfig, FailurePolicy},
    context::PipelineContext,
    state::StepState,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
});

/// Variables an argument template may reference
pub const KNOWN_VARIABLES: [&str; 6] = [
    "raw_results_dir",
    "organized_results_dir",
    "analysis_dir",
    "raw_data_dir",
    "pipeline_name",
    "models",
];

/// Names of all `{{ name }}` placeholders in a template argument
pub fn template_placeholders(arg: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(arg)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Whether a placeholder name is one the run context provides
pub fn is_known_variable(name: &str) -> bool {
    KNOWN_VARIABLES.contains(&name)
}

/// The four fixed steps of the benchmark pipeline, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    SetupCheck,
    DownloadData,
    VerifyData,
    Analysis,
}

impl StepKind {
    pub const ALL: [StepKind; 4] = [
        StepKind::SetupCheck,
        StepKind::DownloadData,
        StepKind::VerifyData,
        StepKind::Analysis,
    ];

    /// Stable identifier used in events, history and config keys
    pub fn id(&self) -> &'static str {
        match self {
            StepKind::SetupCheck => "setup_check",
            StepKind::DownloadData => "download_data",
            StepKind::VerifyData => "verify_data",
            StepKind::Analysis => "analysis",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            StepKind::SetupCheck => "Checking setup",
            StepKind::DownloadData => "Downloading data",
            StepKind::VerifyData => "Verifying data files",
            StepKind::Analysis => "Running complete analysis",
        }
    }

    /// Fixed message shown when the step fails
    pub fn failure_message(&self) -> &'static str {
        match self {
            StepKind::SetupCheck => "Setup check failed",
            StepKind::DownloadData => "Data download failed",
            StepKind::VerifyData => "Some data files are missing",
            StepKind::Analysis => "Analysis run failed",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// An external program invocation with an argument template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub timeout_secs: Option<u64>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            timeout_secs: None,
        }
    }

    /// Apply YAML overrides on top of a built-in command
    pub fn with_overrides(mut self, overrides: &CommandConfig) -> Self {
        if let Some(program) = &overrides.program {
            self.program = program.clone();
        }
        if let Some(args) = &overrides.args {
            self.args = args.clone();
        }
        if overrides.timeout_secs.is_some() {
            self.timeout_secs = overrides.timeout_secs;
        }
        self
    }

    /// Render the argument template against the run context
    ///
    /// An argument that consists only of a list placeholder (`{{ models }}`)
    /// expands to one argument per item, preserving order. Lists embedded in a
    /// larger argument are joined with commas.
    pub fn render_args(&self, context: &PipelineContext) -> Vec<String> {
        let mut rendered = Vec::with_capacity(self.args.len());

        for arg in &self.args {
            if let Some(items) = whole_list_placeholder(arg, context) {
                rendered.extend(items.iter().cloned());
                continue;
            }

            let value = PLACEHOLDER.replace_all(arg, |caps: &regex::Captures| {
                let name = &caps[1];
                if let Some(value) = context.get_variable(name) {
                    value.clone()
                } else if let Some(items) = context.get_list(name) {
                    items.join(",")
                } else {
                    // Unknown names are rejected by PipelineConfig::validate
                    caps[0].to_string()
                }
            });
            rendered.push(value.into_owned());
        }

        rendered
    }
}

fn whole_list_placeholder<'a>(arg: &str, context: &'a PipelineContext) -> Option<&'a Vec<String>> {
    let caps = PLACEHOLDER.captures(arg.trim())?;
    let whole = caps.get(0)?;
    if whole.start() != 0 || whole.end() != arg.trim().len() {
        return None;
    }
    context.get_list(&caps[1])
}

/// What a step does when it runs
#[derive(Debug, Clone)]
pub enum StepAction {
    /// Run an external program and inspect its exit status
    Process(CommandSpec),
    /// Check that files exist under a directory
    VerifyFiles { dir: PathBuf, files: Vec<String> },
}

/// A single step in a pipeline
#[derive(Debug, Clone)]
pub struct Step {
    pub kind: StepKind,

    pub action: StepAction,

    /// Whether a failure aborts the run or only warns
    pub on_failure: FailurePolicy,

    /// Runtime state
    pub state: StepState,
}

impl Step {
    pub fn new(kind: StepKind, action: StepAction, on_failure: FailurePolicy) -> Self {
        Self {
            kind,
            action,
            on_failure,
            state: StepState::Pending,
        }
    }

    pub fn id(&self) -> &'static str {
        self.kind.id()
    }

    pub fn label(&self) -> &'static str {
        self.kind.label()
    }

    /// Failure of this step ends the run
    pub fn is_fatal(&self) -> bool {
        self.on_failure == FailurePolicy::Abort
    }

    /// The external command, if this is a process step
    pub fn command(&self) -> Option<&CommandSpec> {
        match &self.action {
            StepAction::Process(command) => Some(command),
            StepAction::VerifyFiles { .. } => None,
        }
    }
}
