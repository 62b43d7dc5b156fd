//! Pipeline domain model

use crate::core::{
    config::{DirectoryLayout, EnvironmentConfig, FailurePolicy, FlushConfig, PipelineConfig, SummaryConfig},
    context::PipelineContext,
    state::{ExecutionStatus, PipelineState, StepState},
    step::{CommandSpec, Step, StepAction, StepKind},
};
use std::path::PathBuf;

/// A configured run of the benchmark pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Pipeline name
    pub name: String,

    /// Directory layout, fixed for the run
    pub directories: DirectoryLayout,

    /// Model names forwarded to the analysis step
    pub models: Vec<String>,

    /// Steps in execution order
    pub steps: Vec<Step>,

    pub flush: FlushConfig,

    pub environment: EnvironmentConfig,

    pub summary: SummaryConfig,

    /// Execution state
    pub state: PipelineState,
}

impl Pipeline {
    /// Create a pipeline from configuration
    pub fn from_config(config: &PipelineConfig) -> Self {
        let setup_check = CommandSpec::new("python", &["src/setup_check.py"])
            .with_overrides(&config.steps.setup_check);
        let download_data = CommandSpec::new("python", &["src/download_data.py"])
            .with_overrides(&config.steps.download_data);
        let analysis = CommandSpec::new(
            "python",
            &[
                "-m",
                "src.run_complete_analysis",
                "--raw_results_dir",
                "{{ raw_results_dir }}",
                "--organized_results_dir",
                "{{ organized_results_dir }}",
                "--analysis_dir",
                "{{ analysis_dir }}",
                "--models",
                "{{ models }}",
            ],
        )
        .with_overrides(&config.steps.analysis);

        let steps = vec![
            Step::new(
                StepKind::SetupCheck,
                StepAction::Process(setup_check),
                FailurePolicy::Abort,
            ),
            Step::new(
                StepKind::DownloadData,
                StepAction::Process(download_data),
                FailurePolicy::Abort,
            ),
            Step::new(
                StepKind::VerifyData,
                StepAction::VerifyFiles {
                    dir: config.directories.raw_data_dir.clone(),
                    files: config.data_files.clone(),
                },
                FailurePolicy::Warn,
            ),
            Step::new(
                StepKind::Analysis,
                StepAction::Process(analysis),
                config.analysis_failure,
            ),
        ];

        Pipeline {
            name: config.name.clone(),
            directories: config.directories.clone(),
            models: config.models.clone(),
            steps,
            flush: config.flush.clone(),
            environment: config.environment.clone(),
            summary: config.summary.clone(),
            state: PipelineState::new(),
        }
    }

    /// Get a step by kind
    pub fn step(&self, kind: StepKind) -> Option<&Step> {
        self.steps.iter().find(|s| s.kind == kind)
    }

    /// Variables for rendering argument templates
    pub fn context(&self) -> PipelineContext {
        PipelineContext::for_run(&self.name, &self.directories, &self.models)
    }

    /// Expected data files, resolved against the raw data directory
    pub fn data_file_paths(&self) -> Vec<PathBuf> {
        self.steps
            .iter()
            .find_map(|s| match &s.action {
                StepAction::VerifyFiles { dir, files } => {
                    Some(files.iter().map(|f| dir.join(f)).collect())
                }
                StepAction::Process(_) => None,
            })
            .unwrap_or_default()
    }

    /// Mark every step that has not run as skipped
    pub fn skip_remaining(&mut self, reason: &str) {
        for step in self.steps.iter_mut() {
            if matches!(step.state, StepState::Pending) {
                step.state = StepState::Skipped {
                    reason: reason.to_string(),
                };
            }
        }
    }

    /// Check if every step reached a terminal state
    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.state.is_terminal())
    }

    /// Check if pipeline has failed
    pub fn has_failed(&self) -> bool {
        self.state.status == ExecutionStatus::Failed
    }

    /// IDs of steps that actually ran, in order
    pub fn executed_steps(&self) -> Vec<&'static str> {
        self.steps
            .iter()
            .filter(|s| s.state.was_executed())
            .map(|s| s.id())
            .collect()
    }
}
