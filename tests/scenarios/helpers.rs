//! Test utilities for pipeline scenarios

use analysis_pipeline::core::config::PipelineConfig;
use analysis_pipeline::core::{ExecutionStatus, Pipeline, StepKind, StepState};
use analysis_pipeline::execution::{ExecutionEngine, ExecutionEvent, PipelineError, RunReport};
use analysis_pipeline::runner::{
    ChildEnvironment, Invocation, ProcessOutcome, RunnerError, StepRunner,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// One call the pipeline made to the runner
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub step_id: String,
    pub program: String,
    pub args: Vec<String>,
    pub env: ChildEnvironment,
}

/// Runner that records invocations and plays back scripted behavior
///
/// Every step exits 0 unless given another code. A step can also write
/// files, standing in for the outputs of the real programs.
#[derive(Default)]
pub struct MockRunner {
    exit_codes: HashMap<String, i32>,
    errors: HashMap<String, String>,
    writes: HashMap<String, Vec<(PathBuf, Vec<u8>)>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `step` exit with `code`
    pub fn exit_with(mut self, step: StepKind, code: i32) -> Self {
        self.exit_codes.insert(step.id().to_string(), code);
        self
    }

    /// Make `step` fail before it could run (spawn error)
    pub fn fail_to_spawn(mut self, step: StepKind, message: &str) -> Self {
        self.errors.insert(step.id().to_string(), message.to_string());
        self
    }

    /// Write `contents` to `path` when `step` runs
    pub fn writes(mut self, step: StepKind, path: impl Into<PathBuf>, contents: &str) -> Self {
        self.writes
            .entry(step.id().to_string())
            .or_default()
            .push((path.into(), contents.as_bytes().to_vec()));
        self
    }

    /// Shared handle to the recorded calls
    pub fn calls(&self) -> Arc<Mutex<Vec<RecordedCall>>> {
        self.calls.clone()
    }
}

#[async_trait]
impl StepRunner for MockRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutcome, RunnerError> {
        self.calls.lock().unwrap().push(RecordedCall {
            step_id: invocation.step_id.clone(),
            program: invocation.program.clone(),
            args: invocation.args.clone(),
            env: invocation.env.clone(),
        });

        if let Some(message) = self.errors.get(&invocation.step_id) {
            return Err(RunnerError::Spawn {
                program: invocation.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, message.clone()),
            });
        }

        for (path, contents) in self.writes.get(&invocation.step_id).into_iter().flatten() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(path, contents).unwrap();
        }

        let code = self.exit_codes.get(&invocation.step_id).copied().unwrap_or(0);
        Ok(ProcessOutcome::from_code(code))
    }
}

/// A config whose directories all live under a fresh temp dir
pub struct Workspace {
    pub dir: TempDir,
    pub config: PipelineConfig,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PipelineConfig::default();
        config.directories.raw_results_dir = dir.path().join("results/raw");
        config.directories.organized_results_dir = dir.path().join("results/organized");
        config.directories.analysis_dir = dir.path().join("results/analysis");
        config.directories.raw_data_dir = dir.path().join("data/raw");
        config.flush.timeout_secs = 0;
        Self { dir, config }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.directories.raw_data_dir
    }

    pub fn analysis_dir(&self) -> &Path {
        &self.config.directories.analysis_dir
    }

    /// Put every expected data file in place
    pub fn seed_data_files(&self) {
        std::fs::create_dir_all(self.data_dir()).unwrap();
        for file in &self.config.data_files {
            std::fs::write(self.data_dir().join(file), "{}").unwrap();
        }
    }

    /// Runner that writes the data files during the download step
    pub fn downloading_runner(&self) -> MockRunner {
        self.config
            .data_files
            .iter()
            .fold(MockRunner::new(), |runner, file| {
                runner.writes(StepKind::DownloadData, self.data_dir().join(file), "{}")
            })
    }
}

/// Result of running a pipeline against a mock runner
pub struct PipelineTestResult {
    pub pipeline: Pipeline,
    pub result: Result<RunReport, PipelineError>,
    pub calls: Vec<RecordedCall>,
    pub events: Vec<ExecutionEvent>,
}

impl PipelineTestResult {
    pub fn is_success(&self) -> bool {
        self.result.is_ok() && self.pipeline.state.status == ExecutionStatus::Completed
    }

    /// Exit code the driver would report
    pub fn exit_code(&self) -> i32 {
        match &self.result {
            Ok(report) => report.exit_code(),
            Err(_) => 1,
        }
    }

    pub fn invoked_steps(&self) -> Vec<String> {
        self.calls.iter().map(|c| c.step_id.clone()).collect()
    }

    pub fn call(&self, step: StepKind) -> Option<&RecordedCall> {
        self.calls.iter().find(|c| c.step_id == step.id())
    }

    pub fn step_state(&self, step: StepKind) -> &StepState {
        &self.pipeline.step(step).unwrap().state
    }

    pub fn warnings(&self) -> &[String] {
        &self.pipeline.state.warnings
    }

    pub fn has_warning(&self, needle: &str) -> bool {
        self.warnings().iter().any(|w| w.contains(needle))
    }
}

/// Run the configured pipeline with `runner`
pub async fn run_with(config: &PipelineConfig, runner: MockRunner) -> PipelineTestResult {
    run_with_env(config, runner, ChildEnvironment::default()).await
}

pub async fn run_with_env(
    config: &PipelineConfig,
    runner: MockRunner,
    env: ChildEnvironment,
) -> PipelineTestResult {
    config.validate().unwrap();
    let mut pipeline = config.to_pipeline();
    let calls = runner.calls();

    let engine = ExecutionEngine::new(runner, env);
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    engine
        .add_event_handler(move |event| sink.lock().unwrap().push(event))
        .await;

    let result = engine.execute(&mut pipeline).await;

    let calls = calls.lock().unwrap().clone();
    let events = events.lock().unwrap().clone();
    PipelineTestResult {
        pipeline,
        result,
        calls,
        events,
    }
}

/// A search path made of `dirs`
pub fn search_path(dirs: &[&str]) -> OsString {
    std::env::join_paths(dirs).unwrap()
}

pub fn assert_skipped(result: &PipelineTestResult, step: StepKind) {
    assert!(
        matches!(result.step_state(step), StepState::Skipped { .. }),
        "expected {} to be skipped, got {:?}",
        step,
        result.step_state(step)
    );
}
