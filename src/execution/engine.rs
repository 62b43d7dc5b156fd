//! Main execution engine - drives the four steps in order

use crate::{
    core::{CommandSpec, ExecutionStatus, Pipeline, PipelineContext, StepAction, StepKind, StepState},
    execution::{
        artifacts::{scan_artifacts, ArtifactReport},
        flush::{wait_for_files, FlushOutcome},
        verify::{verify_data_files, DataVerification},
        PipelineError, RunReport,
    },
    runner::{ChildEnvironment, Invocation, StepRunner},
};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Events that can occur during pipeline execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        execution_id: Uuid,
        pipeline_name: String,
        total_steps: usize,
    },
    StepStarted {
        step: StepKind,
        /// 1-based position
        position: usize,
        total_steps: usize,
        /// Rendered command line, for process steps
        command_line: Option<String>,
    },
    StepCompleted {
        step: StepKind,
    },
    StepWarning {
        step: StepKind,
        warning: String,
    },
    StepFailed {
        step: StepKind,
        error: String,
        fatal: bool,
    },
    WaitingForData {
        files: Vec<PathBuf>,
        timeout_secs: u64,
    },
    DataSettled {
        outcome: FlushOutcome,
    },
    DataVerified {
        verification: DataVerification,
    },
    ArtifactsListed {
        report: ArtifactReport,
    },
    PipelineCompleted {
        execution_id: Uuid,
        status: ExecutionStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// How a single step ended
enum StepOutcome {
    Succeeded { exit_code: Option<i32> },
    Advisory { warning: String },
    Failed { error: String, exit_code: Option<i32> },
}

/// Main pipeline execution engine
pub struct ExecutionEngine<R> {
    runner: R,
    environment: ChildEnvironment,
    event_handlers: Arc<Mutex<Vec<EventHandler>>>,
}

impl<R: StepRunner> ExecutionEngine<R> {
    pub fn new(runner: R, environment: ChildEnvironment) -> Self {
        Self {
            runner,
            environment,
            event_handlers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add an event handler
    pub async fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.lock().await.push(Arc::new(handler));
    }

    /// Emit an event to all handlers
    async fn emit_event(&self, event: ExecutionEvent) {
        let handlers = self.event_handlers.lock().await;
        for handler in handlers.iter() {
            handler(event.clone());
        }
    }

    /// Execute the entire pipeline
    ///
    /// Returns `Err` when a step with the abort policy fails; `pipeline` then
    /// holds the failed and skipped step states.
    pub async fn execute(&self, pipeline: &mut Pipeline) -> Result<RunReport, PipelineError> {
        let execution_id = pipeline.state.execution_id;
        let total_steps = pipeline.steps.len();

        info!("Starting pipeline execution: {} ({})", pipeline.name, execution_id);
        pipeline.state.start(total_steps);
        self.emit_event(ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name: pipeline.name.clone(),
            total_steps,
        })
        .await;

        let context = pipeline.context();

        for index in 0..total_steps {
            let step = pipeline.steps[index].clone();

            if step.kind == StepKind::Analysis {
                self.prepare_results_dirs(pipeline).await;
            }

            let command_line = step
                .command()
                .map(|c| render_command_line(c, &context));
            self.emit_event(ExecutionEvent::StepStarted {
                step: step.kind,
                position: index + 1,
                total_steps,
                command_line,
            })
            .await;

            let started_at = Utc::now();
            pipeline.steps[index].state = StepState::Running { started_at };

            let outcome = match &step.action {
                StepAction::Process(command) => {
                    self.run_process(step.kind, command, &context).await
                }
                StepAction::VerifyFiles { dir, files } => {
                    let verification = verify_data_files(dir, files);
                    let warning = verification.warning();
                    self.emit_event(ExecutionEvent::DataVerified { verification })
                        .await;
                    match warning {
                        Some(warning) => StepOutcome::Advisory { warning },
                        None => StepOutcome::Succeeded { exit_code: None },
                    }
                }
            };

            match outcome {
                StepOutcome::Succeeded { exit_code } => {
                    info!("Step {} completed", step.kind);
                    pipeline.steps[index].state = StepState::Completed {
                        exit_code,
                        started_at,
                        completed_at: Utc::now(),
                    };
                    pipeline.state.completed_steps += 1;
                    self.emit_event(ExecutionEvent::StepCompleted { step: step.kind })
                        .await;

                    if step.kind == StepKind::DownloadData {
                        self.wait_for_data(pipeline).await;
                    }
                }
                StepOutcome::Advisory { warning } => {
                    warn!("Step {}: {}", step.kind, warning);
                    pipeline.steps[index].state = StepState::Warned {
                        warning: warning.clone(),
                        exit_code: None,
                        started_at,
                        completed_at: Utc::now(),
                    };
                    pipeline.state.completed_steps += 1;
                    pipeline.state.warn(warning.clone());
                    self.emit_event(ExecutionEvent::StepWarning {
                        step: step.kind,
                        warning,
                    })
                    .await;
                }
                StepOutcome::Failed { error, exit_code } => {
                    pipeline.steps[index].state = StepState::Failed {
                        error: error.clone(),
                        exit_code,
                        started_at,
                        failed_at: Utc::now(),
                    };
                    pipeline.state.failed_steps += 1;
                    self.emit_event(ExecutionEvent::StepFailed {
                        step: step.kind,
                        error: error.clone(),
                        fatal: step.is_fatal(),
                    })
                    .await;

                    if step.is_fatal() {
                        error!("{}: {}", step.kind.failure_message(), error);
                        return Err(self.abort(pipeline, step.kind, error, exit_code).await);
                    }

                    warn!("{}: {} (continuing)", step.kind.failure_message(), error);
                    pipeline
                        .state
                        .warn(format!("{}: {}", step.kind.failure_message(), error));
                }
            }
        }

        let artifacts = self.list_artifacts(pipeline).await;

        pipeline.state.complete();
        info!(
            "Pipeline {} completed with {} warning(s)",
            pipeline.name,
            pipeline.state.warnings.len()
        );
        self.emit_event(ExecutionEvent::PipelineCompleted {
            execution_id,
            status: ExecutionStatus::Completed,
        })
        .await;

        Ok(RunReport::from_pipeline(pipeline, Some(artifacts)))
    }

    async fn run_process(
        &self,
        step: StepKind,
        command: &CommandSpec,
        context: &PipelineContext,
    ) -> StepOutcome {
        let invocation = Invocation {
            step_id: step.id().to_string(),
            program: command.program.clone(),
            args: command.render_args(context),
            env: self.environment.clone(),
            timeout_secs: command.timeout_secs,
        };
        debug!("Invocation for step {}: {:?}", step, invocation.args);

        match self.runner.run(&invocation).await {
            Ok(outcome) if outcome.success() => StepOutcome::Succeeded {
                exit_code: outcome.exit_code,
            },
            Ok(outcome) => StepOutcome::Failed {
                error: match outcome.exit_code {
                    Some(code) => format!("exited with code {}", code),
                    None => "terminated by signal".to_string(),
                },
                exit_code: outcome.exit_code,
            },
            Err(e) => StepOutcome::Failed {
                error: e.to_string(),
                exit_code: None,
            },
        }
    }

    /// Wait for the download step's files to become visible
    async fn wait_for_data(&self, pipeline: &Pipeline) {
        let files = pipeline.data_file_paths();
        self.emit_event(ExecutionEvent::WaitingForData {
            files: files.clone(),
            timeout_secs: pipeline.flush.timeout_secs,
        })
        .await;

        let outcome = wait_for_files(&files, &pipeline.flush).await;
        match &outcome {
            FlushOutcome::Settled { elapsed } => debug!("Data files ready after {:?}", elapsed),
            FlushOutcome::TimedOut { missing, .. } => warn!(
                "Gave up waiting for {} data file(s) after {}s",
                missing.len(),
                pipeline.flush.timeout_secs
            ),
            FlushOutcome::Disabled => debug!("Data flush wait disabled"),
        }
        self.emit_event(ExecutionEvent::DataSettled { outcome }).await;
    }

    /// Create the directories the analysis program writes into
    async fn prepare_results_dirs(&self, pipeline: &mut Pipeline) {
        let dirs: Vec<PathBuf> = pipeline
            .directories
            .results_dirs()
            .iter()
            .map(|d| d.to_path_buf())
            .collect();
        for dir in dirs {
            if let Err(e) = tokio::fs::create_dir_all(&dir).await {
                warn!("Could not create {}: {}", dir.display(), e);
                pipeline
                    .state
                    .warn(format!("Could not create {}: {}", dir.display(), e));
            }
        }
    }

    /// List what the analysis left in its output directory
    async fn list_artifacts(&self, pipeline: &mut Pipeline) -> ArtifactReport {
        let artifacts = scan_artifacts(&pipeline.directories.analysis_dir, pipeline.summary.recursive);
        if artifacts.is_empty() {
            warn!("No results were generated in {}", artifacts.dir.display());
            pipeline.state.warn("No results were generated");
        }
        self.emit_event(ExecutionEvent::ArtifactsListed {
            report: artifacts.clone(),
        })
        .await;
        artifacts
    }

    async fn abort(
        &self,
        pipeline: &mut Pipeline,
        step: StepKind,
        reason: String,
        exit_code: Option<i32>,
    ) -> PipelineError {
        pipeline.skip_remaining(step.failure_message());

        // The summary is due whenever the analysis step was reached
        let artifacts = if step == StepKind::Analysis {
            Some(self.list_artifacts(pipeline).await)
        } else {
            None
        };

        pipeline.state.fail();
        self.emit_event(ExecutionEvent::PipelineCompleted {
            execution_id: pipeline.state.execution_id,
            status: ExecutionStatus::Failed,
        })
        .await;

        PipelineError::StepAborted {
            step,
            message: step.failure_message(),
            reason,
            exit_code,
            artifacts,
        }
    }
}

/// Program and rendered arguments joined for display
pub fn render_command_line(command: &CommandSpec, context: &PipelineContext) -> String {
    std::iter::once(command.program.clone())
        .chain(command.render_args(context))
        .collect::<Vec<_>>()
        .join(" ")
}
