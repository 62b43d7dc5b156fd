//! Machine-readable result of a run

use crate::core::{
    config::DirectoryLayout, ExecutionStatus, Pipeline, StepKind, StepState,
};
use crate::execution::ArtifactReport;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Final state of one step
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: StepKind,
    pub label: &'static str,
    pub state: StepState,
}

/// Everything a run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub execution_id: Uuid,
    pub pipeline_name: String,
    pub status: ExecutionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub directories: DirectoryLayout,
    pub models: Vec<String>,
    pub steps: Vec<StepReport>,
    pub warnings: Vec<String>,
    /// Present only when the run reached the summary
    pub artifacts: Option<ArtifactReport>,
}

impl RunReport {
    pub fn from_pipeline(pipeline: &Pipeline, artifacts: Option<ArtifactReport>) -> Self {
        Self {
            execution_id: pipeline.state.execution_id,
            pipeline_name: pipeline.name.clone(),
            status: pipeline.state.status,
            started_at: pipeline.state.started_at,
            completed_at: pipeline.state.completed_at,
            directories: pipeline.directories.clone(),
            models: pipeline.models.clone(),
            steps: pipeline
                .steps
                .iter()
                .map(|s| StepReport {
                    step: s.kind,
                    label: s.label(),
                    state: s.state.clone(),
                })
                .collect(),
            warnings: pipeline.state.warnings.clone(),
            artifacts,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }

    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    pub fn step_state(&self, step: StepKind) -> Option<&StepState> {
        self.steps.iter().find(|s| s.step == step).map(|s| &s.state)
    }
}
