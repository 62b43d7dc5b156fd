//! Pipeline error types

use crate::core::StepKind;
use crate::execution::ArtifactReport;
use thiserror::Error;

/// Fatal outcomes of a run
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A step with the abort policy failed; later steps were skipped
    #[error("{message}: {reason}")]
    StepAborted {
        step: StepKind,
        message: &'static str,
        reason: String,
        exit_code: Option<i32>,
        /// Listing taken when the run got as far as the analysis
        artifacts: Option<ArtifactReport>,
    },
}

impl PipelineError {
    /// The step that stopped the run
    pub fn step(&self) -> StepKind {
        match self {
            PipelineError::StepAborted { step, .. } => *step,
        }
    }

    /// Artifacts present when the run stopped, if the summary was reached
    pub fn artifacts(&self) -> Option<&ArtifactReport> {
        match self {
            PipelineError::StepAborted { artifacts, .. } => artifacts.as_ref(),
        }
    }
}
