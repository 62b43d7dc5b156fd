//! analysis-pipeline - Driver for the LLM benchmark comparison pipeline

pub mod cli;
pub mod core;
pub mod execution;
pub mod persistence;
pub mod runner;

// Re-export commonly used types
pub use core::{config::PipelineConfig, ExecutionStatus, Pipeline, PipelineContext, Step, StepKind, StepState};
pub use execution::{ArtifactReport, ExecutionEngine, ExecutionEvent, PipelineError, RunReport};
pub use runner::{ChildEnvironment, Invocation, ProcessOutcome, RunnerError, StepRunner, SubprocessRunner};
