//! Pipeline execution engine

pub mod artifacts;
pub mod engine;
pub mod error;
pub mod flush;
pub mod report;
pub mod verify;

pub use artifacts::{scan_artifacts, Artifact, ArtifactKind, ArtifactReport};
pub use engine::{ExecutionEngine, ExecutionEvent};
pub use error::PipelineError;
pub use flush::{wait_for_files, FlushOutcome};
pub use report::{RunReport, StepReport};
pub use verify::{verify_data_files, DataVerification};
