//! Persistence layer for pipeline run history

#[cfg(feature = "sqlite")]
pub mod store;

#[cfg(feature = "sqlite")]
pub use store::SqliteExecutionStore;

pub use crate::core::ExecutionStatus;
use crate::core::Pipeline;
use crate::execution::ArtifactReport;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Summary of a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSummary {
    /// Unique execution ID
    pub execution_id: Uuid,

    /// Pipeline name
    pub pipeline_name: String,

    /// Execution status
    pub status: ExecutionStatus,

    /// When execution started
    pub started_at: DateTime<Utc>,

    /// When execution completed (if complete)
    pub completed_at: Option<DateTime<Utc>>,

    /// Number of steps that finished
    pub completed_steps: usize,

    /// Total number of steps
    pub total_steps: usize,

    /// Number of advisory warnings
    pub warnings: usize,

    /// Number of artifacts listed by the summary
    pub artifacts: usize,

    /// The step that aborted the run, if any
    pub failed_step: Option<String>,
}

/// Trait for persistence backends
#[async_trait::async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Save a pipeline execution
    async fn save_execution(&self, execution: &ExecutionSummary) -> Result<()>;

    /// Load an execution by ID
    async fn load_execution(&self, execution_id: Uuid) -> Result<Option<ExecutionSummary>>;

    /// List all executions for a pipeline, newest first
    async fn list_executions(&self, pipeline_name: &str) -> Result<Vec<ExecutionSummary>>;

    /// List the most recent executions across pipelines, newest first
    async fn list_recent(&self, limit: usize) -> Result<Vec<ExecutionSummary>>;
}

/// In-memory persistence (for testing or `--no-history`)
pub struct InMemoryPersistence {
    executions: tokio::sync::RwLock<Vec<ExecutionSummary>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self {
            executions: tokio::sync::RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryPersistence {
    fn default() -> Self {
        Self::new()
    }
}

fn newest_first(mut executions: Vec<ExecutionSummary>) -> Vec<ExecutionSummary> {
    executions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    executions
}

#[async_trait::async_trait]
impl PersistenceBackend for InMemoryPersistence {
    async fn save_execution(&self, execution: &ExecutionSummary) -> Result<()> {
        let mut execs = self.executions.write().await;
        execs.retain(|e| e.execution_id != execution.execution_id);
        execs.push(execution.clone());
        Ok(())
    }

    async fn load_execution(&self, execution_id: Uuid) -> Result<Option<ExecutionSummary>> {
        let execs = self.executions.read().await;
        Ok(execs.iter().find(|e| e.execution_id == execution_id).cloned())
    }

    async fn list_executions(&self, pipeline_name: &str) -> Result<Vec<ExecutionSummary>> {
        let execs = self.executions.read().await;
        Ok(newest_first(
            execs
                .iter()
                .filter(|e| e.pipeline_name == pipeline_name)
                .cloned()
                .collect(),
        ))
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<ExecutionSummary>> {
        let execs = self.executions.read().await;
        let mut recent = newest_first(execs.clone());
        recent.truncate(limit);
        Ok(recent)
    }
}

/// History store for a finished run
///
/// A database that cannot be opened must not change the outcome of the run,
/// so the error is logged and the run is kept in memory only.
#[cfg(feature = "sqlite")]
pub async fn open_run_history(db_path: Result<PathBuf>) -> Arc<dyn PersistenceBackend> {
    let opened = match db_path {
        Ok(path) => SqliteExecutionStore::new(&path).await,
        Err(e) => Err(e),
    };
    match opened {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!("Run history unavailable, this run will not be saved: {:#}", e);
            Arc::new(InMemoryPersistence::new())
        }
    }
}

#[cfg(not(feature = "sqlite"))]
pub async fn open_run_history(db_path: Result<PathBuf>) -> Arc<dyn PersistenceBackend> {
    if let Err(e) = db_path {
        warn!("Run history unavailable: {:#}", e);
    }
    Arc::new(InMemoryPersistence::new())
}

/// Create a summary from a pipeline
pub fn create_summary(pipeline: &Pipeline, artifacts: Option<&ArtifactReport>) -> ExecutionSummary {
    ExecutionSummary {
        execution_id: pipeline.state.execution_id,
        pipeline_name: pipeline.name.clone(),
        status: pipeline.state.status,
        started_at: pipeline.state.started_at.unwrap_or_else(Utc::now),
        completed_at: pipeline.state.completed_at,
        completed_steps: pipeline.state.completed_steps,
        total_steps: pipeline.state.total_steps,
        warnings: pipeline.state.warnings.len(),
        artifacts: artifacts.map(|a| a.len()).unwrap_or(0),
        failed_step: pipeline
            .steps
            .iter()
            .find(|s| s.is_fatal() && matches!(s.state, crate::core::StepState::Failed { .. }))
            .map(|s| s.id().to_string()),
    }
}
