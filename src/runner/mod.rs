//! Process boundary - how steps reach their external programs

pub mod environment;
pub mod error;
pub mod subprocess;

use async_trait::async_trait;
pub use environment::ChildEnvironment;
pub use error::RunnerError;
use std::process::ExitStatus;
pub use subprocess::SubprocessRunner;

/// A fully rendered external program call
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Step the call belongs to
    pub step_id: String,

    pub program: String,

    pub args: Vec<String>,

    /// Variables added to the inherited environment
    pub env: ChildEnvironment,

    /// Kill the process after this many seconds
    pub timeout_secs: Option<u64>,
}

/// How an external program finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Exit code; `None` when terminated by a signal
    pub exit_code: Option<i32>,
}

impl ProcessOutcome {
    pub fn from_code(code: i32) -> Self {
        Self {
            exit_code: Some(code),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

impl From<ExitStatus> for ProcessOutcome {
    fn from(status: ExitStatus) -> Self {
        Self {
            exit_code: status.code(),
        }
    }
}

/// Trait for step execution - allows for different implementations
#[async_trait]
pub trait StepRunner: Send + Sync {
    /// Run the program and wait for it to exit
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutcome, RunnerError>;
}
