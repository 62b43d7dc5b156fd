//! Subprocess runner - executes a step's program and waits for it

use crate::runner::{Invocation, ProcessOutcome, RunnerError, StepRunner};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Runs steps as child processes
///
/// Children inherit stdout/stderr so their own progress output reaches the
/// terminal as it is produced.
#[derive(Debug, Clone, Default)]
pub struct SubprocessRunner {
    /// Send child stdout to our stderr, keeping our stdout for machine output
    stdout_to_stderr: bool,
}

impl SubprocessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stdout_to_stderr(mut self) -> Self {
        self.stdout_to_stderr = true;
        self
    }

    fn child_stdout(&self) -> Stdio {
        if self.stdout_to_stderr {
            Stdio::from(std::io::stderr())
        } else {
            Stdio::inherit()
        }
    }
}

#[async_trait]
impl StepRunner for SubprocessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutcome, RunnerError> {
        debug!(
            "Spawning {} for step {} with {} args",
            invocation.program,
            invocation.step_id,
            invocation.args.len()
        );

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .envs(invocation.env.vars().iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(self.child_stdout())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| RunnerError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        let status = match invocation.timeout_secs {
            Some(secs) => match timeout(std::time::Duration::from_secs(secs), child.wait()).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Step {} timed out after {}s, killing it", invocation.step_id, secs);
                    if let Err(e) = child.kill().await {
                        warn!("Failed to kill {}: {}", invocation.program, e);
                    }
                    return Err(RunnerError::Timeout(secs));
                }
            },
            None => child.wait().await,
        }
        .map_err(|source| RunnerError::Wait {
            program: invocation.program.clone(),
            source,
        })?;

        let outcome = ProcessOutcome::from(status);
        debug!(
            "Step {} exited with code {:?}",
            invocation.step_id, outcome.exit_code
        );
        Ok(outcome)
    }
}
