//! Bounded wait for files written by the download step
//!
//! The download program may return before everything it wrote is visible at
//! the expected paths. Instead of sleeping for a fixed time we poll until
//! every expected file exists and its size stopped changing between two
//! consecutive polls, or until the timeout elapses.

use crate::core::config::FlushConfig;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Result of waiting for the data files
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FlushOutcome {
    /// Waiting is turned off (`timeout_secs: 0`)
    Disabled,
    /// All files present with stable sizes
    Settled { elapsed: Duration },
    /// Deadline reached; `missing` lists files that never appeared
    TimedOut {
        missing: Vec<PathBuf>,
        elapsed: Duration,
    },
}

impl FlushOutcome {
    pub fn is_settled(&self) -> bool {
        matches!(self, FlushOutcome::Settled { .. })
    }
}

/// Poll `paths` until they are present and stable, or `config.timeout_secs` passes
pub async fn wait_for_files(paths: &[PathBuf], config: &FlushConfig) -> FlushOutcome {
    if config.timeout_secs == 0 {
        return FlushOutcome::Disabled;
    }

    let start = Instant::now();
    if paths.is_empty() {
        return FlushOutcome::Settled {
            elapsed: start.elapsed(),
        };
    }

    let deadline = start + Duration::from_secs(config.timeout_secs);
    let interval = Duration::from_millis(config.poll_interval_ms.max(1));
    let mut previous: Option<Vec<Option<u64>>> = None;

    loop {
        let sizes = snapshot(paths).await;
        let all_present = sizes.iter().all(Option::is_some);

        if all_present && previous.as_ref() == Some(&sizes) {
            debug!("Data files settled after {:?}", start.elapsed());
            return FlushOutcome::Settled {
                elapsed: start.elapsed(),
            };
        }

        let now = Instant::now();
        if now >= deadline {
            let missing = paths
                .iter()
                .zip(&sizes)
                .filter(|(_, size)| size.is_none())
                .map(|(path, _)| path.clone())
                .collect();
            return FlushOutcome::TimedOut {
                missing,
                elapsed: start.elapsed(),
            };
        }

        previous = Some(sizes);
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

async fn snapshot(paths: &[PathBuf]) -> Vec<Option<u64>> {
    let mut sizes = Vec::with_capacity(paths.len());
    for path in paths {
        sizes.push(file_size(path).await);
    }
    sizes
}

async fn file_size(path: &Path) -> Option<u64> {
    tokio::fs::metadata(path)
        .await
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len())
}
