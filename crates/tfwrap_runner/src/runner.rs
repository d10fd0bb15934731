//! Process runner trait and types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{CommandConfig, RunConfig};
use crate::error::RunnerResult;

/// Result of a process execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Exit code from the process (-1 when terminated by a signal)
    pub exit_code: i32,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// Check if execution was successful (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Process runner trait.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Check whether `program` can be spawned.
    async fn is_available(&self, program: &str) -> RunnerResult<bool>;

    /// Run a process to completion, capturing its output.
    ///
    /// A non-zero exit status is not an error; callers inspect
    /// [`ExecutionResult::success`].
    async fn run(&self, command: &CommandConfig, run_config: &RunConfig)
        -> RunnerResult<ExecutionResult>;
}
