//! CLI-based process runner.
//!
//! Spawns real child processes through tokio, feeding optional stdin and
//! enforcing the configured timeout. A child that outlives its timeout is
//! killed.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::{CommandConfig, RunConfig};
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{ExecutionResult, ProcessRunner};

/// Runner that executes programs on the host.
#[derive(Debug, Clone, Default)]
pub struct CliRunner;

impl CliRunner {
    pub fn new() -> Self {
        Self
    }

    fn build_command(&self, config: &CommandConfig) -> Command {
        let mut cmd = Command::new(&config.program);
        cmd.args(&config.args);
        if let Some(dir) = &config.workdir {
            cmd.current_dir(dir);
        }
        for (key, value) in &config.env {
            cmd.env(key, value);
        }
        cmd.stdin(if config.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl ProcessRunner for CliRunner {
    async fn is_available(&self, program: &str) -> RunnerResult<bool> {
        let status = Command::new(program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        Ok(matches!(status, Ok(s) if s.success()))
    }

    async fn run(
        &self,
        command: &CommandConfig,
        run_config: &RunConfig,
    ) -> RunnerResult<ExecutionResult> {
        debug!("Executing: {}", command.display());
        let started = Instant::now();

        let mut child = self.build_command(command).spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RunnerError::ProgramNotAvailable(command.program.clone())
            } else {
                RunnerError::ExecutionFailed(format!("Failed to spawn {}: {}", command.program, e))
            }
        })?;

        if let Some(input) = &command.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                let input = input.clone();
                // Written concurrently with the output reads below.
                tokio::spawn(async move {
                    if let Err(e) = stdin.write_all(input.as_bytes()).await {
                        warn!("Failed to write process stdin: {}", e);
                    }
                });
            }
        }

        let output = if run_config.timeout_seconds == 0 {
            child.wait_with_output().await?
        } else {
            let limit = Duration::from_secs(run_config.timeout_seconds);
            match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(output) => output?,
                Err(_) => {
                    warn!(
                        "{} exceeded timeout of {}s",
                        command.program, run_config.timeout_seconds
                    );
                    return Err(RunnerError::Timeout(run_config.timeout_seconds));
                }
            }
        };

        let result = ExecutionResult {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration_ms: started.elapsed().as_millis() as u64,
        };

        debug!(
            "{} exited with {} after {}ms",
            command.program, result.exit_code, result.duration_ms
        );

        Ok(result)
    }
}
