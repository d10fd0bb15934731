//! # tfwrap_runner
//!
//! External process execution wrapper for tfwrap.
//!
//! Every tool tfwrap shells out to (`git`, `terraform`, `tofu`) goes through
//! the [`ProcessRunner`] trait so the pipeline can be exercised without a
//! network or any installed tooling.
//!
//! # Features
//!
//! - **CLI Runner**: tokio child processes with optional stdin and timeout
//! - **Availability Probing**: check whether a program can be spawned
//! - **Mock Runner**: scripted responses and captured calls for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use tfwrap_runner::{CliRunner, CommandConfig, ProcessRunner, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = CliRunner::new();
//!
//!     let command = CommandConfig::new("git")
//!         .arg("--version");
//!
//!     let result = runner.run(&command, &RunConfig::default().timeout(10)).await?;
//!     println!("Exit code: {}", result.exit_code);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod mock;
pub mod runner;

pub use cli::CliRunner;
pub use config::{CommandConfig, RunConfig};
pub use error::{RunnerError, RunnerResult};
pub use mock::{CapturedCall, MockResponse, MockRunner};
pub use runner::{ExecutionResult, ProcessRunner};
