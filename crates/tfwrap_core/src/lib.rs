//! # tfwrap_core
//!
//! Generates wrapper modules around third-party Terraform/OpenTofu modules.
//!
//! A wrapper exposes its module's whole input surface as one JSON-encoded
//! `config` variable and re-exports the module's outputs as one object.
//!
//! # Pipeline
//!
//! - **Source resolution**: registry, git and local references to a
//!   fetchable location plus an optional sub-path
//! - **Fetching**: shallow git clones into a disposable workspace
//! - **Variable extraction**: declared variables in declaration order, with
//!   defaults and documentation comments
//! - **Generation**: the `main.tf` entry point with defaulted lookups
//! - **Emission**: the four wrapper files, formatted best effort
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tfwrap_core::{GeneratorSettings, ModuleReference, WrapRequest, WrapperPipeline};
//! use tfwrap_runner::CliRunner;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline =
//!         WrapperPipeline::with_runner(GeneratorSettings::default(), Arc::new(CliRunner::new()))
//!             .await;
//!
//!     let reference =
//!         ModuleReference::new("terraform-aws-modules/vpc/aws", Some("5.0.0".into()))?;
//!     let outcome = pipeline.run(&WrapRequest::new(reference).iterable(true)).await?;
//!     println!("{} variables wrapped", outcome.variables.len());
//!     Ok(())
//! }
//! ```

pub mod emitter;
pub mod error;
pub mod fetch;
pub mod format;
pub mod generator;
pub mod literal;
pub mod model;
pub mod pipeline;
pub mod settings;
pub mod source;
pub mod variables;

pub use emitter::{wrapper_artifacts, Artifact, EmitReport, Emitter};
pub use error::{ErrorKind, WrapError, WrapResult};
pub use fetch::{GitFetcher, InMemoryFetcher, ModuleFetcher};
pub use format::{select_formatter, Formatter, FormatterChoice, NoopFormatter, TerraformFormatter};
pub use generator::{GeneratedWrapper, GeneratorOptions, WrapperGenerator};
pub use model::{
    DefaultKind, ModuleReference, ResolvedLocation, SourceKind, Variable, VariableSet,
    WrapperSpec, NO_DEFAULT,
};
pub use pipeline::{Discovery, WrapOutcome, WrapRequest, WrapperPipeline};
pub use settings::{GeneratorSettings, SETTINGS_FILE};
pub use source::{default_wrapper_name, SourceResolver};
pub use variables::{DeclarationScope, VariableExtractor};
