//! Generate command - Fetch a module and write its wrapper.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use tfwrap_core::{DefaultKind, GeneratorSettings, WrapRequest, WrapperPipeline};
use tfwrap_runner::{CliRunner, ProcessRunner};

use super::SourceArgs;

#[derive(Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Wrapper directory name (defaults to the module name)
    #[arg(short, long, env = "TFWRAP_NAME")]
    pub name: Option<String>,

    /// Instantiate the module once per entry of the config's instance map
    #[arg(short, long, env = "TFWRAP_ITERABLE")]
    pub iterable: bool,

    /// Directory the wrapper directory is created in
    #[arg(short, long, default_value = ".", env = "TFWRAP_OUTPUT_ROOT")]
    pub output_root: PathBuf,
}

pub async fn execute(args: GenerateArgs, settings: GeneratorSettings) -> Result<()> {
    run_with(args, settings, Arc::new(CliRunner::new())).await
}

async fn run_with(
    args: GenerateArgs,
    settings: GeneratorSettings,
    runner: Arc<dyn ProcessRunner>,
) -> Result<()> {
    let reference = args.source.reference()?;

    let mut request = WrapRequest::new(reference)
        .iterable(args.iterable)
        .output_root(&args.output_root);
    if let Some(name) = args.name {
        request = request.name(name);
    }

    // Nothing is spawned for a request that cannot be written.
    request.wrapper_name()?;

    info!("Generating wrapper for {}", args.source.source);

    let pipeline = WrapperPipeline::with_runner(settings, runner).await;
    let outcome = pipeline
        .run(&request)
        .await
        .with_context(|| format!("Failed to generate wrapper for {}", args.source.source))?;

    let placeholders: Vec<&str> = outcome
        .variables
        .iter()
        .filter(|v| v.default_kind == DefaultKind::Placeholder)
        .map(|v| v.name.as_str())
        .collect();

    println!(
        "✅ Wrapper module '{}' created in {}",
        outcome.wrapper_name,
        outcome.report.output_dir.display()
    );
    println!("   {} variables wrapped", outcome.variables.len());
    if !placeholders.is_empty() {
        println!(
            "   ⚠️  Defaults replaced by empty placeholders: {}",
            placeholders.join(", ")
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use tempfile::tempdir;
    use tfwrap_core::{FormatterChoice, WrapError};
    use tfwrap_runner::MockRunner;

    fn args(source: &str, name: Option<&str>, output_root: PathBuf) -> GenerateArgs {
        GenerateArgs {
            source: SourceArgs {
                source: source.to_string(),
                version: None,
            },
            name: name.map(str::to_string),
            iterable: false,
            output_root,
        }
    }

    #[tokio::test]
    async fn test_invalid_name_spawns_nothing() {
        let out = tempdir().unwrap();
        let runner = Arc::new(MockRunner::new());
        let args = args("terraform-aws-modules/vpc/aws", Some("a/b"), out.path().to_path_buf());

        let err = run_with(args, GeneratorSettings::default(), runner.clone())
            .await
            .unwrap_err();

        assert!(matches!(err.downcast_ref::<WrapError>(), Some(WrapError::Input(_))));
        assert_eq!(runner.call_count(), 0);
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_local_module_generated() {
        let modules = tempdir().unwrap();
        fs::write(modules.path().join("variables.tf"), "variable \"zone\" {}\n").unwrap();
        let out = tempdir().unwrap();
        let settings = GeneratorSettings {
            formatter: FormatterChoice::None,
            ..Default::default()
        };
        let runner = Arc::new(MockRunner::new());
        let source = modules.path().to_string_lossy().into_owned();

        let args = args(&source, Some("zone"), out.path().to_path_buf());

        run_with(args, settings, runner.clone()).await.unwrap();

        assert!(out.path().join("zone/main.tf").is_file());
        assert_eq!(runner.call_count(), 0);
    }
}
