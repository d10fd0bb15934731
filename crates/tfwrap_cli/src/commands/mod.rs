//! CLI command definitions.
//!
//! Each subcommand is one step or the whole of the wrapper pipeline.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use tfwrap_core::{FormatterChoice, GeneratorSettings, ModuleReference};

pub mod generate;
pub mod inspect;
pub mod resolve;

/// tfwrap - wrapper module generator for Terraform/OpenTofu
#[derive(Parser)]
#[command(name = "tfwrap")]
#[command(version, about = "tfwrap - wrap Terraform modules behind a single JSON config input")]
#[command(long_about = r#"
tfwrap fetches a Terraform/OpenTofu module, reads its input variables and
generates a wrapper module whose only input is a JSON encoded `config`
variable and whose only output is the wrapped module itself.

COMMANDS:
  generate  → Fetch a module and write its wrapper
  inspect   → Fetch a module and list its variables
  resolve   → Show where a module reference is fetched from

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid input, arguments or settings
  3 - Module fetch failure
  4 - Declaration parse failure
  5 - Artifact write failure
"#)]
pub struct Cli {
    /// Settings file (defaults to .tfwrap.yaml in the current directory)
    #[arg(short, long, global = true, env = "TFWRAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON
    #[arg(long, global = true, env = "TFWRAP_LOG_JSON")]
    pub log_json: bool,

    #[command(flatten)]
    pub overrides: SettingsOverrides,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a wrapper module
    Generate(generate::GenerateArgs),

    /// List the variables a wrapper would expose
    Inspect(inspect::InspectArgs),

    /// Resolve a module reference without fetching it
    Resolve(resolve::ResolveArgs),
}

/// Command-line overrides for settings file values.
#[derive(Args, Debug, Default)]
pub struct SettingsOverrides {
    /// Host for registry-style references
    #[arg(long, global = true, env = "TFWRAP_DEFAULT_HOST")]
    pub default_host: Option<String>,

    /// Formatter to run over generated files (auto, terraform, tofu, none)
    #[arg(long, global = true, env = "TFWRAP_FORMATTER")]
    pub formatter: Option<FormatterChoice>,

    /// Fetch timeout in seconds (0 disables the timeout)
    #[arg(long, global = true, env = "TFWRAP_FETCH_TIMEOUT")]
    pub fetch_timeout: Option<u64>,

    /// Read variables from every .tf file of the module
    #[arg(long, global = true)]
    pub scan_all_files: bool,

    /// Keep non-empty object/list defaults instead of empty placeholders
    #[arg(long, global = true)]
    pub preserve_aggregate_defaults: bool,
}

impl SettingsOverrides {
    pub fn apply(&self, settings: &mut GeneratorSettings) {
        if let Some(host) = &self.default_host {
            settings.default_host = host.clone();
        }
        if let Some(formatter) = self.formatter {
            settings.formatter = formatter;
        }
        if let Some(timeout) = self.fetch_timeout {
            settings.fetch_timeout_secs = timeout;
        }
        if self.scan_all_files {
            settings.scan_all_files = true;
        }
        if self.preserve_aggregate_defaults {
            settings.preserve_aggregate_defaults = true;
        }
    }
}

/// Module reference arguments shared by the fetching commands.
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Module source (registry reference, git URL or local path)
    #[arg(short, long, env = "TFWRAP_SOURCE")]
    pub source: String,

    /// Tag or branch to fetch
    #[arg(long, env = "TFWRAP_VERSION")]
    pub version: Option<String>,
}

impl SourceArgs {
    pub fn reference(&self) -> Result<ModuleReference> {
        Ok(ModuleReference::new(&self.source, self.version.clone())?)
    }
}

/// Output format for listing commands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

/// Load settings from `--config` or the working directory, then apply
/// command-line overrides.
pub fn load_settings(cli: &Cli) -> Result<GeneratorSettings> {
    let mut settings = match &cli.config {
        Some(path) => GeneratorSettings::from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            GeneratorSettings::discover(&cwd)?
        }
    };

    cli.overrides.apply(&mut settings);
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parse_generate() {
        let cli = Cli::try_parse_from([
            "tfwrap",
            "generate",
            "--source",
            "terraform-aws-modules/vpc/aws",
            "--version",
            "5.0.0",
            "--iterable",
        ])
        .unwrap();

        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.source.source, "terraform-aws-modules/vpc/aws");
                assert_eq!(args.source.version.as_deref(), Some("5.0.0"));
                assert!(args.iterable);
                assert!(args.name.is_none());
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_source_is_required() {
        assert!(Cli::try_parse_from(["tfwrap", "generate"]).is_err());
    }

    #[test]
    fn test_overrides_apply_over_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        fs::write(&path, "default_host: gitlab.com\nfetch_timeout_secs: 10\n").unwrap();

        let cli = Cli::try_parse_from([
            "tfwrap",
            "--config",
            path.to_str().unwrap(),
            "--formatter",
            "none",
            "--fetch-timeout",
            "30",
            "resolve",
            "--source",
            "acme/net/aws",
        ])
        .unwrap();

        let settings = load_settings(&cli).unwrap();
        assert_eq!(settings.default_host, "gitlab.com");
        assert_eq!(settings.formatter, FormatterChoice::None);
        assert_eq!(settings.fetch_timeout_secs, 30);
    }

    #[test]
    fn test_unknown_formatter_rejected() {
        assert!(Cli::try_parse_from([
            "tfwrap",
            "--formatter",
            "prettier",
            "resolve",
            "--source",
            "acme/net/aws",
        ])
        .is_err());
    }
}
