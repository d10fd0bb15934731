//! tfwrap CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid input, arguments or settings
//! - 3: Module fetch failure
//! - 4: Declaration parse failure
//! - 5: Artifact write failure

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tfwrap_core::{ErrorKind, WrapError};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_INPUT: u8 = 2;
    pub const FETCH_ERROR: u8 = 3;
    pub const PARSE_ERROR: u8 = 4;
    pub const WRITE_ERROR: u8 = 5;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet, cli.log_json);

    let result = match commands::load_settings(&cli) {
        Ok(settings) => match cli.command {
            Commands::Generate(args) => commands::generate::execute(args, settings).await,
            Commands::Inspect(args) => commands::inspect::execute(args, settings).await,
            Commands::Resolve(args) => commands::resolve::execute(args, settings).await,
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(categorize_error(&e))
        }
    }
}

fn init_logging(verbose: bool, quiet: bool, json: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tfwrap={},warn", level)));

    let json_layer = json.then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    // A subscriber may already be installed; keep it.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init();
}

/// Map the root cause to an exit code.
fn categorize_error(e: &anyhow::Error) -> u8 {
    let kind = e
        .chain()
        .find_map(|cause| cause.downcast_ref::<WrapError>())
        .map(WrapError::kind);

    match kind {
        Some(ErrorKind::Input) | Some(ErrorKind::Settings) => ExitCodes::INVALID_INPUT,
        Some(ErrorKind::Fetch) => ExitCodes::FETCH_ERROR,
        Some(ErrorKind::Parse) => ExitCodes::PARSE_ERROR,
        Some(ErrorKind::Write) => ExitCodes::WRITE_ERROR,
        Some(ErrorKind::Format) | Some(ErrorKind::Internal) | None => ExitCodes::GENERAL_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_exit_codes_follow_error_kind() {
        let fetch = anyhow::Error::new(WrapError::Fetch("unreachable".into()));
        assert_eq!(categorize_error(&fetch), ExitCodes::FETCH_ERROR);

        let parse = anyhow::Error::new(WrapError::parse("variables.tf", "bad"));
        assert_eq!(categorize_error(&parse), ExitCodes::PARSE_ERROR);

        let write = anyhow::Error::new(WrapError::write("out", "denied"));
        assert_eq!(categorize_error(&write), ExitCodes::WRITE_ERROR);
    }

    #[test]
    fn test_context_does_not_hide_kind() {
        let result: Result<(), WrapError> =
            Err(WrapError::Input("module source is required".into()));
        let err = result.context("Failed to generate wrapper").unwrap_err();
        assert_eq!(categorize_error(&err), ExitCodes::INVALID_INPUT);
    }

    #[test]
    fn test_unknown_errors_are_general() {
        let err = anyhow::anyhow!("something else");
        assert_eq!(categorize_error(&err), ExitCodes::GENERAL_ERROR);
    }
}
