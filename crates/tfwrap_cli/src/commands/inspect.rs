//! Inspect command - List the variables of a module.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use tfwrap_core::{
    Discovery, GeneratorSettings, GitFetcher, NoopFormatter, VariableSet, WrapperPipeline,
};
use tfwrap_runner::{CliRunner, ProcessRunner};

use super::{OutputFormat, SourceArgs};

#[derive(Args)]
pub struct InspectArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

pub async fn execute(args: InspectArgs, settings: GeneratorSettings) -> Result<()> {
    let discovery = discover_with(&args.source, settings, Arc::new(CliRunner::new())).await?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&discovery)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&discovery)?),
        OutputFormat::Table => print!("{}", render_table(&discovery.variables)),
    }

    Ok(())
}

/// Discovery writes no artifacts, so no formatter is looked up.
async fn discover_with(
    source: &SourceArgs,
    settings: GeneratorSettings,
    runner: Arc<dyn ProcessRunner>,
) -> Result<Discovery> {
    let reference = source.reference()?;
    let fetcher = GitFetcher::from_settings(runner, &settings);
    let pipeline = WrapperPipeline::new(settings, Arc::new(fetcher), Arc::new(NoopFormatter));

    pipeline
        .discover(&reference)
        .await
        .with_context(|| format!("Failed to inspect {}", source.source))
}

fn render_table(variables: &VariableSet) -> String {
    if variables.is_empty() {
        return "No variables declared.\n".to_string();
    }

    let rows: Vec<[String; 4]> = variables
        .in_order()
        .into_iter()
        .map(|v| {
            [
                v.ordinal.to_string(),
                v.name.clone(),
                format!("{:?}", v.default_kind).to_lowercase(),
                first_line(&v.default_literal),
            ]
        })
        .collect();

    let headers = ["#", "NAME", "KIND", "DEFAULT"];
    let mut widths = headers.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let mut push_row = |cells: [&str; 4]| {
        let line = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    };

    push_row(headers);
    for row in &rows {
        push_row([row[0].as_str(), row[1].as_str(), row[2].as_str(), row[3].as_str()]);
    }

    out
}

/// Multi-line defaults are shown by their first line.
fn first_line(literal: &str) -> String {
    let mut lines = literal.lines();
    let first = lines.next().unwrap_or_default();
    if lines.next().is_some() {
        format!("{} ...", first)
    } else {
        first.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use tempfile::tempdir;
    use tfwrap_core::DefaultKind;
    use tfwrap_runner::MockRunner;

    #[tokio::test]
    async fn test_local_inspection_runs_no_processes() {
        let module = tempdir().unwrap();
        fs::write(
            module.path().join("variables.tf"),
            "variable \"zone\" {}\nvariable \"size\" {\n  default = 2\n}\n",
        )
        .unwrap();
        let source = SourceArgs {
            source: module.path().to_string_lossy().into_owned(),
            version: None,
        };
        let runner = Arc::new(MockRunner::new());

        let discovery = discover_with(&source, GeneratorSettings::default(), runner.clone())
            .await
            .unwrap();

        assert_eq!(discovery.variables.names(), vec!["zone", "size"]);
        assert_eq!(runner.call_count(), 0);
        assert!(runner.get_method_calls("is_available").is_empty());
    }

    #[test]
    fn test_table_lists_variables_in_order() {
        let mut vars = VariableSet::new();
        vars.push("zone", "\"a\"", DefaultKind::Literal, None);
        vars.push("cidr", "null", DefaultKind::Absent, None);

        let table = render_table(&vars);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("#  NAME"));
        assert!(lines[1].contains("zone") && lines[1].contains("literal"));
        assert!(lines[2].contains("cidr") && lines[2].contains("absent"));
    }

    #[test]
    fn test_multi_line_default_truncated() {
        assert_eq!(first_line("{\n  a = 1\n}"), "{ ...");
        assert_eq!(first_line("5"), "5");
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(render_table(&VariableSet::new()), "No variables declared.\n");
    }
}
