//! Canonical formatting of generated artifacts.
//!
//! Formatting is best effort: a failing formatter never fails generation.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tfwrap_runner::{CommandConfig, ProcessRunner, RunConfig};

use crate::error::{WrapError, WrapResult};

/// Formats HCL source text.
#[async_trait]
pub trait Formatter: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Whether this formatter changes anything at all.
    fn enabled(&self) -> bool {
        true
    }

    /// Return the canonical form of `source`.
    async fn format(&self, file_name: &str, source: &str) -> WrapResult<String>;
}

/// Leaves artifacts untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFormatter;

#[async_trait]
impl Formatter for NoopFormatter {
    fn name(&self) -> &str {
        "none"
    }

    fn enabled(&self) -> bool {
        false
    }

    async fn format(&self, _file_name: &str, source: &str) -> WrapResult<String> {
        Ok(source.to_string())
    }
}

/// Pipes artifacts through `terraform fmt -` (or `tofu fmt -`).
pub struct TerraformFormatter {
    runner: Arc<dyn ProcessRunner>,
    program: String,
}

impl TerraformFormatter {
    pub fn new(runner: Arc<dyn ProcessRunner>, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }
}

#[async_trait]
impl Formatter for TerraformFormatter {
    fn name(&self) -> &str {
        &self.program
    }

    async fn format(&self, file_name: &str, source: &str) -> WrapResult<String> {
        let command = CommandConfig::new(&self.program)
            .args(["fmt", "-no-color", "-"])
            .stdin(source);

        let result = self
            .runner
            .run(&command, &RunConfig::default().timeout(60))
            .await
            .map_err(|e| WrapError::Format(format!("{}: {}", file_name, e)))?;

        if !result.success() {
            return Err(WrapError::Format(format!(
                "{} fmt rejected {}: {}",
                self.program,
                file_name,
                result.stderr.trim()
            )));
        }

        if result.stdout.trim().is_empty() && !source.trim().is_empty() {
            return Err(WrapError::Format(format!(
                "{} fmt returned no output for {}",
                self.program, file_name
            )));
        }

        Ok(result.stdout)
    }
}

/// Which formatter to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatterChoice {
    /// Look for `tofu`, then `terraform`, else skip formatting.
    #[default]
    Auto,
    Terraform,
    Tofu,
    None,
}

impl FormatterChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatterChoice::Auto => "auto",
            FormatterChoice::Terraform => "terraform",
            FormatterChoice::Tofu => "tofu",
            FormatterChoice::None => "none",
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            FormatterChoice::Auto,
            FormatterChoice::Terraform,
            FormatterChoice::Tofu,
            FormatterChoice::None,
        ]
    }
}

impl std::fmt::Display for FormatterChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FormatterChoice {
    type Err = WrapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|choice| choice.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                WrapError::Settings(format!(
                    "unknown formatter '{}', expected one of auto, terraform, tofu, none",
                    s
                ))
            })
    }
}

/// Build the formatter for `choice`.
///
/// `Auto` asks the runner for each tool; when neither is installed
/// formatting is skipped.
pub async fn select_formatter(
    choice: FormatterChoice,
    runner: Arc<dyn ProcessRunner>,
) -> Arc<dyn Formatter> {
    match choice {
        FormatterChoice::None => Arc::new(NoopFormatter),
        FormatterChoice::Terraform | FormatterChoice::Tofu => {
            Arc::new(TerraformFormatter::new(runner, choice.as_str()))
        }
        FormatterChoice::Auto => {
            for program in ["tofu", "terraform"] {
                if runner.is_available(program).await.unwrap_or(false) {
                    info!("Formatting artifacts with {}", program);
                    return Arc::new(TerraformFormatter::new(runner, program));
                }
            }
            debug!("No formatter found, artifacts are left as generated");
            Arc::new(NoopFormatter)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfwrap_runner::{MockResponse, MockRunner};

    #[tokio::test]
    async fn test_terraform_formatter_pipes_stdin() {
        let mock = MockRunner::new().add_response(MockResponse::success("a = 1\n"));
        let formatter = TerraformFormatter::new(Arc::new(mock.clone()), "terraform");

        let formatted = formatter.format("main.tf", "a=1").await.unwrap();
        assert_eq!(formatted, "a = 1\n");

        let calls = mock.get_method_calls("run");
        assert_eq!(calls[0].program, "terraform");
        assert_eq!(calls[0].args.last().map(String::as_str), Some("-"));
        assert_eq!(calls[0].stdin.as_deref(), Some("a=1"));
    }

    #[tokio::test]
    async fn test_terraform_formatter_reports_failure() {
        let mock = MockRunner::new().add_response(MockResponse::failure(2, "Invalid character"));
        let formatter = TerraformFormatter::new(Arc::new(mock), "tofu");

        let err = formatter.format("main.tf", "a=").await.unwrap_err();
        assert!(matches!(err, WrapError::Format(_)));
    }

    #[tokio::test]
    async fn test_auto_prefers_tofu() {
        let mock = MockRunner::new().with_program("tofu").with_program("terraform");
        let formatter = select_formatter(FormatterChoice::Auto, Arc::new(mock)).await;
        assert_eq!(formatter.name(), "tofu");
    }

    #[tokio::test]
    async fn test_auto_without_tools_is_noop() {
        let formatter = select_formatter(FormatterChoice::Auto, Arc::new(MockRunner::new())).await;
        assert!(!formatter.enabled());
    }

    #[test]
    fn test_choice_from_str() {
        assert_eq!("Terraform".parse::<FormatterChoice>().unwrap(), FormatterChoice::Terraform);
        assert_eq!("none".parse::<FormatterChoice>().unwrap(), FormatterChoice::None);
        assert!("prettier".parse::<FormatterChoice>().is_err());
    }
}
