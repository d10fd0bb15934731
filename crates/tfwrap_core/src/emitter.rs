//! Writing wrapper artifacts.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{WrapError, WrapResult};
use crate::format::Formatter;
use crate::generator::GeneratedWrapper;
use crate::literal::quote_string;

pub const LOCALS_FILE: &str = "locals.tf";
pub const VARIABLES_FILE: &str = "variables.tf";
pub const MAIN_FILE: &str = "main.tf";
pub const OUTPUTS_FILE: &str = "outputs.tf";

/// A file to write into the wrapper directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub content: String,
}

impl Artifact {
    pub fn new(file_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }
}

/// The four artifacts of a wrapper, in write order.
pub fn wrapper_artifacts(
    wrapper_name: &str,
    module_label: &str,
    generated: &GeneratedWrapper,
) -> Vec<Artifact> {
    let locals = "locals {\n  config = jsondecode(var.config)\n}\n";

    let description = format!(
        "A JSON encoded object that contains the full {} config",
        wrapper_name
    );
    let variables = format!(
        concat!(
            "variable \"config\" {{\n",
            "  type        = any\n",
            "  description = {}\n",
            "  default     = \"{{}}\"\n",
            "}}\n"
        ),
        quote_string(&description)
    );

    let outputs = format!(
        "output \"output\" {{\n  value = module.{}\n}}\n",
        module_label
    );

    vec![
        Artifact::new(LOCALS_FILE, locals),
        Artifact::new(VARIABLES_FILE, variables),
        Artifact::new(MAIN_FILE, generated.entry_point.clone()),
        Artifact::new(OUTPUTS_FILE, outputs),
    ]
}

/// What an emit run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmitReport {
    pub output_dir: PathBuf,
    /// Files written, in write order.
    pub written: Vec<PathBuf>,
    /// Files the formatter rewrote successfully.
    pub formatted: Vec<PathBuf>,
}

/// Writes artifacts and runs the formatter over each one.
pub struct Emitter {
    formatter: Arc<dyn Formatter>,
}

impl Emitter {
    pub fn new(formatter: Arc<dyn Formatter>) -> Self {
        Self { formatter }
    }

    pub async fn emit(&self, target_dir: &Path, artifacts: &[Artifact]) -> WrapResult<EmitReport> {
        fs::create_dir_all(target_dir)
            .map_err(|e| WrapError::write(target_dir, e.to_string()))?;

        let mut report = EmitReport {
            output_dir: target_dir.to_path_buf(),
            ..Default::default()
        };

        for artifact in artifacts {
            let path = target_dir.join(&artifact.file_name);
            fs::write(&path, &artifact.content)
                .map_err(|e| WrapError::write(&path, e.to_string()))?;
            debug!("Wrote {}", path.display());
            report.written.push(path.clone());

            if self.format_in_place(&path, artifact).await? {
                report.formatted.push(path);
            }
        }

        info!(
            "Wrote {} files to {} ({} formatted)",
            report.written.len(),
            target_dir.display(),
            report.formatted.len()
        );

        Ok(report)
    }

    /// Format one written artifact; failures leave the file as written.
    async fn format_in_place(&self, path: &Path, artifact: &Artifact) -> WrapResult<bool> {
        if !self.formatter.enabled() {
            return Ok(false);
        }

        match self.formatter.format(&artifact.file_name, &artifact.content).await {
            Ok(formatted) => {
                if formatted != artifact.content {
                    fs::write(path, &formatted)
                        .map_err(|e| WrapError::write(path, e.to_string()))?;
                }
                Ok(true)
            }
            Err(e) => {
                warn!(
                    "{} could not format {}, keeping it unformatted: {}",
                    self.formatter.name(),
                    path.display(),
                    e
                );
                Ok(false)
            }
        }
    }
}
