//! End-to-end wrapper generation.
//!
//! resolve -> fetch -> extract -> generate -> emit. Artifacts are only
//! written once fetching and extraction have succeeded.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use tfwrap_runner::ProcessRunner;

use crate::emitter::{wrapper_artifacts, EmitReport, Emitter};
use crate::error::{WrapError, WrapResult};
use crate::fetch::{GitFetcher, ModuleFetcher};
use crate::format::{select_formatter, Formatter};
use crate::generator::{GeneratorOptions, WrapperGenerator};
use crate::model::{ModuleReference, ResolvedLocation, SourceKind, VariableSet, WrapperSpec};
use crate::settings::GeneratorSettings;
use crate::source::{default_wrapper_name, SourceResolver};
use crate::variables::{DeclarationScope, VariableExtractor};

/// A request to generate one wrapper module.
#[derive(Debug, Clone)]
pub struct WrapRequest {
    pub reference: ModuleReference,
    /// Output directory name; derived from the source when absent.
    pub name: Option<String>,
    pub iterable: bool,
    /// Directory the wrapper directory is created in.
    pub output_root: PathBuf,
}

impl WrapRequest {
    pub fn new(reference: ModuleReference) -> Self {
        Self {
            reference,
            name: None,
            iterable: false,
            output_root: PathBuf::from("."),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn iterable(mut self, iterable: bool) -> Self {
        self.iterable = iterable;
        self
    }

    pub fn output_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_root = dir.into();
        self
    }

    /// The wrapper name, validated as a single directory component.
    pub fn wrapper_name(&self) -> WrapResult<String> {
        let name = match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => default_wrapper_name(self.reference.raw_source()),
        };

        if name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(WrapError::Input(format!(
                "wrapper name '{}' must be a single directory name",
                name
            )));
        }

        Ok(name)
    }
}

/// Variables found for a module reference.
#[derive(Debug, Clone, Serialize)]
pub struct Discovery {
    pub location: ResolvedLocation,
    pub variables: VariableSet,
}

/// Result of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct WrapOutcome {
    pub wrapper_name: String,
    pub location: ResolvedLocation,
    pub variables: VariableSet,
    pub report: EmitReport,
}

/// Wires the pipeline stages together.
pub struct WrapperPipeline {
    settings: GeneratorSettings,
    resolver: SourceResolver,
    fetcher: Arc<dyn ModuleFetcher>,
    formatter: Arc<dyn Formatter>,
}

impl WrapperPipeline {
    pub fn new(
        settings: GeneratorSettings,
        fetcher: Arc<dyn ModuleFetcher>,
        formatter: Arc<dyn Formatter>,
    ) -> Self {
        Self {
            resolver: SourceResolver::new(&settings.default_host),
            settings,
            fetcher,
            formatter,
        }
    }

    /// Build a pipeline that clones with git and formats per the settings.
    pub async fn with_runner(settings: GeneratorSettings, runner: Arc<dyn ProcessRunner>) -> Self {
        let fetcher = GitFetcher::from_settings(Arc::clone(&runner), &settings);
        let formatter = select_formatter(settings.formatter, runner).await;
        Self::new(settings, Arc::new(fetcher), formatter)
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    pub fn resolve(&self, reference: &ModuleReference) -> ResolvedLocation {
        self.resolver.resolve(reference.raw_source())
    }

    /// Fetch the module into a scratch workspace and read its variables.
    ///
    /// The workspace is removed before this returns, on success or failure.
    pub async fn discover(&self, reference: &ModuleReference) -> WrapResult<Discovery> {
        let location = self.resolve(reference);
        info!("Discovering variables of {}", reference.raw_source());
        let scope = DeclarationScope::from_settings(&self.settings);

        let workspace = tempfile::Builder::new().prefix("tfwrap-").tempdir()?;
        let module_path = self
            .fetcher
            .fetch(&location, reference.version(), workspace.path(), &scope)
            .await?;

        let variables = VariableExtractor::new()
            .preserve_aggregates(self.settings.preserve_aggregate_defaults)
            .extract_scope(&module_path, &scope)?;

        Ok(Discovery {
            location,
            variables,
        })
    }

    /// Generate the wrapper described by `request`.
    pub async fn run(&self, request: &WrapRequest) -> WrapResult<WrapOutcome> {
        let wrapper_name = request.wrapper_name()?;
        let Discovery {
            location,
            variables,
        } = self.discover(&request.reference).await?;

        let module_location = match location.kind {
            SourceKind::Local => {
                let cwd = std::env::current_dir()?;
                let wrapper_dir = request.output_root.join(&wrapper_name);
                local_source_for(&location, &wrapper_dir, &cwd)
            }
            _ => location.clone(),
        };

        let spec = WrapperSpec {
            module_reference: request.reference.clone(),
            location: module_location,
            iterable: request.iterable,
            variables,
            wrapper_name,
        };

        let report = self.render(&spec, &request.output_root).await?;

        info!(
            "Wrapper module {} created in {}",
            spec.wrapper_name,
            report.output_dir.display()
        );

        Ok(WrapOutcome {
            wrapper_name: spec.wrapper_name,
            location,
            variables: spec.variables,
            report,
        })
    }

    /// Generate and emit the artifacts for an already built spec.
    pub async fn render(&self, spec: &WrapperSpec, output_root: &Path) -> WrapResult<EmitReport> {
        let generator = WrapperGenerator::new(GeneratorOptions::from_settings(&self.settings));
        let generated = generator.generate(spec);
        let artifacts = wrapper_artifacts(
            &spec.wrapper_name,
            &generator.options().module_label,
            &generated,
        );

        Emitter::new(Arc::clone(&self.formatter))
            .emit(&output_root.join(&spec.wrapper_name), &artifacts)
            .await
    }
}

/// Re-anchor a local module location so it is relative to `wrapper_dir`.
///
/// Relative paths in both arguments are taken from `cwd`. The sub-path is
/// folded into the result.
fn local_source_for(
    location: &ResolvedLocation,
    wrapper_dir: &Path,
    cwd: &Path,
) -> ResolvedLocation {
    let mut module_dir = cwd.join(&location.fetch_location);
    if let Some(sub) = location.sub_path.as_deref() {
        module_dir.push(sub);
    }
    let module_dir = normalize(&module_dir);
    let wrapper_dir = normalize(&cwd.join(wrapper_dir));

    let relative = pathdiff::diff_paths(&module_dir, &wrapper_dir).unwrap_or(module_dir);
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    let fetch_location = if relative.is_absolute() {
        relative.to_string_lossy().replace('\\', "/")
    } else if parts.is_empty() {
        ".".to_string()
    } else if parts[0] == ".." {
        parts.join("/")
    } else {
        format!("./{}", parts.join("/"))
    };

    ResolvedLocation {
        fetch_location,
        sub_path: None,
        pinned_ref: None,
        kind: SourceKind::Local,
    }
}

/// Lexically drop `.` and resolve `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(source: &str) -> ModuleReference {
        ModuleReference::new(source, None).unwrap()
    }

    #[test]
    fn test_wrapper_name_defaults_to_module_name() {
        let request = WrapRequest::new(reference("terraform-aws-modules/vpc/aws"));
        assert_eq!(request.wrapper_name().unwrap(), "vpc");
    }

    #[test]
    fn test_explicit_wrapper_name_wins() {
        let request = WrapRequest::new(reference("terraform-aws-modules/vpc/aws")).name("mynet");
        assert_eq!(request.wrapper_name().unwrap(), "mynet");
    }

    #[test]
    fn test_blank_name_falls_back() {
        let request = WrapRequest::new(reference("terraform-aws-modules/vpc/aws")).name("  ");
        assert_eq!(request.wrapper_name().unwrap(), "vpc");
    }

    #[test]
    fn test_name_with_separator_rejected() {
        let request = WrapRequest::new(reference("terraform-aws-modules/vpc/aws")).name("a/b");
        assert!(matches!(request.wrapper_name(), Err(WrapError::Input(_))));
    }

    fn local(fetch_location: &str, sub_path: Option<&str>) -> ResolvedLocation {
        ResolvedLocation {
            fetch_location: fetch_location.to_string(),
            sub_path: sub_path.map(str::to_string),
            pinned_ref: None,
            kind: SourceKind::Local,
        }
    }

    #[test]
    fn test_local_source_relative_to_wrapper_dir() {
        let cwd = Path::new("/work/live");
        let relocated = local_source_for(&local("./modules/net", None), Path::new("./vpc"), cwd);
        assert_eq!(relocated.fetch_location, "../modules/net");
        assert_eq!(relocated.sub_path, None);
    }

    #[test]
    fn test_local_source_folds_sub_path() {
        let cwd = Path::new("/work/live");
        let location = local("../shared", Some("net/vpc"));
        let relocated = local_source_for(&location, Path::new("out/wrappers/vpc"), cwd);
        assert_eq!(relocated.fetch_location, "../../../../shared/net/vpc");
    }

    #[test]
    fn test_local_source_inside_wrapper_dir() {
        let cwd = Path::new("/work");
        let relocated = local_source_for(&local("/work/vpc/inner", None), Path::new("vpc"), cwd);
        assert_eq!(relocated.fetch_location, "./inner");
    }

    #[test]
    fn test_absolute_output_root() {
        let cwd = Path::new("/elsewhere");
        let location = local("/work/modules/net", None);
        let relocated = local_source_for(&location, Path::new("/work/wrappers/net"), cwd);
        assert_eq!(relocated.fetch_location, "../../modules/net");
    }

    #[test]
    fn test_normalize_is_lexical() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
    }
}
