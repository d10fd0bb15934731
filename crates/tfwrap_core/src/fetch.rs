//! Module fetching.
//!
//! A fetcher materialises a resolved module inside a caller-owned workspace
//! and returns the directory that holds the module's declaration files.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use tfwrap_runner::{CommandConfig, ProcessRunner, RunConfig, RunnerError};

use crate::error::{WrapError, WrapResult};
use crate::model::{ResolvedLocation, SourceKind};
use crate::settings::GeneratorSettings;
use crate::variables::DeclarationScope;

/// Directory inside the workspace that receives the checkout.
pub const CHECKOUT_DIR: &str = "checkout";

/// Retrieves a module's files.
#[async_trait]
pub trait ModuleFetcher: Send + Sync {
    /// Fetch `location` at `version` into `workspace`.
    ///
    /// Returns the module directory (checkout root joined with the
    /// sub-path). Fails if that directory lacks the files `scope` expects.
    async fn fetch(
        &self,
        location: &ResolvedLocation,
        version: Option<&str>,
        workspace: &Path,
        scope: &DeclarationScope,
    ) -> WrapResult<PathBuf>;
}

/// Join the sub-path and check the declaration files are there.
pub fn module_dir(
    root: &Path,
    location: &ResolvedLocation,
    scope: &DeclarationScope,
) -> WrapResult<PathBuf> {
    let module_path = match location.sub_path.as_deref() {
        Some(sub) => {
            let sub = sub.trim_start_matches('/');
            if Path::new(sub).components().any(|c| matches!(c, std::path::Component::ParentDir)) {
                return Err(WrapError::Fetch(format!(
                    "sub-path '{}' escapes the module repository",
                    sub
                )));
            }
            root.join(sub)
        }
        None => root.to_path_buf(),
    };

    if !scope.is_present(&module_path) {
        return Err(WrapError::Fetch(format!(
            "expected {} not found in {}{}",
            scope.describe(),
            location.fetch_location,
            location
                .sub_path
                .as_deref()
                .map(|s| format!(" (sub-path '{}')", s))
                .unwrap_or_default()
        )));
    }

    Ok(module_path)
}

/// Fetches modules with a shallow `git clone`.
///
/// Local sources are read in place without cloning.
pub struct GitFetcher {
    runner: Arc<dyn ProcessRunner>,
    git_program: String,
    timeout_secs: u64,
}

impl GitFetcher {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            runner,
            git_program: "git".to_string(),
            timeout_secs: 300,
        }
    }

    /// Fetcher using the git program and timeout from `settings`.
    pub fn from_settings(runner: Arc<dyn ProcessRunner>, settings: &GeneratorSettings) -> Self {
        Self::new(runner)
            .with_program(&settings.git_program)
            .with_timeout(settings.fetch_timeout_secs)
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.git_program = program.into();
        self
    }

    /// Fetch timeout in seconds; 0 disables it.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_secs = seconds;
        self
    }

    fn clone_command(&self, url: &str, git_ref: Option<&str>, target: &Path) -> CommandConfig {
        let mut command = CommandConfig::new(&self.git_program)
            .args(["clone", "--quiet", "--depth", "1", "--single-branch"])
            .env("GIT_TERMINAL_PROMPT", "0");
        if let Some(git_ref) = git_ref {
            command = command.args(["--branch", git_ref]);
        }
        command
            .arg(url)
            .arg(target.to_string_lossy().to_string())
    }

    async fn clone_once(
        &self,
        url: &str,
        git_ref: Option<&str>,
        target: &Path,
    ) -> WrapResult<Result<(), String>> {
        if target.exists() {
            fs::remove_dir_all(target)?;
        }

        let command = self.clone_command(url, git_ref, target);
        let run_config = RunConfig::default().timeout(self.timeout_secs);

        let result = self
            .runner
            .run(&command, &run_config)
            .await
            .map_err(|e| match e {
                RunnerError::Timeout(secs) => {
                    WrapError::Fetch(format!("fetching {} timed out after {}s", url, secs))
                }
                RunnerError::ProgramNotAvailable(program) => {
                    WrapError::Fetch(format!("{} is not available on PATH", program))
                }
                other => WrapError::Fetch(format!("fetching {} failed: {}", url, other)),
            })?;

        if result.success() {
            Ok(Ok(()))
        } else {
            Ok(Err(result.stderr.trim().to_string()))
        }
    }
}

/// Refs to try, in order.
///
/// Registry versions are usually tagged `v<version>` on the source host, so
/// that spelling is tried when the literal one is missing.
fn candidate_refs(kind: SourceKind, version: Option<&str>) -> Vec<Option<String>> {
    match version {
        None => vec![None],
        Some(v) => {
            let mut refs = vec![Some(v.to_string())];
            if kind == SourceKind::Registry && !v.starts_with('v') {
                refs.push(Some(format!("v{}", v)));
            }
            refs
        }
    }
}

fn is_missing_ref(stderr: &str) -> bool {
    stderr.contains("not found in upstream") || stderr.contains("Could not find remote branch")
}

#[async_trait]
impl ModuleFetcher for GitFetcher {
    async fn fetch(
        &self,
        location: &ResolvedLocation,
        version: Option<&str>,
        workspace: &Path,
        scope: &DeclarationScope,
    ) -> WrapResult<PathBuf> {
        let version = version.or(location.pinned_ref.as_deref());

        if location.kind == SourceKind::Local {
            let root = Path::new(&location.fetch_location);
            if !root.is_dir() {
                return Err(WrapError::Fetch(format!(
                    "local module directory {} does not exist",
                    root.display()
                )));
            }
            if version.is_some() {
                warn!("Version is ignored for local module {}", root.display());
            }
            return module_dir(root, location, scope);
        }

        let target = workspace.join(CHECKOUT_DIR);
        let candidates = candidate_refs(location.kind, version);
        let mut last_error = String::new();

        for (attempt, git_ref) in candidates.iter().enumerate() {
            info!(
                "Fetching {} at {}",
                location.fetch_location,
                git_ref.as_deref().unwrap_or("default branch")
            );

            match self
                .clone_once(&location.fetch_location, git_ref.as_deref(), &target)
                .await?
            {
                Ok(()) => return module_dir(&target, location, scope),
                Err(stderr) => {
                    let retry = attempt + 1 < candidates.len() && is_missing_ref(&stderr);
                    debug!("Clone failed (retry: {}): {}", retry, stderr);
                    last_error = stderr;
                    if !retry {
                        break;
                    }
                }
            }
        }

        Err(WrapError::Fetch(format!(
            "git clone of {}{} failed: {}",
            location.fetch_location,
            version.map(|v| format!(" at {}", v)).unwrap_or_default(),
            last_error
        )))
    }
}

/// Fetcher that writes fixed files into the workspace.
///
/// Paths are relative to the checkout root, so fixtures can exercise
/// sub-paths the same way a real repository would.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFetcher {
    files: Vec<(PathBuf, String)>,
}

impl InMemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.push((path.into(), content.into()));
        self
    }
}

#[async_trait]
impl ModuleFetcher for InMemoryFetcher {
    async fn fetch(
        &self,
        location: &ResolvedLocation,
        _version: Option<&str>,
        workspace: &Path,
        scope: &DeclarationScope,
    ) -> WrapResult<PathBuf> {
        let root = workspace.join(CHECKOUT_DIR);
        for (path, content) in &self.files {
            let target = root.join(path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, content)?;
        }
        module_dir(&root, location, scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tfwrap_runner::{MockResponse, MockRunner};

    fn location(kind: SourceKind, sub_path: Option<&str>) -> ResolvedLocation {
        ResolvedLocation {
            fetch_location: "https://github.com/acme/terraform-aws-vpc.git".to_string(),
            sub_path: sub_path.map(str::to_string),
            pinned_ref: None,
            kind,
        }
    }

    fn scope() -> DeclarationScope {
        DeclarationScope::File("variables.tf".to_string())
    }

    /// Mock runner whose "clone" writes a variables file into the target.
    fn cloning_runner(responses: Vec<MockResponse>) -> MockRunner {
        MockRunner::new().with_responses(responses).with_hook(|cmd| {
            if let Some(target) = cmd.args.last() {
                let dir = Path::new(target);
                let _ = fs::create_dir_all(dir.join("modules/sub"));
                let _ = fs::write(dir.join("variables.tf"), "variable \"a\" {}\n");
                let _ = fs::write(dir.join("modules/sub/variables.tf"), "variable \"b\" {}\n");
            }
        })
    }

    #[tokio::test]
    async fn test_git_fetch_builds_shallow_clone() {
        let workspace = tempdir().unwrap();
        let mock = cloning_runner(vec![MockResponse::success("")]);
        let fetcher = GitFetcher::new(Arc::new(mock.clone()));

        let path = fetcher
            .fetch(&location(SourceKind::Git, None), Some("v1.0.0"), workspace.path(), &scope())
            .await
            .unwrap();

        assert_eq!(path, workspace.path().join(CHECKOUT_DIR));

        let calls = mock.get_method_calls("run");
        assert_eq!(calls.len(), 1);
        let args = &calls[0].args;
        assert!(args.contains(&"--depth".to_string()));
        assert!(args.contains(&"--branch".to_string()));
        assert!(args.contains(&"v1.0.0".to_string()));
        assert_eq!(calls[0].env.get("GIT_TERMINAL_PROMPT"), Some(&"0".to_string()));
    }

    #[tokio::test]
    async fn test_fetcher_from_settings_uses_git_program() {
        let workspace = tempdir().unwrap();
        let mock = cloning_runner(vec![MockResponse::success("")]);
        let settings = GeneratorSettings {
            git_program: "/opt/git/bin/git".to_string(),
            ..Default::default()
        };
        let fetcher = GitFetcher::from_settings(Arc::new(mock.clone()), &settings);

        fetcher
            .fetch(&location(SourceKind::Git, None), None, workspace.path(), &scope())
            .await
            .unwrap();

        assert_eq!(mock.get_method_calls("run")[0].program, "/opt/git/bin/git");
    }

    #[tokio::test]
    async fn test_git_fetch_joins_sub_path() {
        let workspace = tempdir().unwrap();
        let fetcher = GitFetcher::new(Arc::new(cloning_runner(vec![])));

        let path = fetcher
            .fetch(
                &location(SourceKind::Git, Some("modules/sub")),
                None,
                workspace.path(),
                &scope(),
            )
            .await
            .unwrap();

        assert_eq!(path, workspace.path().join(CHECKOUT_DIR).join("modules/sub"));
    }

    #[tokio::test]
    async fn test_missing_sub_path_is_fetch_error() {
        let workspace = tempdir().unwrap();
        let fetcher = GitFetcher::new(Arc::new(cloning_runner(vec![])));

        let err = fetcher
            .fetch(
                &location(SourceKind::Git, Some("modules/missing")),
                None,
                workspace.path(),
                &scope(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, WrapError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_registry_version_retries_with_v_prefix() {
        let workspace = tempdir().unwrap();
        let mock = cloning_runner(vec![
            MockResponse::failure(128, "fatal: Remote branch 5.0.0 not found in upstream origin"),
            MockResponse::success(""),
        ]);
        let fetcher = GitFetcher::new(Arc::new(mock.clone()));

        fetcher
            .fetch(&location(SourceKind::Registry, None), Some("5.0.0"), workspace.path(), &scope())
            .await
            .unwrap();

        let calls = mock.get_method_calls("run");
        assert_eq!(calls.len(), 2);
        assert!(calls[1].args.contains(&"v5.0.0".to_string()));
    }

    #[tokio::test]
    async fn test_clone_failure_is_fetch_error() {
        let workspace = tempdir().unwrap();
        let mock = MockRunner::new()
            .add_response(MockResponse::failure(128, "fatal: repository not found"));
        let fetcher = GitFetcher::new(Arc::new(mock.clone()));

        let err = fetcher
            .fetch(&location(SourceKind::Registry, None), Some("1.0.0"), workspace.path(), &scope())
            .await
            .unwrap_err();

        assert!(matches!(err, WrapError::Fetch(ref m) if m.contains("repository not found")));
        // Not a missing-ref failure, so no retry.
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_timeout_is_fetch_error() {
        let workspace = tempdir().unwrap();
        let runner = MockRunner::new().simulate_timeout(5);
        let fetcher = GitFetcher::new(Arc::new(runner)).with_timeout(5);

        let err = fetcher
            .fetch(&location(SourceKind::Git, None), None, workspace.path(), &scope())
            .await
            .unwrap_err();

        assert!(matches!(err, WrapError::Fetch(ref m) if m.contains("timed out")));
    }

    #[tokio::test]
    async fn test_local_source_is_read_in_place() {
        let module = tempdir().unwrap();
        fs::write(module.path().join("variables.tf"), "variable \"x\" {}\n").unwrap();
        let workspace = tempdir().unwrap();
        let mock = MockRunner::new();
        let fetcher = GitFetcher::new(Arc::new(mock.clone()));

        let local = ResolvedLocation {
            fetch_location: module.path().to_string_lossy().to_string(),
            sub_path: None,
            pinned_ref: None,
            kind: SourceKind::Local,
        };

        let path = fetcher.fetch(&local, None, workspace.path(), &scope()).await.unwrap();
        assert_eq!(path, module.path());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_in_memory_fetcher() {
        let workspace = tempdir().unwrap();
        let fetcher = InMemoryFetcher::new()
            .with_file("modules/vpc/variables.tf", "variable \"cidr\" {}\n");

        let path = fetcher
            .fetch(
                &location(SourceKind::Registry, Some("modules/vpc")),
                None,
                workspace.path(),
                &scope(),
            )
            .await
            .unwrap();

        assert!(path.join("variables.tf").is_file());
    }

    #[test]
    fn test_parent_sub_path_rejected() {
        let root = tempdir().unwrap();
        let err = module_dir(
            root.path(),
            &location(SourceKind::Git, Some("../outside")),
            &scope(),
        )
        .unwrap_err();
        assert!(matches!(err, WrapError::Fetch(_)));
    }
}
