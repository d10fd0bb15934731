//! Domain model for wrapper generation.

use serde::{Deserialize, Serialize};

use crate::error::{WrapError, WrapResult};

/// Fallback literal used for variables declared without a default.
pub const NO_DEFAULT: &str = "null";

/// A user-supplied module reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleReference {
    raw_source: String,
    version: Option<String>,
}

impl ModuleReference {
    /// Create a reference, rejecting an empty source.
    ///
    /// An empty or whitespace-only version is treated as absent.
    pub fn new(raw_source: impl Into<String>, version: Option<String>) -> WrapResult<Self> {
        let raw_source = raw_source.into().trim().to_string();
        if raw_source.is_empty() {
            return Err(WrapError::Input("module source is required".to_string()));
        }

        let version = version
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Ok(Self {
            raw_source,
            version,
        })
    }

    pub fn raw_source(&self) -> &str {
        &self.raw_source
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

/// How a module source is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Three-segment registry reference mapped onto a git host.
    Registry,
    /// Scheme-qualified or host-qualified repository.
    Git,
    /// Directory on the local filesystem.
    Local,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Registry => "registry",
            SourceKind::Git => "git",
            SourceKind::Local => "local",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fetchable location derived from a [`ModuleReference`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    /// URL or path handed to the fetcher.
    pub fetch_location: String,
    /// Directory inside the fetched tree holding the module.
    pub sub_path: Option<String>,
    /// Ref pinned inside the source itself (`?ref=`).
    pub pinned_ref: Option<String>,
    pub kind: SourceKind,
}

/// How a variable's fallback literal was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultKind {
    /// No `default` attribute; the fallback is [`NO_DEFAULT`].
    Absent,
    /// Statically evaluated and re-serialized.
    Literal,
    /// Non-empty object or list replaced by an empty placeholder.
    Placeholder,
    /// Expression copied byte-for-byte from the source.
    Verbatim,
}

/// A declared input variable of the wrapped module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub default_literal: String,
    pub default_kind: DefaultKind,
    /// Comment block immediately preceding the declaration, verbatim.
    pub documentation: Option<String>,
    /// 0-based declaration order.
    pub ordinal: usize,
}

/// Variables of one module in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableSet {
    variables: Vec<Variable>,
}

impl VariableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a variable, assigning the next ordinal.
    ///
    /// Returns `None` (and leaves the set untouched) if the name is taken.
    pub fn push(
        &mut self,
        name: impl Into<String>,
        default_literal: impl Into<String>,
        default_kind: DefaultKind,
        documentation: Option<String>,
    ) -> Option<usize> {
        let name = name.into();
        if self.contains(&name) {
            return None;
        }

        let ordinal = self.variables.len();
        self.variables.push(Variable {
            name,
            default_literal: default_literal.into(),
            default_kind,
            documentation,
            ordinal,
        });
        Some(ordinal)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }

    /// Variables sorted by ordinal.
    pub fn in_order(&self) -> Vec<&Variable> {
        let mut ordered: Vec<&Variable> = self.variables.iter().collect();
        ordered.sort_by_key(|v| v.ordinal);
        ordered
    }

    pub fn names(&self) -> Vec<&str> {
        self.in_order().into_iter().map(|v| v.name.as_str()).collect()
    }
}

/// Everything needed to render a wrapper's entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapperSpec {
    pub module_reference: ModuleReference,
    /// Where the module is installed from, relative to the wrapper for local sources.
    pub location: ResolvedLocation,
    pub iterable: bool,
    pub variables: VariableSet,
    pub wrapper_name: String,
}
