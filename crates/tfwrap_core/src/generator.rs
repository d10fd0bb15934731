//! Wrapper entry-point generation.
//!
//! Rendering is a pure function of the [`WrapperSpec`] and the options:
//! variables are emitted in ordinal order and nothing depends on hash order.

use tracing::debug;

use crate::literal::{attribute_path, quote_string};
use crate::model::{ResolvedLocation, SourceKind, Variable, WrapperSpec};
use crate::settings::GeneratorSettings;
use crate::source::is_scp_like;

/// Marker written in the header when no version is given.
pub const UNCONSTRAINED: &str = "latest (unconstrained)";

/// Rendering options taken from the settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Label of the generated `module` block.
    pub module_label: String,
    /// Configuration key holding the per-instance map when iterating.
    pub for_each_key: String,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            module_label: "this".to_string(),
            for_each_key: "instances".to_string(),
        }
    }
}

impl GeneratorOptions {
    pub fn from_settings(settings: &GeneratorSettings) -> Self {
        Self {
            module_label: settings.module_label.clone(),
            for_each_key: settings.for_each_key.clone(),
        }
    }
}

/// Text produced for a wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedWrapper {
    /// Content of the entry-point file.
    pub entry_point: String,
}

/// Renders the entry point of a wrapper module.
#[derive(Debug, Clone, Default)]
pub struct WrapperGenerator {
    options: GeneratorOptions,
}

impl WrapperGenerator {
    pub fn new(options: GeneratorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    pub fn generate(&self, spec: &WrapperSpec) -> GeneratedWrapper {
        let reference = &spec.module_reference;
        let version = reference.version();
        let kind = spec.location.kind;

        let mut out = String::new();
        out.push_str(&format!(
            "# Wrapper module {} generated by tfwrap.\n",
            quote_string(&spec.wrapper_name)
        ));
        out.push_str(&format!("# Source: {}\n", reference.raw_source()));
        out.push_str(&format!("# Version: {}\n\n", version.unwrap_or(UNCONSTRAINED)));

        out.push_str(&format!("module {} {{\n", quote_string(&self.options.module_label)));
        out.push_str(&format!(
            "  source = {}\n",
            quote_string(&module_source(reference.raw_source(), &spec.location, version))
        ));
        if let (SourceKind::Registry, Some(version)) = (kind, version) {
            out.push_str(&format!("  version = {}\n", quote_string(version)));
        }

        let prefix = if spec.iterable {
            out.push_str(&format!(
                "  for_each = try({}, {{}})\n",
                attribute_path("local.config", &self.options.for_each_key)
            ));
            "each.value"
        } else {
            "local.config"
        };

        let variables = spec.variables.in_order();
        if !variables.is_empty() {
            out.push('\n');
        }
        for (index, variable) in variables.iter().enumerate() {
            render_variable(&mut out, variable, prefix, index == 0);
        }

        out.push_str("}\n");

        debug!(
            "Rendered {} variables for wrapper {}",
            variables.len(),
            spec.wrapper_name
        );

        GeneratedWrapper { entry_point: out }
    }
}

/// The `source` argument Terraform needs to install the wrapped module.
///
/// Registry references are kept as written and pinned by `version`. Git
/// sources use the resolved location with a `git::` getter and `?ref=`.
/// Local sources use the location as given, which must already be relative
/// to the wrapper directory.
fn module_source(raw_source: &str, location: &ResolvedLocation, version: Option<&str>) -> String {
    match location.kind {
        SourceKind::Registry => raw_source.to_string(),
        SourceKind::Local => match location.sub_path.as_deref() {
            Some(sub) => format!("{}/{}", location.fetch_location.trim_end_matches('/'), sub),
            None => location.fetch_location.clone(),
        },
        SourceKind::Git => {
            let mut source = if is_scp_like(&location.fetch_location) {
                location.fetch_location.clone()
            } else {
                format!("git::{}", location.fetch_location)
            };
            if let Some(sub) = location.sub_path.as_deref() {
                source.push_str("//");
                source.push_str(sub);
            }
            if let Some(git_ref) = version.or(location.pinned_ref.as_deref()) {
                source.push_str("?ref=");
                source.push_str(git_ref);
            }
            source
        }
    }
}

fn render_variable(out: &mut String, variable: &Variable, prefix: &str, first: bool) {
    if let Some(doc) = &variable.documentation {
        if !first {
            out.push('\n');
        }
        for line in doc.lines() {
            if line.trim().is_empty() {
                out.push('\n');
            } else {
                out.push_str(&format!("  {}\n", line));
            }
        }
    }

    let lookup = attribute_path(prefix, &variable.name);
    if variable.default_literal.contains('\n') {
        // A heredoc terminator must end its line.
        out.push_str(&format!(
            "  {} = try({}, {}\n  )\n",
            variable.name, lookup, variable.default_literal
        ));
    } else {
        out.push_str(&format!(
            "  {} = try({}, {})\n",
            variable.name, lookup, variable.default_literal
        ));
    }
}
