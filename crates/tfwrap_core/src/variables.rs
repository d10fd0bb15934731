//! Variable discovery.
//!
//! Reads a module's declaration file(s) and yields its input variables in
//! declaration order, with a fallback literal and any documentation comment
//! that sits directly above each `variable` block.

use std::fs;
use std::path::{Path, PathBuf};

use hcl::eval::{Context, Evaluate};
use hcl_edit::structure::{Attribute, Block, BlockLabel};
use hcl_edit::Span;
use tracing::{debug, info, warn};

use crate::error::{WrapError, WrapResult};
use crate::literal::quote_string;
use crate::model::{DefaultKind, VariableSet, NO_DEFAULT};
use crate::settings::GeneratorSettings;

/// Which files of a module declare its variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclarationScope {
    /// A single named file, usually `variables.tf`.
    File(String),
    /// Every `*.tf` file, in file-name order.
    AllFiles,
}

impl DeclarationScope {
    pub fn from_settings(settings: &GeneratorSettings) -> Self {
        if settings.scan_all_files {
            DeclarationScope::AllFiles
        } else {
            DeclarationScope::File(settings.declaration_file.clone())
        }
    }

    /// Declaration files under `dir`, in the order they are read.
    pub fn files(&self, dir: &Path) -> WrapResult<Vec<PathBuf>> {
        match self {
            DeclarationScope::File(name) => Ok(vec![dir.join(name)]),
            DeclarationScope::AllFiles => {
                let pattern = format!(
                    "{}/*.tf",
                    glob::Pattern::escape(&dir.to_string_lossy())
                );
                let entries = glob::glob(&pattern)
                    .map_err(|e| WrapError::parse(dir, format!("bad file pattern: {}", e)))?;
                let mut files: Vec<PathBuf> = entries
                    .filter_map(Result::ok)
                    .filter(|p| p.is_file())
                    .collect();
                files.sort();
                Ok(files)
            }
        }
    }

    /// Whether `dir` contains what this scope expects.
    pub fn is_present(&self, dir: &Path) -> bool {
        match self {
            DeclarationScope::File(name) => dir.join(name).is_file(),
            DeclarationScope::AllFiles => self.files(dir).map(|f| !f.is_empty()).unwrap_or(false),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            DeclarationScope::File(name) => name.clone(),
            DeclarationScope::AllFiles => "*.tf".to_string(),
        }
    }
}

/// Extracts declared variables from HCL source.
#[derive(Debug, Clone, Default)]
pub struct VariableExtractor {
    preserve_aggregates: bool,
}

impl VariableExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep non-empty object/list defaults as written instead of `{}`/`[]`.
    pub fn preserve_aggregates(mut self, enabled: bool) -> Self {
        self.preserve_aggregates = enabled;
        self
    }

    /// Extract variables from a single declaration file.
    pub fn extract(&self, path: &Path) -> WrapResult<VariableSet> {
        let mut variables = VariableSet::new();
        self.extract_into(path, &mut variables)?;
        Ok(variables)
    }

    /// Extract variables from every file in `scope` under `dir`.
    ///
    /// Ordinals continue across files in the order the scope lists them.
    pub fn extract_scope(&self, dir: &Path, scope: &DeclarationScope) -> WrapResult<VariableSet> {
        let mut variables = VariableSet::new();
        for file in scope.files(dir)? {
            self.extract_into(&file, &mut variables)?;
        }
        info!(
            "Discovered {} variables in {} ({})",
            variables.len(),
            dir.display(),
            scope.describe()
        );
        Ok(variables)
    }

    /// Extract variables from in-memory source; `origin` names it in errors.
    pub fn extract_str(&self, source: &str, origin: &Path) -> WrapResult<VariableSet> {
        let mut variables = VariableSet::new();
        self.collect(source, origin, &mut variables)?;
        Ok(variables)
    }

    fn extract_into(&self, path: &Path, variables: &mut VariableSet) -> WrapResult<()> {
        let source = fs::read_to_string(path)
            .map_err(|e| WrapError::parse(path, format!("cannot read file: {}", e)))?;
        self.collect(&source, path, variables)
    }

    fn collect(&self, source: &str, origin: &Path, variables: &mut VariableSet) -> WrapResult<()> {
        let body = hcl_edit::parser::parse_body(source)
            .map_err(|e| WrapError::parse(origin, e.to_string()))?;
        let lines: Vec<&str> = source.lines().collect();

        for block in body.iter().filter_map(|structure| structure.as_block()) {
            if block.ident.as_str() != "variable" {
                continue;
            }

            let name = match block.labels.as_slice() {
                [label] => label_text(label),
                labels => {
                    return Err(WrapError::parse(
                        origin,
                        format!(
                            "variable block must have exactly one label, found {}",
                            labels.len()
                        ),
                    ))
                }
            };

            if variables.contains(&name) {
                return Err(WrapError::parse(
                    origin,
                    format!("duplicate variable declaration '{}'", name),
                ));
            }

            let (literal, kind) = match default_attribute(block) {
                Some(attr) => self.default_literal(source, attr, origin, &name)?,
                None => (NO_DEFAULT.to_string(), DefaultKind::Absent),
            };

            let documentation = block_start_line(source, &lines, block, &name)
                .and_then(|line| leading_comments(&lines, line));

            debug!("Variable {} -> {} ({:?})", name, literal, kind);
            variables.push(name, literal, kind, documentation);
        }

        Ok(())
    }

    fn default_literal(
        &self,
        source: &str,
        attr: &Attribute,
        origin: &Path,
        name: &str,
    ) -> WrapResult<(String, DefaultKind)> {
        let text = attr
            .value
            .span()
            .and_then(|range| source.get(range))
            .map(str::trim)
            .ok_or_else(|| {
                WrapError::parse(origin, format!("cannot locate default of variable '{}'", name))
            })?;

        let Some(value) = evaluate_literal(text) else {
            debug!("Default of {} needs context, keeping it verbatim", name);
            return Ok((text.to_string(), DefaultKind::Verbatim));
        };

        let rendered = match value {
            hcl::Value::Null => (NO_DEFAULT.to_string(), DefaultKind::Literal),
            hcl::Value::Bool(b) => (b.to_string(), DefaultKind::Literal),
            hcl::Value::Number(n) => (n.to_string(), DefaultKind::Literal),
            hcl::Value::String(s) => (quote_string(&s), DefaultKind::Literal),
            hcl::Value::Array(items) if items.is_empty() => {
                ("[]".to_string(), DefaultKind::Literal)
            }
            hcl::Value::Object(map) if map.is_empty() => ("{}".to_string(), DefaultKind::Literal),
            hcl::Value::Array(_) | hcl::Value::Object(_) if self.preserve_aggregates => {
                (text.to_string(), DefaultKind::Verbatim)
            }
            hcl::Value::Array(_) => {
                warn!("Default of variable '{}' replaced by an empty list placeholder", name);
                ("[]".to_string(), DefaultKind::Placeholder)
            }
            hcl::Value::Object(_) => {
                warn!("Default of variable '{}' replaced by an empty object placeholder", name);
                ("{}".to_string(), DefaultKind::Placeholder)
            }
        };

        Ok(rendered)
    }
}

fn label_text(label: &BlockLabel) -> String {
    match label {
        BlockLabel::Ident(ident) => ident.as_str().to_string(),
        BlockLabel::String(value) => value.as_str().to_string(),
    }
}

fn default_attribute(block: &Block) -> Option<&Attribute> {
    block
        .body
        .iter()
        .filter_map(|structure| structure.as_attribute())
        .find(|attr| attr.key.as_str() == "default")
}

/// Evaluate `expr` with no variables or functions in scope.
fn evaluate_literal(expr: &str) -> Option<hcl::Value> {
    let body = hcl::parse(&format!("value = {}\n", expr)).ok()?;
    let attr = body.attributes().next()?;
    attr.expr().evaluate(&Context::new()).ok()
}

/// 0-based line of the block's `variable` keyword.
fn block_start_line(source: &str, lines: &[&str], block: &Block, name: &str) -> Option<usize> {
    let hint = block
        .ident
        .span()
        .or_else(|| block.span())
        .and_then(|range| source.get(..range.start))
        .map(|prefix| prefix.matches('\n').count());

    let is_header = |line: &str| {
        let Some(rest) = line.trim_start().strip_prefix("variable") else {
            return false;
        };
        let rest = rest.trim_start();
        let rest = rest.strip_prefix('"').unwrap_or(rest);
        rest.strip_prefix(name)
            .is_some_and(|after| after.starts_with(['"', ' ', '\t', '{']))
    };

    match hint {
        Some(line) if lines.get(line).is_some_and(|l| is_header(*l)) => Some(line),
        Some(line) => (line..lines.len()).find(|&i| is_header(lines[i])),
        None => lines.iter().position(|l| is_header(*l)),
    }
}

fn is_line_comment(trimmed: &str) -> bool {
    trimmed.starts_with('#') || trimmed.starts_with("//")
}

/// Comment run directly above `start_line`.
///
/// Blank lines are kept only when more comments sit above them; blank lines
/// between the run and the block are dropped.
fn leading_comments(lines: &[&str], start_line: usize) -> Option<String> {
    let mut collected: Vec<&str> = Vec::new();
    let mut pending_blank: Vec<&str> = Vec::new();
    let mut idx = start_line.min(lines.len());

    while idx > 0 {
        let line = lines[idx - 1];
        let trimmed = line.trim();

        if trimmed.is_empty() {
            pending_blank.push(line);
            idx -= 1;
            continue;
        }

        if is_line_comment(trimmed) {
            collected.append(&mut pending_blank);
            collected.push(line);
            idx -= 1;
            continue;
        }

        if trimmed.ends_with("*/") {
            let opener = (0..idx)
                .rev()
                .find(|&i| lines[i].contains("/*"));
            match opener {
                Some(open) if lines[open].trim_start().starts_with("/*") => {
                    collected.append(&mut pending_blank);
                    collected.extend(lines[open..idx].iter().rev());
                    idx = open;
                    continue;
                }
                _ => break,
            }
        }

        break;
    }

    collected.reverse();
    while collected.last().is_some_and(|l| l.trim().is_empty()) {
        collected.pop();
    }

    if collected.is_empty() {
        None
    } else {
        let trimmed: Vec<&str> = collected.iter().map(|l| l.trim_end()).collect();
        Some(trimmed.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(source: &str) -> VariableSet {
        VariableExtractor::new()
            .extract_str(source, Path::new("variables.tf"))
            .unwrap()
    }

    #[test]
    fn test_declaration_order_not_alphabetical() {
        let vars = extract(
            r#"
variable "zone" {}
variable "name" {}
variable "associate" {}
"#,
        );

        assert_eq!(vars.names(), vec!["zone", "name", "associate"]);
        let ordinals: Vec<usize> = vars.iter().map(|v| v.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
    }

    #[test]
    fn test_literal_defaults() {
        let vars = extract(
            r#"
variable "count_hint" {
  default = 5
}
variable "ratio" {
  default = 1.5
}
variable "enabled" {
  default = true
}
variable "cidr" {
  type    = string
  default = "10.0.0.0/16"
}
variable "nothing" {
  default = null
}
variable "negative" {
  default = -3
}
"#,
        );

        assert_eq!(vars.get("count_hint").unwrap().default_literal, "5");
        assert_eq!(vars.get("ratio").unwrap().default_literal, "1.5");
        assert_eq!(vars.get("enabled").unwrap().default_literal, "true");
        assert_eq!(vars.get("cidr").unwrap().default_literal, "\"10.0.0.0/16\"");
        assert_eq!(vars.get("nothing").unwrap().default_literal, "null");
        assert_eq!(vars.get("negative").unwrap().default_literal, "-3");
        assert!(vars
            .iter()
            .all(|v| v.default_kind == DefaultKind::Literal));
    }

    #[test]
    fn test_missing_default_uses_sentinel() {
        let vars = extract("variable \"name\" {\n  type = string\n}\n");
        let var = vars.get("name").unwrap();
        assert_eq!(var.default_literal, NO_DEFAULT);
        assert_eq!(var.default_kind, DefaultKind::Absent);
    }

    #[test]
    fn test_aggregate_defaults_become_placeholders() {
        let vars = extract(
            r#"
variable "tags" {
  default = { Owner = "team" }
}
variable "zones" {
  default = ["a", "b"]
}
variable "empty" {
  default = []
}
"#,
        );

        let tags = vars.get("tags").unwrap();
        assert_eq!(tags.default_literal, "{}");
        assert_eq!(tags.default_kind, DefaultKind::Placeholder);

        let zones = vars.get("zones").unwrap();
        assert_eq!(zones.default_literal, "[]");
        assert_eq!(zones.default_kind, DefaultKind::Placeholder);

        assert_eq!(vars.get("empty").unwrap().default_kind, DefaultKind::Literal);
    }

    #[test]
    fn test_aggregate_defaults_preserved_on_request() {
        let vars = VariableExtractor::new()
            .preserve_aggregates(true)
            .extract_str(
                "variable \"zones\" {\n  default = [\"a\", \"b\"]\n}\n",
                Path::new("variables.tf"),
            )
            .unwrap();

        let zones = vars.get("zones").unwrap();
        assert_eq!(zones.default_literal, "[\"a\", \"b\"]");
        assert_eq!(zones.default_kind, DefaultKind::Verbatim);
    }

    #[test]
    fn test_context_dependent_default_is_verbatim() {
        let vars = extract(
            r#"
variable "name" {
  default = "${local.prefix}-vpc"
}
variable "az" {
  default = var.region
}
"#,
        );

        let name = vars.get("name").unwrap();
        assert_eq!(name.default_literal, "\"${local.prefix}-vpc\"");
        assert_eq!(name.default_kind, DefaultKind::Verbatim);
        assert_eq!(vars.get("az").unwrap().default_literal, "var.region");
    }

    #[test]
    fn test_adjacent_comments_become_documentation() {
        let vars = extract(
            r#"variable "first" {}

# Name of the VPC.
# Used as a prefix for all resources.
variable "name" {
  default = ""
}
"#,
        );

        assert_eq!(
            vars.get("name").unwrap().documentation.as_deref(),
            Some("# Name of the VPC.\n# Used as a prefix for all resources.")
        );
        assert_eq!(vars.get("first").unwrap().documentation, None);
    }

    #[test]
    fn test_blank_line_inside_comment_run_is_kept() {
        let vars = extract(
            r#"# Section header

// Detail line

variable "name" {}
"#,
        );

        assert_eq!(
            vars.get("name").unwrap().documentation.as_deref(),
            Some("# Section header\n\n// Detail line")
        );
    }

    #[test]
    fn test_comment_run_stops_at_code() {
        let vars = extract(
            r#"variable "a" {
  default = 1
}
# Belongs to b
variable "b" {}
"#,
        );

        assert_eq!(
            vars.get("b").unwrap().documentation.as_deref(),
            Some("# Belongs to b")
        );
        assert_eq!(vars.get("a").unwrap().documentation, None);
    }

    #[test]
    fn test_block_comment_documentation() {
        let vars = extract(
            r#"/*
 Multi-line
 description
*/
variable "name" {}
"#,
        );

        assert_eq!(
            vars.get("name").unwrap().documentation.as_deref(),
            Some("/*\n Multi-line\n description\n*/")
        );
    }

    #[test]
    fn test_documentation_drops_trailing_whitespace() {
        let vars = extract(concat!(
            "/* Subnet layout.   \n",
            "   Private first. \t\n",
            "*/\n",
            "variable \"subnets\" {}\n",
            "# Zone.  \n",
            "variable \"zone\" {}\n",
        ));

        assert_eq!(
            vars.get("subnets").unwrap().documentation.as_deref(),
            Some("/* Subnet layout.\n   Private first.\n*/")
        );
        assert_eq!(vars.get("zone").unwrap().documentation.as_deref(), Some("# Zone."));
    }

    #[test]
    fn test_non_variable_blocks_ignored() {
        let vars = extract(
            r#"
locals {
  prefix = "x"
}
variable "name" {}
output "id" {
  value = 1
}
"#,
        );

        assert_eq!(vars.names(), vec!["name"]);
    }

    #[test]
    fn test_duplicate_variable_is_parse_error() {
        let err = VariableExtractor::new()
            .extract_str(
                "variable \"a\" {}\nvariable \"a\" {}\n",
                Path::new("variables.tf"),
            )
            .unwrap_err();
        assert!(matches!(err, WrapError::Parse { .. }));
    }

    #[test]
    fn test_invalid_hcl_is_parse_error() {
        let err = VariableExtractor::new()
            .extract_str("variable \"a\" {\n", Path::new("variables.tf"))
            .unwrap_err();
        assert!(matches!(err, WrapError::Parse { .. }));
    }

    #[test]
    fn test_unreadable_file_is_parse_error() {
        let err = VariableExtractor::new()
            .extract(Path::new("/nonexistent/tfwrap/variables.tf"))
            .unwrap_err();
        assert!(matches!(err, WrapError::Parse { .. }));
    }

    #[test]
    fn test_leading_comments_helper() {
        let lines = vec!["}", "", "# doc", "", "variable \"x\" {}"];
        assert_eq!(leading_comments(&lines, 4).as_deref(), Some("# doc"));
        assert_eq!(leading_comments(&lines, 0), None);
    }
}
