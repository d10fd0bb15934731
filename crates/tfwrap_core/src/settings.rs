//! Generator settings.
//!
//! Settings come from an optional YAML file; every field has a default so an
//! empty or missing file is valid.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{WrapError, WrapResult};
use crate::format::FormatterChoice;
use crate::literal::is_identifier;

/// File name looked up in the working directory when no path is given.
pub const SETTINGS_FILE: &str = ".tfwrap.yaml";

/// Tunables for the whole pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorSettings {
    /// Host used for registry-style and host-less references.
    pub default_host: String,
    /// Declaration file expected in the fetched module.
    pub declaration_file: String,
    /// Read variables from every `*.tf` file instead of one file.
    pub scan_all_files: bool,
    /// Label of the generated `module` block.
    pub module_label: String,
    /// Key of the configuration collection driving `for_each`.
    pub for_each_key: String,
    pub formatter: FormatterChoice,
    pub git_program: String,
    /// Fetch timeout in seconds (0 = no timeout).
    pub fetch_timeout_secs: u64,
    /// Keep non-empty object/list defaults verbatim instead of placeholders.
    pub preserve_aggregate_defaults: bool,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            default_host: "github.com".to_string(),
            declaration_file: "variables.tf".to_string(),
            scan_all_files: false,
            module_label: "this".to_string(),
            for_each_key: "instances".to_string(),
            formatter: FormatterChoice::Auto,
            git_program: "git".to_string(),
            fetch_timeout_secs: 300,
            preserve_aggregate_defaults: false,
        }
    }
}

impl GeneratorSettings {
    /// Load settings from a YAML file.
    pub fn from_file(path: &Path) -> WrapResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            WrapError::Settings(format!("cannot read {}: {}", path.display(), e))
        })?;
        let settings: GeneratorSettings = if content.trim().is_empty() {
            GeneratorSettings::default()
        } else {
            serde_yaml::from_str(&content)?
        };
        settings.validate()?;
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Load [`SETTINGS_FILE`] from `dir` if present, else defaults.
    pub fn discover(dir: &Path) -> WrapResult<Self> {
        let candidate = dir.join(SETTINGS_FILE);
        if candidate.is_file() {
            Self::from_file(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> WrapResult<()> {
        if self.default_host.trim().is_empty() || self.default_host.contains('/') {
            return Err(WrapError::Settings(format!(
                "default_host must be a bare host name, got '{}'",
                self.default_host
            )));
        }
        if self.declaration_file.trim().is_empty() {
            return Err(WrapError::Settings(
                "declaration_file must not be empty".to_string(),
            ));
        }
        for (field, value) in [
            ("module_label", &self.module_label),
            ("for_each_key", &self.for_each_key),
        ] {
            if !is_identifier(value) {
                return Err(WrapError::Settings(format!(
                    "{} must be an identifier, got '{}'",
                    field, value
                )));
            }
        }
        if self.git_program.trim().is_empty() {
            return Err(WrapError::Settings("git_program must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let settings = GeneratorSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.declaration_file, "variables.tf");
        assert_eq!(settings.module_label, "this");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        fs::write(&path, "for_each_key: items\nformatter: tofu\n").unwrap();

        let settings = GeneratorSettings::from_file(&path).unwrap();
        assert_eq!(settings.for_each_key, "items");
        assert_eq!(settings.formatter, FormatterChoice::Tofu);
        assert_eq!(settings.default_host, "github.com");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        fs::write(&path, "module_lable: x\n").unwrap();

        assert!(GeneratorSettings::from_file(&path).is_err());
    }

    #[test]
    fn test_invalid_label_rejected() {
        let settings = GeneratorSettings {
            module_label: "not valid".to_string(),
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(WrapError::Settings(_))));
    }

    #[test]
    fn test_discover_without_file() {
        let dir = tempdir().unwrap();
        let settings = GeneratorSettings::discover(dir.path()).unwrap();
        assert_eq!(settings, GeneratorSettings::default());
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        let settings = GeneratorSettings {
            scan_all_files: true,
            fetch_timeout_secs: 0,
            ..Default::default()
        };
        fs::write(&path, serde_yaml::to_string(&settings).unwrap()).unwrap();

        assert_eq!(GeneratorSettings::discover(dir.path()).unwrap(), settings);
    }
}
