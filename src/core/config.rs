//! Configuration management with layered hierarchy

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::Project;

/// Unit of measure used when none is configured
pub const DEFAULT_UNIT: &str = "pcs";

/// Depth limit used when none is configured
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Forge configuration with layered hierarchy
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Company code used when `--company` is not given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    /// Unit of measure for new BOM lines
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_unit: Option<String>,

    /// Maximum BOM depth followed by traversals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,

    /// Default output format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_format: Option<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load(project: Option<&Project>) -> Self {
        // 1. Built-in defaults (already in Default impl)
        // 2. Global user config, 3. project config (.forge/config.yaml)
        let project_path = project.map(Project::config_path);
        let mut config =
            Self::load_layers(Self::global_config_path().as_deref(), project_path.as_deref());

        // 4. Environment variables
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Merge the file layers that exist, later layers taking precedence
    pub fn load_layers(global: Option<&Path>, project: Option<&Path>) -> Self {
        let mut config = Config::default();
        for path in [global, project].into_iter().flatten() {
            if let Some(layer) = Self::read_file(path) {
                config.merge(layer);
            }
        }
        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                None
            }
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(company) = lookup("FORGE_COMPANY") {
            self.company = Some(company);
        }
        if let Some(unit) = lookup("FORGE_DEFAULT_UNIT") {
            self.default_unit = Some(unit);
        }
        if let Some(depth) = lookup("FORGE_MAX_DEPTH").and_then(|d| d.parse().ok()) {
            self.max_depth = Some(depth);
        }
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "forge")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.company.is_some() {
            self.company = other.company;
        }
        if other.default_unit.is_some() {
            self.default_unit = other.default_unit;
        }
        if other.max_depth.is_some() {
            self.max_depth = other.max_depth;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
    }

    /// Unit of measure for new BOM lines
    pub fn default_unit(&self) -> &str {
        self.default_unit.as_deref().unwrap_or(DEFAULT_UNIT)
    }

    /// Maximum BOM depth followed by traversals
    pub fn max_depth(&self) -> usize {
        self.max_depth.unwrap_or(DEFAULT_MAX_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.default_unit(), "pcs");
        assert_eq!(config.max_depth(), 64);
        assert!(config.company.is_none());
    }

    #[test]
    fn test_project_layer_overrides_global() {
        let tmp = tempdir().unwrap();
        let global = tmp.path().join("global.yaml");
        let project = tmp.path().join("project.yaml");
        std::fs::write(&global, "company: ACME\ndefault_unit: kg\n").unwrap();
        std::fs::write(&project, "company: BIKE\nmax_depth: 8\n").unwrap();

        let config = Config::load_layers(Some(&global), Some(&project));
        assert_eq!(config.company.as_deref(), Some("BIKE"));
        assert_eq!(config.default_unit(), "kg");
        assert_eq!(config.max_depth(), 8);
    }

    #[test]
    fn test_missing_and_invalid_layers_are_skipped() {
        let tmp = tempdir().unwrap();
        let broken = tmp.path().join("broken.yaml");
        std::fs::write(&broken, "max_depth: [not, a, number]\n").unwrap();

        let config = Config::load_layers(Some(&tmp.path().join("absent.yaml")), Some(&broken));
        assert_eq!(config.max_depth(), DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_env_overrides_files() {
        let mut config = Config {
            company: Some("ACME".to_string()),
            ..Default::default()
        };
        config.apply_env(|key| match key {
            "FORGE_COMPANY" => Some("ENV".to_string()),
            "FORGE_MAX_DEPTH" => Some("12".to_string()),
            _ => None,
        });
        assert_eq!(config.company.as_deref(), Some("ENV"));
        assert_eq!(config.max_depth(), 12);
        assert_eq!(config.default_unit(), "pcs");
    }
}
