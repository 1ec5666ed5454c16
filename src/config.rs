//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/nodestore/nodestore.toml`
//! 3. Environment variables: `NODESTORE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::{ApplicationError, IoResultExt};
use crate::store::MAX_COLUMNS;

/// Unified configuration for nodestore.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Width of a table whose script sets neither columns nor headers
    pub table_columns: usize,
    /// Header of the single list column (empty: numbered)
    pub list_header: String,
    /// Column headers of a tree
    pub tree_headers: Vec<String>,
    /// Label unnamed columns with their 1-based number
    pub numbered_headers: bool,
    /// Print the notification log when replaying
    pub show_changes: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            table_columns: 3,
            list_header: String::new(),
            tree_headers: vec!["Name".to_string()],
            numbered_headers: true,
            show_changes: true,
        }
    }
}

/// Overlay read from a config file; only the keys it sets win.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSettings {
    table_columns: Option<usize>,
    list_header: Option<String>,
    tree_headers: Option<Vec<String>>,
    numbered_headers: Option<bool>,
    show_changes: Option<bool>,
}

/// Get the XDG config directory for nodestore.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "nodestore").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("nodestore.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).with_path(path)?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            table_columns: overlay.table_columns.unwrap_or(self.table_columns),
            list_header: overlay
                .list_header
                .clone()
                .unwrap_or_else(|| self.list_header.clone()),
            tree_headers: overlay
                .tree_headers
                .clone()
                .unwrap_or_else(|| self.tree_headers.clone()),
            numbered_headers: overlay.numbered_headers.unwrap_or(self.numbered_headers),
            show_changes: overlay.show_changes.unwrap_or(self.show_changes),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// `config_file` replaces the global file when given; it must exist.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        match config_file {
            Some(path) => {
                let raw = load_raw_settings(path)?;
                current = current.merge_with(&raw);
                debug!("config: {}", path.display());
            }
            None => {
                if let Some(global_path) = global_config_path() {
                    if global_path.exists() {
                        let raw = load_raw_settings(&global_path)?;
                        current = current.merge_with(&raw);
                        debug!("config: {}", global_path.display());
                    }
                }
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.validate()?;
        Ok(current)
    }

    /// Apply NODESTORE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("NODESTORE")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("tree_headers"),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get::<usize>("table_columns") {
            settings.table_columns = val;
        }
        if let Ok(val) = config.get_string("list_header") {
            settings.list_header = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("tree_headers") {
            settings.tree_headers = val;
        }
        if let Ok(val) = config.get_bool("numbered_headers") {
            settings.numbered_headers = val;
        }
        if let Ok(val) = config.get_bool("show_changes") {
            settings.show_changes = val;
        }

        Ok(settings)
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        if self.table_columns == 0 {
            return Err(ApplicationError::Config {
                message: "table_columns must be at least 1".to_string(),
            });
        }
        if self.table_columns > MAX_COLUMNS {
            return Err(ApplicationError::Config {
                message: format!("table_columns must be at most {}", MAX_COLUMNS),
            });
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# nodestore configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/nodestore/nodestore.toml
#   Env:    NODESTORE_* environment variables (explicit overrides)

# Width of a table whose script sets neither columns nor headers
# table_columns = 3

# Header of the single list column (empty: numbered)
# list_header = ""

# Column headers of a tree (NODESTORE_TREE_HEADERS="Name,Kind")
# tree_headers = ["Name"]

# Label unnamed columns with their 1-based number
# numbered_headers = true

# Print the notification log when replaying
# show_changes = true
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_defaults_when_serializing_then_template_keys_match() {
        let toml = Settings::default().to_toml().unwrap();
        for key in ["table_columns", "list_header", "tree_headers", "numbered_headers"] {
            assert!(toml.contains(key), "missing {key}");
            assert!(Settings::template().contains(key));
        }
    }

    #[test]
    fn given_partial_overlay_when_merging_then_unset_keys_kept() {
        let raw: RawSettings = toml::from_str("table_columns = 5").unwrap();
        let merged = Settings::default().merge_with(&raw);
        assert_eq!(merged.table_columns, 5);
        assert_eq!(merged.tree_headers, vec!["Name"]);
    }

    #[test]
    fn given_zero_columns_when_validating_then_config_error() {
        let settings = Settings {
            table_columns: 0,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ApplicationError::Config { .. })
        ));
    }

    #[test]
    fn given_columns_past_limit_when_validating_then_config_error() {
        let settings = Settings {
            table_columns: MAX_COLUMNS + 1,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ApplicationError::Config { .. })
        ));
    }
}
