//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/nestkit/nestkit.toml`
//! 3. Local config: `<dir>/.nestkit.toml`
//! 4. Environment variables: `NESTKIT_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::services::{LoaderService, DEFAULT_ORDERED_MARKER};
use crate::application::ApplicationError;
use crate::domain::{Flattener, DEFAULT_SEPARATOR};

/// Name of the local config file.
pub const LOCAL_CONFIG_FILE: &str = ".nestkit.toml";

/// Unified configuration for nestkit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Separator between path segments of flattened keys (default: `_`)
    pub separator: String,
    /// Group attribute marking ordered groups (default: `_iterable`)
    pub ordered_marker: String,
    /// Join nested names into flattened keys (default: true)
    pub keep_nested_name: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            ordered_marker: DEFAULT_ORDERED_MARKER.to_string(),
            keep_nested_name: true,
        }
    }
}

/// Raw settings for intermediate parsing.
///
/// Every field is optional so a layer only overrides what it specifies.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub separator: Option<String>,
    pub ordered_marker: Option<String>,
    pub keep_nested_name: Option<bool>,
}

/// Get the XDG config directory for nestkit.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "nestkit").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("nestkit.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(LOCAL_CONFIG_FILE)
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            separator: overlay
                .separator
                .clone()
                .unwrap_or_else(|| self.separator.clone()),
            ordered_marker: overlay
                .ordered_marker
                .clone()
                .unwrap_or_else(|| self.ordered_marker.clone()),
            keep_nested_name: overlay.keep_nested_name.unwrap_or(self.keep_nested_name),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `dir` - Optional directory holding a local `.nestkit.toml`
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/nestkit/nestkit.toml`
    /// 3. Local config: `<dir>/.nestkit.toml`
    /// 4. Environment variables: `NESTKIT_*` prefix
    pub fn load(dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("load: global config {}", global_path.display());
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(dir) = dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                debug!("load: local config {}", local_path.display());
                current = current.merge_with(&load_raw_settings(&local_path)?);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.validate()?;
        Ok(current)
    }

    /// Apply NESTKIT_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("NESTKIT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("separator") {
            settings.separator = val;
        }
        if let Ok(val) = config.get_string("ordered_marker") {
            settings.ordered_marker = val;
        }
        match config.get_bool("keep_nested_name") {
            Ok(val) => settings.keep_nested_name = val,
            Err(ConfigError::NotFound(_)) => {}
            Err(e) => return Err(config_err(e)),
        }

        Ok(settings)
    }

    /// Reject settings that cannot produce well-formed keys or markers.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        if self.separator.is_empty() {
            return Err(ApplicationError::Config {
                message: "separator must not be empty".to_string(),
            });
        }
        if self.ordered_marker.is_empty() {
            return Err(ApplicationError::Config {
                message: "ordered_marker must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn flattener(&self) -> Flattener {
        Flattener::new(self.separator.clone(), self.keep_nested_name)
    }

    pub fn loader(&self) -> LoaderService {
        LoaderService::new(self.ordered_marker.clone())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# nestkit configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/nestkit/nestkit.toml
#   Local:  <dir>/.nestkit.toml
#   Env:    NESTKIT_* environment variables

# Separator between path segments of flattened keys
# separator = "_"

# Group attribute that marks a group as an ordered sequence
# ordered_marker = "_iterable"

# Join nested names into flattened keys (false keeps only the leaf name)
# keep_nested_name = true
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
