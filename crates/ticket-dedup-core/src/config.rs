//! Layered run configuration.
//!
//! Precedence (highest wins):
//! 1. explicit overrides (CLI flags and their env fallbacks)
//! 2. project config: `./.ticket-dedup.toml`
//! 3. user config: `<config_dir>/ticket-dedup/config.toml`
//! 4. built-in defaults
//!
//! Missing config files are not an error; unreadable or malformed ones are.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DedupError;
use crate::pool;
use crate::select::TimestampOrder;

/// File name of the per-directory config.
pub const PROJECT_CONFIG_FILE: &str = ".ticket-dedup.toml";

/// Export root used when nothing else is configured.
pub const DEFAULT_EXPORT_PATH: &str = "export";

/// One configuration layer. Every key is optional so layers can be merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigLayer {
    #[serde(default)]
    pub export_path: Option<PathBuf>,
    #[serde(default)]
    pub jobs: Option<usize>,
    #[serde(default)]
    pub timestamp_order: Option<TimestampOrder>,
    #[serde(default)]
    pub strict: Option<bool>,
}

impl ConfigLayer {
    /// Merge `higher` on top of `self`; keys set in `higher` win.
    #[must_use]
    pub fn overlay(self, higher: Self) -> Self {
        Self {
            export_path: higher.export_path.or(self.export_path),
            jobs: higher.jobs.or(self.jobs),
            timestamp_order: higher.timestamp_order.or(self.timestamp_order),
            strict: higher.strict.or(self.strict),
        }
    }
}

/// Fully resolved settings for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub export_path: PathBuf,
    pub jobs: usize,
    pub timestamp_order: TimestampOrder,
    pub strict: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_layer(ConfigLayer::default())
    }
}

impl Settings {
    /// Fill unset keys of `layer` with defaults.
    #[must_use]
    pub fn from_layer(layer: ConfigLayer) -> Self {
        Self {
            export_path: layer
                .export_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_PATH)),
            jobs: layer
                .jobs
                .filter(|&n| n > 0)
                .unwrap_or_else(pool::default_jobs),
            timestamp_order: layer.timestamp_order.unwrap_or_default(),
            strict: layer.strict.unwrap_or(false),
        }
    }
}

/// Load a single config file; a missing file yields an empty layer.
///
/// # Errors
///
/// Returns [`DedupError::Config`] if the file exists but cannot be read or
/// parsed.
pub fn load_config_file(path: &Path) -> Result<ConfigLayer, DedupError> {
    if !path.exists() {
        return Ok(ConfigLayer::default());
    }

    let content = std::fs::read_to_string(path).map_err(|err| DedupError::Config {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;

    toml::from_str::<ConfigLayer>(&content).map_err(|err| DedupError::Config {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

/// Load `.ticket-dedup.toml` from `project_dir`.
///
/// # Errors
///
/// See [`load_config_file`].
pub fn load_project_config(project_dir: &Path) -> Result<ConfigLayer, DedupError> {
    load_config_file(&project_dir.join(PROJECT_CONFIG_FILE))
}

/// Load the per-user config, if the platform has a config directory.
///
/// # Errors
///
/// See [`load_config_file`].
pub fn load_user_config() -> Result<ConfigLayer, DedupError> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(ConfigLayer::default());
    };
    load_config_file(&config_dir.join("ticket-dedup/config.toml"))
}

/// Resolve settings from user config, project config, and `overrides`.
///
/// # Errors
///
/// Returns [`DedupError::Config`] if any present config file is malformed.
pub fn resolve(project_dir: &Path, overrides: ConfigLayer) -> Result<Settings, DedupError> {
    let layer = load_user_config()?
        .overlay(load_project_config(project_dir)?)
        .overlay(overrides);
    Ok(Settings::from_layer(layer))
}
