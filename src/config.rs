//! Configuration loading for Reprise.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.reprise/config.toml`)
//! 3. User config (`~/.reprise/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The system runs with sensible defaults
//! when no config exists.

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, ReviewError};

/// Main configuration struct for Reprise.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Review record storage.
    pub storage: StorageConfig,
    /// Points awarded for reviews.
    pub points: PointsConfig,
    /// Node catalog.
    pub catalog: CatalogConfig,
    /// Review history log.
    pub history: HistoryConfig,
}

/// Review record storage configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for pair documents. Defaults to `<reprise_home>/data`.
    pub data_dir: Option<PathBuf>,
}

/// Points configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PointsConfig {
    /// Points for each successful review.
    pub per_review: u32,
    /// Extra points for an easy review.
    pub easy_bonus: u32,
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            per_review: 10,
            easy_bonus: 5,
        }
    }
}

/// Node catalog configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    /// TOML file of `[[node]]` tables.
    pub path: Option<PathBuf>,
}

/// Review history configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    /// Whether review events are appended to `<reprise_home>/history.log`.
    pub enabled: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// One config file as written, before defaults are filled in.
///
/// Every field is optional so that a layer setting a value equal to the
/// default still overrides the layers below it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConfigLayer {
    storage: StorageLayer,
    points: PointsLayer,
    catalog: CatalogConfig,
    history: HistoryLayer,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct StorageLayer {
    data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct PointsLayer {
    per_review: Option<u32>,
    easy_bonus: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct HistoryLayer {
    enabled: Option<bool>,
}

impl Config {
    /// Load configuration with full precedence chain.
    ///
    /// Precedence (highest to lowest):
    /// 1. Environment variables
    /// 2. Project config (`.reprise/config.toml` in cwd)
    /// 3. User config (`~/.reprise/config.toml`)
    /// 4. Defaults
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_layer) = Self::load_user_layer() {
                    config = config.merge(user_layer);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_layer) = Self::load_user_layer() {
            config = config.merge(user_layer);
        }

        if let Some(project_layer) = Self::load_project_layer(cwd) {
            config = config.merge(project_layer);
        }

        config.apply_env_overrides();

        config
    }

    /// Load the user layer from `<reprise_home>/config.toml`.
    fn load_user_layer() -> Option<ConfigLayer> {
        let home = reprise_home()?;
        load_layer(&home.join("config.toml")).ok()
    }

    /// Load the project layer from `.reprise/config.toml` in the given directory.
    fn load_project_layer(cwd: &Path) -> Option<ConfigLayer> {
        load_layer(&project_config_path(cwd)).ok()
    }

    /// Load config from a specific file path, filling unset fields with defaults.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        Ok(Config::default().merge(load_layer(path)?))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // REPRISE_DATA_DIR
        if let Some(path) = env_path("REPRISE_DATA_DIR") {
            self.storage.data_dir = Some(path);
        }

        // REPRISE_POINTS_PER_REVIEW
        if let Ok(val) = env::var("REPRISE_POINTS_PER_REVIEW") {
            match val.parse::<u32>() {
                Ok(n) => self.points.per_review = n,
                Err(_) => eprintln!(
                    "Warning: Invalid REPRISE_POINTS_PER_REVIEW value '{}'. \
                    Expected a non-negative integer. Using '{}'.",
                    val, self.points.per_review
                ),
            }
        }

        // REPRISE_EASY_BONUS
        if let Ok(val) = env::var("REPRISE_EASY_BONUS") {
            match val.parse::<u32>() {
                Ok(n) => self.points.easy_bonus = n,
                Err(_) => eprintln!(
                    "Warning: Invalid REPRISE_EASY_BONUS value '{}'. \
                    Expected a non-negative integer. Using '{}'.",
                    val, self.points.easy_bonus
                ),
            }
        }

        // REPRISE_CATALOG
        if let Some(path) = env_path("REPRISE_CATALOG") {
            self.catalog.path = Some(path);
        }

        // REPRISE_HISTORY_ENABLED
        if let Ok(val) = env::var("REPRISE_HISTORY_ENABLED") {
            self.history.enabled = val == "true" || val == "1";
        }
    }

    /// Apply a config layer on top of this one.
    ///
    /// Every field the layer sets wins, including values equal to the
    /// defaults.
    fn merge(mut self, layer: ConfigLayer) -> Self {
        if let Some(data_dir) = layer.storage.data_dir {
            self.storage.data_dir = Some(data_dir);
        }
        if let Some(per_review) = layer.points.per_review {
            self.points.per_review = per_review;
        }
        if let Some(easy_bonus) = layer.points.easy_bonus {
            self.points.easy_bonus = easy_bonus;
        }
        if let Some(path) = layer.catalog.path {
            self.catalog.path = Some(path);
        }
        if let Some(enabled) = layer.history.enabled {
            self.history.enabled = enabled;
        }
        self
    }

    /// Directory for pair documents.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.storage.data_dir.clone().or_else(data_dir)
    }

    /// History log path, if history is enabled.
    pub fn history_log_path(&self) -> Option<PathBuf> {
        if self.history.enabled {
            history_log_path()
        } else {
            None
        }
    }
}

/// Read one config file as a layer.
fn load_layer(path: &Path) -> Result<ConfigLayer> {
    let content = fs::read_to_string(path).map_err(|e| ReviewError::storage(path, e))?;
    toml::from_str(&content)
        .map_err(|e| ReviewError::config(format!("{}: {}", path.display(), e)))
}

/// Read a non-empty path from an environment variable.
fn env_path(name: &str) -> Option<PathBuf> {
    match env::var(name) {
        Ok(val) if !val.is_empty() => Some(PathBuf::from(val)),
        Ok(_) => {
            eprintln!("Warning: {} is empty, ignoring.", name);
            None
        }
        Err(_) => None,
    }
}

/// Get the Reprise home directory.
///
/// Returns `REPRISE_HOME` if set and non-empty, otherwise `~/.reprise`.
/// Relative `REPRISE_HOME` values are canonicalized when they exist.
pub fn reprise_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("REPRISE_HOME") {
        if home.is_empty() {
            tracing::warn!("REPRISE_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("REPRISE_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(".reprise"));
    }

    let fallback_path = fallback_reprise_home();
    tracing::warn!(
        "HOME not set, using fallback location: {}",
        fallback_path.display()
    );
    Some(fallback_path)
}

/// Fallback home when HOME is unavailable.
#[cfg(unix)]
fn fallback_reprise_home() -> PathBuf {
    use std::os::unix::fs::MetadataExt;
    let uid = std::fs::metadata("/").map(|m| m.uid()).unwrap_or(0);
    PathBuf::from(format!("/tmp/reprise-{}", uid))
}

/// Fallback home when HOME is unavailable.
#[cfg(not(unix))]
fn fallback_reprise_home() -> PathBuf {
    std::env::temp_dir().join("reprise")
}

/// Default data directory: `<reprise_home>/data`.
pub fn data_dir() -> Option<PathBuf> {
    reprise_home().map(|h| h.join("data"))
}

/// History log path: `<reprise_home>/history.log`.
pub fn history_log_path() -> Option<PathBuf> {
    reprise_home().map(|h| h.join("history.log"))
}

/// Project config path: `<cwd>/.reprise/config.toml`.
pub fn project_config_path(cwd: &Path) -> PathBuf {
    cwd.join(".reprise").join("config.toml")
}
