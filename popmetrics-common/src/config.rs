//! Configuration loading and path resolution
//!
//! Values are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is never fatal: it logs a warning and yields defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the configuration file looked up in the platform config directory
pub const CONFIG_FILE_NAME: &str = "popmetrics.toml";

/// Logging section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Spotify credentials and request defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpotifySection {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Market used for the top-tracks endpoint
    pub market: Option<String>,
}

/// YouTube Data API credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct YoutubeSection {
    pub api_key: Option<String>,
}

/// Wikimedia settings (no key, but a contact address in the User-Agent)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WikipediaSection {
    pub contact_email: Option<String>,
}

/// HTTP behaviour shared by all platform clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpSection {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Retries for 429 and 5xx responses
    pub max_retries: u32,
    /// Client-side rate limit
    pub requests_per_second: u32,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            max_retries: 4,
            requests_per_second: 5,
        }
    }
}

/// Contents of `popmetrics.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    /// SQLite database file
    pub database_path: Option<PathBuf>,
    /// JSON list of tracked artists
    pub artists_path: Option<PathBuf>,
    /// Build/version identifier recorded on every run
    pub build_version: Option<String>,
    pub logging: LoggingConfig,
    pub spotify: SpotifySection,
    pub youtube: YoutubeSection,
    pub wikipedia: WikipediaSection,
    pub http: HttpSection,
}

/// Compiled defaults used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub database_path: PathBuf,
    pub artists_path: PathBuf,
}

impl CompiledDefaults {
    /// Defaults for the current platform
    pub fn for_current_platform() -> Self {
        let data_dir = dirs::data_local_dir()
            .map(|d| d.join("popmetrics"))
            .unwrap_or_else(|| PathBuf::from("./popmetrics_data"));

        Self {
            database_path: data_dir.join("artist_tracker.sqlite"),
            artists_path: PathBuf::from("tracked_artists.json"),
        }
    }
}

/// Default location of the TOML file (`~/.config/popmetrics/popmetrics.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("popmetrics").join(CONFIG_FILE_NAME))
}

/// Load a TOML config file
///
/// Missing file: warning + defaults. Present but unparseable: `Error::Config`.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            path = %path.display(),
            "Config file not found, using defaults"
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    debug!(path = %path.display(), "Loaded config file");
    Ok(config)
}

/// Write a TOML config file, creating parent directories
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Resolve a path setting: CLI argument > environment variable > TOML > default
pub fn resolve_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_value: Option<&Path>,
    default: &Path,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Some(path) = env_value(env_var_name) {
        return PathBuf::from(path);
    }

    if let Some(path) = toml_value {
        return path.to_path_buf();
    }

    default.to_path_buf()
}

/// Resolve a string setting: first non-blank environment variable, then TOML
pub fn resolve_string(env_var_names: &[&str], toml_value: Option<&str>) -> Option<String> {
    env_var_names
        .iter()
        .find_map(|name| env_value(name))
        .or_else(|| {
            toml_value
                .filter(|v| !v.trim().is_empty())
                .map(str::to_string)
        })
}

/// Read an environment variable, treating blank values as unset
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
