//! Configuration loading and resolution
//!
//! Bootstrap settings are resolved in priority order:
//! 1. Command-line argument / environment variable (both via clap overrides)
//! 2. TOML config file
//! 3. Compiled default (fallback)
//!
//! A missing TOML file is not an error; a malformed one is.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Break channel used when nothing else is configured
pub const DEFAULT_BREAK_CHANNEL_ID: &str = "1460937344722145320";

/// HTTP listen address used when nothing else is configured
pub const DEFAULT_BIND: &str = "127.0.0.1:8090";

const APP_DIR: &str = "worklog";

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional so a partial file only overrides what it names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Path to SQLite database file
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// HTTP listen address (host:port)
    #[serde(default)]
    pub bind: Option<String>,

    /// Voice channel that ends tracking without starting new tracking
    #[serde(default)]
    pub break_channel_id: Option<String>,

    /// Discord bot token; absence disables event ingestion
    #[serde(default)]
    pub discord_token: Option<String>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// A parsed config file and where it came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub path: PathBuf,
    pub config: TomlConfig,
}

/// Values supplied on the command line or through environment variables
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database_path: Option<PathBuf>,
    pub bind: Option<String>,
    pub break_channel_id: Option<String>,
    pub discord_token: Option<String>,
}

/// Fully resolved tracker configuration
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub database_path: PathBuf,
    pub bind: String,
    pub break_channel_id: String,
    pub discord_token: Option<String>,
    pub log_level: String,
}

impl TrackerConfig {
    /// Merge overrides, TOML values and compiled defaults
    pub fn resolve(overrides: ConfigOverrides, file: Option<TomlConfig>) -> Result<Self> {
        let file = file.unwrap_or_default();

        let database_path = overrides
            .database_path
            .or(file.database_path)
            .unwrap_or_else(default_database_path);

        let bind = non_empty(overrides.bind)
            .or_else(|| non_empty(file.bind))
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        let break_channel_id = match overrides.break_channel_id.or(file.break_channel_id) {
            Some(id) if id.trim().is_empty() => {
                return Err(Error::Config("break channel id must not be empty".to_string()));
            }
            Some(id) => id.trim().to_string(),
            None => DEFAULT_BREAK_CHANNEL_ID.to_string(),
        };

        // Empty token is treated the same as a missing one
        let discord_token = non_empty(overrides.discord_token).or_else(|| non_empty(file.discord_token));

        Ok(Self {
            database_path,
            bind,
            break_channel_id,
            discord_token,
            log_level: file.logging.level,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Load the TOML bootstrap file
///
/// An explicit path must exist. Without one, the platform locations are
/// probed and `Ok(None)` is returned when none is present.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<Option<LoadedConfig>> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => match default_config_paths().into_iter().find(|p| p.exists()) {
            Some(path) => path,
            None => return Ok(None),
        },
    };

    let content = std::fs::read_to_string(&path)?;
    let config = parse_toml_config(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

    Ok(Some(LoadedConfig { path, config }))
}

/// Parse TOML text into a bootstrap config
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
}

/// Candidate config file locations for the platform, most specific first
fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join(APP_DIR).join("config.toml"));
    }
    if cfg!(target_os = "linux") {
        paths.push(PathBuf::from("/etc/worklog/config.toml"));
    }

    paths
}

/// Get OS-dependent default database path
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("./worklog_data"))
        .join("worklog.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_nothing_configured() {
        let config = TrackerConfig::resolve(ConfigOverrides::default(), None).unwrap();

        assert_eq!(config.bind, DEFAULT_BIND);
        assert_eq!(config.break_channel_id, DEFAULT_BREAK_CHANNEL_ID);
        assert!(config.discord_token.is_none());
        assert_eq!(config.log_level, "info");
        assert!(config.database_path.ends_with("worklog.db"));
    }

    #[test]
    fn test_overrides_beat_file() {
        let file = TomlConfig {
            bind: Some("0.0.0.0:9000".to_string()),
            break_channel_id: Some("111".to_string()),
            ..Default::default()
        };
        let overrides = ConfigOverrides {
            break_channel_id: Some("222".to_string()),
            ..Default::default()
        };

        let config = TrackerConfig::resolve(overrides, Some(file)).unwrap();
        assert_eq!(config.break_channel_id, "222");
        assert_eq!(config.bind, "0.0.0.0:9000");
    }

    #[test]
    fn test_blank_token_disables_ingestion() {
        let overrides = ConfigOverrides {
            discord_token: Some("   ".to_string()),
            ..Default::default()
        };
        let config = TrackerConfig::resolve(overrides, None).unwrap();
        assert!(config.discord_token.is_none());
    }

    #[test]
    fn test_blank_break_channel_rejected() {
        let overrides = ConfigOverrides {
            break_channel_id: Some(String::new()),
            ..Default::default()
        };
        let result = TrackerConfig::resolve(overrides, None);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = parse_toml_config(
            r#"
            break_channel_id = "42"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.break_channel_id.as_deref(), Some("42"));
        assert_eq!(config.logging.level, "debug");
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_parse_invalid_toml() {
        assert!(matches!(
            parse_toml_config("break_channel_id = ["),
            Err(Error::Config(_))
        ));
    }
}
