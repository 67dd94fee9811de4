//! Configuration management for Gator.
//!
//! Configuration is read from `~/.config/gator/config.toml` (or the path
//! passed with `--config`). If the file doesn't exist, a default
//! configuration with comments is created.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::fetcher::http_fetcher::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
use crate::normalizer::DateLayouts;
use crate::scheduler::PollInterval;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file. Defaults to the platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
    /// Name of the logged-in user, written by `login` and `register`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_user_name: Option<String>,
    pub aggregator: AggregatorConfig,

    /// File this configuration was loaded from.
    #[serde(skip)]
    pub(crate) path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Default interval for `gator agg`, e.g. "30s", "1m", "1h".
    pub poll_interval: String,
    /// Whole-request fetch timeout, 1 to 10 seconds.
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Publish-date layouts, tried in order.
    pub date_layouts: DateLayouts,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: "1m".to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            date_layouts: DateLayouts::default(),
        }
    }
}

impl AggregatorConfig {
    pub fn poll_interval(&self) -> crate::app::Result<PollInterval> {
        self.poll_interval.parse()
    }

    /// The fetch timeout, capped at [`DEFAULT_TIMEOUT`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs).min(DEFAULT_TIMEOUT)
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from `path`, creating a default file there if
    /// it doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            Self::create_default_config(path)?;
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.path = Some(path.to_path_buf());
        config.validate()?;

        Ok(config)
    }

    /// Reject settings that would make every fetch fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.aggregator.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                path: self.path.clone().unwrap_or_default(),
                message: "aggregator.request_timeout_secs must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Get the default config file path: `~/.config/gator/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("gator").join("config.toml"))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Set the current user and write the configuration back to its file.
    pub fn set_user(&mut self, name: &str) -> Result<(), ConfigError> {
        self.current_user_name = Some(name.to_string());
        self.save()
    }

    /// Write the configuration to the file it was loaded from, or the
    /// default path for a configuration built in memory.
    pub fn save(&mut self) -> Result<(), ConfigError> {
        let path = match &self.path {
            Some(p) => p.clone(),
            None => Self::default_config_path()?,
        };

        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize {
            path: path.clone(),
            source: e,
        })?;

        Self::write_file(&path, &content)?;
        self.path = Some(path);
        Ok(())
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        Self::write_file(path, &Self::default_config_content())
    }

    fn write_file(path: &Path, content: &str) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(content.as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        format!(
            r##"# Gator Configuration
#
# SQLite database location (default: platform data directory)
# db_path = "/home/me/.local/share/gator/gator.db"
#
# Set by `gator register` and `gator login`
# current_user_name = "lane"

[aggregator]
# Time between ingestion cycles: <integer><unit>, unit one of s, m, h
poll_interval = "1m"

# Whole-request timeout for a feed fetch, in seconds (1 to 10)
request_timeout_secs = {timeout}

# User-Agent header sent with every fetch
user_agent = "{user_agent}"

# Publish-date layouts (chrono format strings), tried in order.
# A trailing %Z accepts a zone abbreviation such as GMT or MST.
date_layouts = [
{layouts}]
"##,
            timeout = DEFAULT_TIMEOUT.as_secs(),
            user_agent = DEFAULT_USER_AGENT,
            layouts = DateLayouts::default()
                .as_slice()
                .iter()
                .map(|l| format!("    \"{}\",\n", l))
                .collect::<String>(),
        )
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid config at {path}: {message}")]
    Invalid { path: PathBuf, message: String },

    #[error("Failed to serialize config for {path}: {source}")]
    Serialize {
        path: PathBuf,
        source: toml::ser::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert_eq!(config.aggregator.poll_interval, "1m");
        assert_eq!(config.aggregator.request_timeout_secs, 10);
        assert_eq!(config.aggregator.date_layouts, DateLayouts::default());
        assert!(config.current_user_name.is_none());
        assert!(config.db_path.is_none());
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
current_user_name = "kahya"

[aggregator]
poll_interval = "30s"
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.current_user_name.as_deref(), Some("kahya"));
        assert_eq!(
            config.aggregator.poll_interval().unwrap().as_duration(),
            Duration::from_secs(30)
        );
        // Default value
        assert_eq!(config.aggregator.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert_eq!(config.aggregator.poll_interval, "1m");
        assert_eq!(config.aggregator.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_custom_date_layouts() {
        let content = r##"
[aggregator]
date_layouts = ["%Y-%m-%d %H:%M:%S %z"]
"##;
        let config: Config = toml::from_str(content).unwrap();
        assert_eq!(config.aggregator.date_layouts.as_slice(), ["%Y-%m-%d %H:%M:%S %z"]);
    }

    #[test]
    fn test_invalid_interval_surfaces_on_use() {
        let content = r##"
[aggregator]
poll_interval = "soon"
"##;
        let config: Config = toml::from_str(content).unwrap();
        assert!(matches!(
            config.aggregator.poll_interval().unwrap_err(),
            crate::app::GatorError::InvalidInterval(_)
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[aggregator]\nrequest_timeout_secs = 0\n").unwrap();

        assert!(matches!(
            Config::load_from(&path).unwrap_err(),
            ConfigError::Invalid { .. }
        ));
    }

    #[test]
    fn test_timeout_capped() {
        let content = r##"
[aggregator]
request_timeout_secs = 60
"##;
        let config: Config = toml::from_str(content).unwrap();
        assert_eq!(config.aggregator.request_timeout(), DEFAULT_TIMEOUT);

        let content = r##"
[aggregator]
request_timeout_secs = 3
"##;
        let config: Config = toml::from_str(content).unwrap();
        assert_eq!(config.aggregator.request_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config.path(), Some(path.as_path()));
        assert_eq!(config.aggregator.poll_interval, "1m");
    }

    #[test]
    fn test_set_user_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::load_from(&path).unwrap();
        config.aggregator.poll_interval = "5m".into();
        config.set_user("lane").unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.current_user_name.as_deref(), Some("lane"));
        assert_eq!(reloaded.aggregator.poll_interval, "5m");
    }

    #[test]
    fn test_invalid_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "current_user_name = [").unwrap();

        assert!(matches!(
            Config::load_from(&path).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }
}
