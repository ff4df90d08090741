//! Configuration management.
//!
//! Settings are read from `~/.config/pagesift/config.toml` at startup. If
//! the file doesn't exist, a commented default is created. Missing fields
//! fall back to their defaults.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use crate::page::BrowserSettings;
use crate::recipe::brave::BraveSettings;
use crate::recipe::wikipedia::WikipediaSettings;
use crate::toolkit::PollSettings;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserSettings,
    pub poll: PollSettings,
    pub brave: BraveSettings,
    pub wikipedia: WikipediaSettings,
}

impl Config {
    /// Load configuration from the default path, creating a commented
    /// default file on first run.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })?;

        Ok(config)
    }

    /// Get the default config file path: `~/.config/pagesift/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("pagesift").join("config.toml"))
    }

    fn create_default_config(path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> String {
        r##"# pagesift configuration
#
# Every key is optional; missing keys use the built-in defaults shown here.

[browser]
# Run Chrome headless. Set to false to watch extraction happen.
headless = true
# Page load timeout in seconds.
timeout_secs = 30

[poll]
# Convergence polling for streamed content (DeepL).
interval_ms = 500
required_stable = 6
max_attempts = 80

[brave]
# Settle delay after navigation before probing for results.
settle_ms = 3000
# How long to wait for the results container before returning zero results.
results_timeout_ms = 8000

[wikipedia]
results_timeout_ms = 10000
# Upper bound on the per-section sibling scan.
section_scan_limit = 50
summary_paragraphs = 3
"##
        .to_string()
    }
}
