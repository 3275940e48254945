//! Service configuration
//!
//! TOML file plus environment overrides, environment winning. The file path
//! comes from `RIFFBANK_CONFIG` and defaults to `riffbank.toml` in the
//! working directory; a missing file just means defaults.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

const CONFIG_ENV: &str = "RIFFBANK_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "riffbank.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// TCP port the HTTP server binds.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding `riffs.json` and the `riffs/` audio directory.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Per-recording fingerprint extraction timeout, seconds.
    #[serde(default = "default_extraction_timeout_secs")]
    pub extraction_timeout_secs: u64,
}

fn default_port() -> u16 {
    5850
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_extraction_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            data_dir: default_data_dir(),
            extraction_timeout_secs: default_extraction_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration: TOML file (if present), then env overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("failed to parse config file {}", path.display()))?;
            info!(path = %path.display(), "loaded configuration file");
            config
        } else {
            Config::default()
        };

        if let Ok(port) = std::env::var("RIFFBANK_PORT") {
            config.port = port.parse().context("RIFFBANK_PORT is not a valid port")?;
        }
        if let Ok(dir) = std::env::var("RIFFBANK_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(secs) = std::env::var("RIFFBANK_EXTRACTION_TIMEOUT_SECS") {
            config.extraction_timeout_secs = secs
                .parse()
                .context("RIFFBANK_EXTRACTION_TIMEOUT_SECS is not a valid duration")?;
        }

        Ok(config)
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }
}
