//! Arbiter configuration
//!
//! Loaded from TOML; every field has a default so a partial file (or no file
//! at all) is valid.

use crate::capture::DEFAULT_MAX_FRAME_BYTES;
use crate::classifier::{FeedClassifier, DEFAULT_FEED_A_PORT, DEFAULT_FEED_B_PORT};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Environment variable naming a config file when `--config` is absent
pub const CONFIG_ENV_VAR: &str = "FEED_ARBITER_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    /// UDP destination port carrying feed A
    pub feed_a_port: u16,
    /// UDP destination port carrying feed B
    pub feed_b_port: u16,
    /// File extension of capture files in the input directory, without the dot
    pub capture_extension: String,
    /// Consecutive timeouts tolerated from a live source before giving up on it
    pub max_consecutive_timeouts: u32,
    /// Largest pcap record accepted before the file is treated as corrupt
    pub max_frame_bytes: usize,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            feed_a_port: DEFAULT_FEED_A_PORT,
            feed_b_port: DEFAULT_FEED_B_PORT,
            capture_extension: "pcap".to_string(),
            max_consecutive_timeouts: 16,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl ArbiterConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load from `path` if given, else from `$FEED_ARBITER_CONFIG`, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => match std::env::var(CONFIG_ENV_VAR) {
                Ok(p) => Self::from_file(p),
                Err(_) => Ok(Self::default()),
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed_a_port == 0 || self.feed_b_port == 0 {
            return Err(ConfigError::Invalid("feed ports must be non-zero".to_string()));
        }
        if self.feed_a_port == self.feed_b_port {
            return Err(ConfigError::Invalid(format!(
                "feed_a_port and feed_b_port are both {}",
                self.feed_a_port
            )));
        }
        if self.capture_extension.is_empty() {
            return Err(ConfigError::Invalid("capture_extension must not be empty".to_string()));
        }
        if self.max_frame_bytes == 0 {
            return Err(ConfigError::Invalid("max_frame_bytes must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn classifier(&self) -> FeedClassifier {
        FeedClassifier::new(self.feed_a_port, self.feed_b_port)
    }
}
