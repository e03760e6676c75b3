//! Configuration parsing and validation.
//!
//! Datty configuration is loaded from TOML files with CLI overrides.
//! Every section is optional and falls back to defaults.

use crate::codec::{Limits, ReadMode};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Upper bound accepted for `codec.max_nesting_depth`.
const MAX_NESTING_DEPTH_LIMIT: usize = 512;

/// Top-level Datty configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Wire codec behaviour.
    #[serde(default)]
    pub codec: CodecConfig,

    /// Reference store behaviour.
    #[serde(default)]
    pub store: StoreConfig,

    /// Telemetry and logging configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Wire codec configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Write field keys as integer tags instead of names.
    #[serde(default = "default_numeric_keys")]
    pub numeric_keys: bool,

    /// Copy binary payloads out of the transport buffer on read.
    #[serde(default = "default_copy_payloads")]
    pub copy_payloads: bool,

    /// Maximum container nesting depth accepted on decode.
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,

    /// Maximum element count in a single array or map header.
    #[serde(default = "default_max_collection_len")]
    pub max_collection_len: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            numeric_keys: default_numeric_keys(),
            copy_payloads: default_copy_payloads(),
            max_nesting_depth: default_max_nesting_depth(),
            max_collection_len: default_max_collection_len(),
        }
    }
}

impl CodecConfig {
    /// Decode bounds for [`crate::codec::PackReader`].
    pub fn limits(&self) -> Limits {
        Limits {
            max_nesting_depth: self.max_nesting_depth,
            max_collection_len: self.max_collection_len,
        }
    }

    /// Payload read mode.
    pub fn read_mode(&self) -> ReadMode {
        ReadMode::from_copy_flag(self.copy_payloads)
    }
}

/// Reference store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// TTL applied to puts that carry none. 0 disables expiry. Bounded by
    /// the width of the per-operation `ttlSec` field.
    #[serde(default)]
    pub default_ttl_seconds: u64,
}

impl StoreConfig {
    /// Default TTL, if any.
    pub fn default_ttl(&self) -> Option<Duration> {
        if self.default_ttl_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.default_ttl_seconds))
        }
    }
}

/// Telemetry and logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// Default value functions

fn default_numeric_keys() -> bool {
    true
}

fn default_copy_payloads() -> bool {
    true
}

fn default_max_nesting_depth() -> usize {
    crate::codec::MAX_NESTING_DEPTH
}

fn default_max_collection_len() -> usize {
    crate::codec::MAX_ELEMENTS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).with_context(|| "failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).with_context(|| "failed to render config")
    }

    /// Apply CLI overrides to the configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref log_level) = overrides.log_level {
            self.telemetry.log_level = log_level.clone();
        }
        if let Some(numeric_keys) = overrides.numeric_keys {
            self.codec.numeric_keys = numeric_keys;
        }
    }

    /// Validate configuration consistency.
    pub fn validate(&self) -> Result<()> {
        self.validate_codec()?;
        self.validate_store()?;
        self.validate_telemetry()?;
        Ok(())
    }

    fn validate_codec(&self) -> Result<()> {
        if self.codec.max_nesting_depth == 0
            || self.codec.max_nesting_depth > MAX_NESTING_DEPTH_LIMIT
        {
            anyhow::bail!(
                "codec.max_nesting_depth must be in 1..={}, got: {}",
                MAX_NESTING_DEPTH_LIMIT,
                self.codec.max_nesting_depth
            );
        }

        if self.codec.max_collection_len == 0 {
            anyhow::bail!("codec.max_collection_len must be > 0");
        }

        Ok(())
    }

    fn validate_store(&self) -> Result<()> {
        if self.store.default_ttl_seconds > u64::from(u32::MAX) {
            anyhow::bail!(
                "store.default_ttl_seconds must be <= {}, got: {}",
                u32::MAX,
                self.store.default_ttl_seconds
            );
        }
        Ok(())
    }

    fn validate_telemetry(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.telemetry.log_level.as_str()) {
            anyhow::bail!(
                "telemetry.log_level must be one of {:?}, got: {}",
                valid_levels,
                self.telemetry.log_level
            );
        }
        Ok(())
    }
}

/// CLI override options that can be applied to configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override log level.
    pub log_level: Option<String>,
    /// Override field key mode.
    pub numeric_keys: Option<bool>,
}
