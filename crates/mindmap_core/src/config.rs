//! Core configuration.
//!
//! # Responsibility
//! - Hold tunables for retry, placement and export planning.
//! - Load/validate configuration from JSON.
//!
//! # Invariants
//! - Every retry policy performs at least one attempt.
//! - Canvas and export dimensions are strictly positive.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;

/// Configuration load/validation error.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

/// Attempt budget and linear backoff unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_unit_ms: u64,
}

impl RetryConfig {
    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit_ms: 1_000,
        }
    }
}

/// Placement region for new nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: f64,
    pub height: f64,
    /// Vertical offset of a node added below an anchor.
    pub child_offset_y: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 500.0,
            height: 500.0,
            child_offset_y: 100.0,
        }
    }
}

/// Viewport planning for raster/paginated exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub padding: f64,
    pub node_width: f64,
    pub node_height: f64,
    pub max_raster_dimension: f64,
    pub pixel_ratio: f64,
    pub default_file_stem: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            padding: 50.0,
            node_width: 150.0,
            node_height: 40.0,
            max_raster_dimension: 4_096.0,
            pixel_ratio: 2.0,
            default_file_stem: "mind-map".to_string(),
        }
    }
}

/// Top-level configuration for the mind-map core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Policy shared by save/load/list.
    pub retry: RetryConfig,
    /// Policy used by identity resolution before persistence calls.
    pub identity_retry: RetryConfig,
    pub canvas: CanvasConfig,
    pub export: ExportConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            identity_retry: RetryConfig {
                max_attempts: 3,
                backoff_unit_ms: 500,
            },
            canvas: CanvasConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Parses and validates configuration from JSON text.
    ///
    /// Missing fields take their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be >= 1".to_string(),
            ));
        }
        if self.identity_retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "identity_retry.max_attempts must be >= 1".to_string(),
            ));
        }
        let dimensions = [
            ("canvas.width", self.canvas.width),
            ("canvas.height", self.canvas.height),
            ("export.node_width", self.export.node_width),
            ("export.node_height", self.export.node_height),
            ("export.max_raster_dimension", self.export.max_raster_dimension),
            ("export.pixel_ratio", self.export.pixel_ratio),
        ];
        for (name, value) in dimensions {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must be positive")));
            }
        }
        if !(self.export.padding.is_finite() && self.export.padding >= 0.0) {
            return Err(ConfigError::Invalid(
                "export.padding must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}
