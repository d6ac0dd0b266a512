//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All configuration sections are defined here with appropriate defaults.

use super::error::{ConfigError, ConfigResult};
use crate::encoding::TextEncoding;
use crate::link::{DEFAULT_EVENT_CAPACITY, DEFAULT_READ_CHUNK};
use crate::port::{is_supported_baud, LineSettings, Parity, StopBits};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial line configuration
    pub serial: SerialConfig,
    /// Read loop configuration
    pub poller: PollerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Reject values the port cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if !is_supported_baud(self.serial.default_baud) {
            return Err(ConfigError::validation(
                "serial.default_baud",
                format!("{} is not a supported baud rate", self.serial.default_baud),
            ));
        }
        if self.poller.interval_ms == 0 {
            return Err(ConfigError::validation("poller.interval_ms", "must be greater than zero"));
        }
        if self.poller.read_chunk == 0 {
            return Err(ConfigError::validation("poller.read_chunk", "must be greater than zero"));
        }
        if self.poller.event_capacity == 0 {
            return Err(ConfigError::validation(
                "poller.event_capacity",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Serial line configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Baud rate applied when a port is first opened
    pub default_baud: u32,
    /// Parity applied when a port is first opened
    pub default_parity: Parity,
    /// Stop bits applied when a port is first opened
    pub default_stop_bits: StopBits,
    /// Encoding for sent text and decoded received text
    pub text_encoding: TextEncoding,
    /// Inter-byte read timeout (VTIME) in deciseconds
    pub inter_byte_timeout_ds: u8,
    /// Port aliases for convenience
    #[serde(default)]
    pub port_aliases: HashMap<String, String>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        let settings = LineSettings::default();
        Self {
            default_baud: settings.baud_rate,
            default_parity: settings.parity,
            default_stop_bits: settings.stop_bits,
            text_encoding: TextEncoding::Ascii,
            inter_byte_timeout_ds: 1,
            port_aliases: HashMap::new(),
        }
    }
}

impl SerialConfig {
    pub fn line_settings(&self) -> LineSettings {
        LineSettings {
            baud_rate: self.default_baud,
            parity: self.default_parity,
            stop_bits: self.default_stop_bits,
        }
    }

    /// Resolve a port name through aliases
    pub fn resolve_port(&self, name: &str) -> String {
        self.port_aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}

/// Read loop configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Tick period in milliseconds
    pub interval_ms: u64,
    /// Maximum bytes read per tick
    pub read_chunk: usize,
    /// Events buffered per channel before slow subscribers start skipping
    pub event_capacity: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 10,
            read_chunk: DEFAULT_READ_CHUNK,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive, e.g. "info" or "ttylink=debug"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}
