//! Configuration module for ttylink.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `TTYLINK_CONFIG` environment variable (explicit path)
//! 2. `./ttylink.toml` (current directory)
//! 3. `~/.config/ttylink/ttylink.toml` (or under `$XDG_CONFIG_HOME`)
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! Selected values can be overridden via environment variables.
//! The pattern is: `TTYLINK_<SECTION>_<KEY>`
//!
//! Examples:
//! - `TTYLINK_SERIAL_DEFAULT_BAUD=115200`
//! - `TTYLINK_SERIAL_DEFAULT_PARITY=even`
//! - `TTYLINK_SERIAL_TEXT_ENCODING=latin1`
//! - `TTYLINK_POLLER_INTERVAL_MS=20`
//! - `TTYLINK_LOGGING_LEVEL=debug`
//!
//! # Example
//!
//! ```rust,no_run
//! use ttylink::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! let config = loader.config();
//!
//! println!("Default line: {}", config.serial.line_settings());
//! println!("Poll every {:?}", config.poller.interval());
//! # Ok::<(), ttylink::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{Config, LogFormat, LoggingConfig, PollerConfig, SerialConfig};
