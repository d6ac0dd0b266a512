//! ttylink
//!
//! Manages a single serial-port connection: opening a terminal device,
//! configuring the line, polling it for inbound bytes in the background,
//! writing bytes, and publishing state changes and received data to
//! subscribers.
//!
//! # Modules
//!
//! - `link`: `Port`, the connection lifecycle state machine and its read loop
//! - `port`: Device abstraction (termios-backed and mock) and the error taxonomy
//! - `events`: Multicast state, text and data channels
//! - `encoding`: Single-byte text encodings for sending and decoding
//! - `state`: Lifecycle states and traffic counters
//! - `config`: Configuration management with TOML support
//! - `logging`: Tracing subscriber setup for binaries

pub mod config;
pub mod encoding;
pub mod events;
pub mod link;
pub mod logging;
pub mod port;
pub mod state;

// Re-export commonly used types for convenience
pub use encoding::TextEncoding;
pub use events::{DataEvent, Received, Subscription, TextEvent};
pub use link::{Port, PortOptions};
pub use port::{
    Connector, LineSettings, MockConnector, MockDevice, Parity, PortError, SerialDevice, StopBits,
};
pub use state::{PortState, PortStats};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
