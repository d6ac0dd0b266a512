//! Port error taxonomy.
//!
//! Every failure the connection layer reports falls into one of these kinds.
//! The enum is `Clone` so the read loop can deliver errors over multicast
//! channels next to the payload they replace.

use thiserror::Error;

/// Errors that can occur while driving a serial port connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    /// The device could not be opened or its initial flags could not be set.
    #[error("Failed to open serial port: {0}")]
    OpenFailed(String),

    /// The operation requires an open port.
    #[error("Serial port is not open: {0}")]
    NotOpen(String),

    /// Draining output or resetting attributes failed during close.
    #[error("Failed to close serial port: {0}")]
    CloseFailed(String),

    /// The device rejected the requested line settings.
    #[error("Failed to apply line settings on {0}")]
    OptionsApplyFailed(String),

    /// The text cannot be represented in the port's byte encoding.
    #[error("Buffer cannot be encoded for transmission")]
    InvalidBuffer,

    /// The write call failed; carries the OS error code.
    #[error("Write failed with OS error {0}")]
    WriteFailed(i32),

    /// Received bytes are not valid in the port's text encoding.
    #[error("Failed to decode received bytes: {0}")]
    DecodeFailed(String),
}

impl PortError {
    /// Create an OpenFailed error from a port path.
    pub fn open_failed(path: impl Into<String>) -> Self {
        Self::OpenFailed(path.into())
    }

    /// Create a NotOpen error from a port path.
    pub fn not_open(path: impl Into<String>) -> Self {
        Self::NotOpen(path.into())
    }

    /// Create a CloseFailed error from a port path.
    pub fn close_failed(path: impl Into<String>) -> Self {
        Self::CloseFailed(path.into())
    }

    /// Create an OptionsApplyFailed error from a port path.
    pub fn options_apply_failed(path: impl Into<String>) -> Self {
        Self::OptionsApplyFailed(path.into())
    }

    /// Create a WriteFailed error from an I/O error.
    ///
    /// Errors that carry no OS code map to `-1`.
    pub fn write_failed(err: &std::io::Error) -> Self {
        Self::WriteFailed(err.raw_os_error().unwrap_or(-1))
    }
}
