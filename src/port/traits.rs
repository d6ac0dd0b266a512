//! Core traits for serial device abstraction.
//!
//! Defines the `SerialDevice` trait that lets both real terminal devices and
//! mock implementations sit behind a `Port`, plus the `Connector` that
//! acquires them by path.

use serde::{Deserialize, Serialize};
use std::io;

/// Line settings a port can change at runtime.
///
/// Data bits are fixed at eight and flow control is always off; neither is
/// configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSettings {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Parity checking mode.
    pub parity: Parity,

    /// Number of stop bits.
    pub stop_bits: StopBits,
}

impl Default for LineSettings {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

impl std::fmt::Display for LineSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parity = match self.parity {
            Parity::None => 'N',
            Parity::Even => 'E',
            Parity::Odd => 'O',
        };
        write!(f, "{} 8{}{}", self.baud_rate, parity, self.stop_bits.count())
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Even,
    Odd,
}

impl std::str::FromStr for Parity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "n" => Ok(Self::None),
            "even" | "e" => Ok(Self::Even),
            "odd" | "o" => Ok(Self::Odd),
            other => Err(format!("unknown parity '{other}'")),
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopBits {
    One,
    Two,
}

impl StopBits {
    /// Map a numeric stop-bit count: 1 is one stop bit, anything larger is two.
    pub fn from_count(count: u8) -> Option<Self> {
        match count {
            0 => None,
            1 => Some(Self::One),
            _ => Some(Self::Two),
        }
    }

    pub fn count(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

/// Device attributes captured so they can be put back later.
#[derive(Clone, Copy)]
pub enum Snapshot {
    /// Raw terminal attributes read from the device.
    #[cfg(unix)]
    Termios(libc::termios),
    /// Line settings recorded by a device without raw attributes.
    Settings(LineSettings),
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(unix)]
            Self::Termios(_) => f.write_str("Snapshot::Termios(..)"),
            Self::Settings(settings) => f.debug_tuple("Snapshot::Settings").field(settings).finish(),
        }
    }
}

/// Trait for an opened serial device handle.
///
/// Every method maps to one terminal system call (or a short fixed sequence).
/// Implementations release the underlying handle when dropped.
pub trait SerialDevice: Send + std::fmt::Debug {
    /// Clear the non-blocking flag the device was opened with.
    fn clear_nonblocking(&mut self) -> io::Result<()>;

    /// Capture the current device attributes.
    fn snapshot(&mut self) -> io::Result<Snapshot>;

    /// Apply the full line configuration in a single attribute-set call.
    fn apply(&mut self, settings: &LineSettings) -> io::Result<()>;

    /// Put previously captured attributes back.
    fn restore(&mut self, snapshot: &Snapshot) -> io::Result<()>;

    /// Block until all queued output has been transmitted.
    fn drain(&mut self) -> io::Result<()>;

    /// Read whatever bytes are available without waiting.
    ///
    /// Returns `Ok(0)` when nothing is pending.
    fn read_available(&mut self, buffer: &mut [u8]) -> io::Result<usize>;

    /// Write bytes with a single blocking write call.
    ///
    /// Returns the number of bytes actually written, which may be short.
    fn write_bytes(&mut self, data: &[u8]) -> io::Result<usize>;
}

/// Acquires serial devices by OS path.
pub trait Connector: Send + Sync + std::fmt::Debug {
    /// Open the device at `path` read/write, non-blocking, without making it
    /// the controlling terminal.
    fn connect(&self, path: &str) -> io::Result<Box<dyn SerialDevice>>;
}
