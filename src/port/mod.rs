//! Device abstraction layer for serial communication.
//!
//! Provides the `SerialDevice` and `Connector` traits with a termios-backed
//! implementation for real hardware and a mock for tests.

pub mod error;
pub mod mock;
pub mod traits;

#[cfg(unix)]
pub mod termios;

pub use error::PortError;
pub use mock::{MockConnector, MockDevice};
pub use traits::*;

#[cfg(unix)]
pub use termios::{TermiosConnector, TermiosDevice};

/// Whether the platform can configure `rate` on a terminal device.
pub fn is_supported_baud(rate: u32) -> bool {
    #[cfg(unix)]
    {
        termios::baud_constant(rate).is_some()
    }

    #[cfg(not(unix))]
    {
        rate > 0
    }
}
