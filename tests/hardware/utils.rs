//! Utility functions for device-level testing.
//!
//! Provides a pseudo-terminal pair that stands in for a serial line, and
//! reads the target port for real-hardware tests from the environment.

use std::env;
#[cfg(target_os = "linux")]
use std::{
    ffi::CStr,
    io,
    os::fd::{AsRawFd, FromRawFd, OwnedFd},
    time::{Duration, Instant},
};

/// Test port configuration from environment.
pub struct TestPortConfig {
    pub port_name: String,
    pub baud_rate: u32,
    pub loopback_enabled: bool,
}

impl TestPortConfig {
    /// Get test configuration from environment variables.
    pub fn from_env() -> Option<Self> {
        let port_name = env::var("TEST_PORT").ok()?;
        let baud_rate = env::var("TEST_BAUD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(9600);
        let loopback_enabled = env::var("TEST_LOOPBACK").ok().as_deref() == Some("1");

        Some(TestPortConfig {
            port_name,
            baud_rate,
            loopback_enabled,
        })
    }
}

/// Master side of a pseudo-terminal; the slave path is what a port opens.
#[cfg(target_os = "linux")]
pub struct Pty {
    master: OwnedFd,
    pub slave_path: String,
}

#[cfg(target_os = "linux")]
impl Pty {
    /// Allocate a new pseudo-terminal pair.
    pub fn open() -> io::Result<Self> {
        // SAFETY: plain libc calls on a descriptor we own.
        unsafe {
            let raw = libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY | libc::O_NONBLOCK);
            if raw < 0 {
                return Err(io::Error::last_os_error());
            }
            let master = OwnedFd::from_raw_fd(raw);
            if libc::grantpt(raw) != 0 || libc::unlockpt(raw) != 0 {
                return Err(io::Error::last_os_error());
            }

            let mut name = [0 as libc::c_char; 128];
            if libc::ptsname_r(raw, name.as_mut_ptr(), name.len()) != 0 {
                return Err(io::Error::last_os_error());
            }
            let slave_path = CStr::from_ptr(name.as_ptr()).to_string_lossy().into_owned();

            Ok(Self { master, slave_path })
        }
    }

    /// Send bytes as if the remote device had transmitted them.
    pub fn write(&self, data: &[u8]) -> io::Result<usize> {
        // SAFETY: `data` is valid for `data.len()` bytes.
        let n = unsafe { libc::write(self.master.as_raw_fd(), data.as_ptr().cast(), data.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    /// Collect what the port sent until `expected` bytes arrive or `timeout` passes.
    pub fn read_exact_within(&self, expected: usize, timeout: Duration) -> Vec<u8> {
        let deadline = Instant::now() + timeout;
        let mut received = Vec::with_capacity(expected);
        let mut buffer = [0u8; 256];

        while received.len() < expected && Instant::now() < deadline {
            // SAFETY: `buffer` is valid for its full length.
            let n = unsafe {
                libc::read(
                    self.master.as_raw_fd(),
                    buffer.as_mut_ptr().cast(),
                    buffer.len(),
                )
            };
            if n > 0 {
                received.extend_from_slice(&buffer[..n as usize]);
            } else {
                std::thread::sleep(Duration::from_millis(2));
            }
        }
        received
    }
}
