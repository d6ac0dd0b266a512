//! Mock serial device implementation for testing.
//!
//! Provides a `MockConnector` that hands out `MockDevice` handles without
//! requiring actual hardware. Tests keep a `MockDevice` to inject inbound
//! bytes, inspect what the port did, and force individual calls to fail.

use super::traits::{Connector, LineSettings, SerialDevice, Snapshot};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::Arc;

/// Inner state of a mock device, shared between the test and the handle.
#[derive(Debug, Default)]
struct MockDeviceState {
    /// Bytes waiting to be returned by reads.
    read_queue: VecDeque<u8>,
    /// Every buffer passed to a write call.
    write_log: Vec<Vec<u8>>,
    /// Every configuration successfully applied.
    applied: Vec<LineSettings>,
    /// Whether a handle is currently held by a port.
    open: bool,
    /// How many times the device has been opened.
    open_count: usize,
    /// Number of calls per operation.
    read_calls: usize,
    write_calls: usize,
    drain_calls: usize,
    restore_calls: usize,
    /// Failure injection.
    fail_open: bool,
    fail_clear_nonblocking: bool,
    fail_snapshot: bool,
    fail_apply: Option<i32>,
    fail_drain: bool,
    fail_restore: bool,
    fail_write: Option<i32>,
    write_limit: Option<usize>,
}

/// Test-side view of a mock serial device.
///
/// # Example
/// ```
/// use ttylink::port::{Connector, MockConnector};
///
/// let connector = MockConnector::new();
/// let device = connector.add_device("/dev/mock0");
///
/// let mut handle = connector.connect("/dev/mock0").unwrap();
/// assert!(device.is_open());
///
/// device.inject(b"OK\r\n");
/// let mut buffer = [0u8; 16];
/// assert_eq!(handle.read_available(&mut buffer).unwrap(), 4);
///
/// drop(handle);
/// assert!(!device.is_open());
/// ```
#[derive(Debug, Clone)]
pub struct MockDevice {
    path: String,
    state: Arc<Mutex<MockDeviceState>>,
}

impl MockDevice {
    fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            state: Arc::new(Mutex::new(MockDeviceState::default())),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Queue bytes as if they had arrived on the line.
    pub fn inject(&self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
    }

    /// Bytes still waiting to be read.
    pub fn pending(&self) -> usize {
        self.state.lock().read_queue.len()
    }

    /// Whether a port currently holds a handle to this device.
    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().open_count
    }

    /// Copy of every buffer written to the device.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// Every configuration the device accepted, oldest first.
    pub fn applied(&self) -> Vec<LineSettings> {
        self.state.lock().applied.clone()
    }

    /// The configuration currently in effect on the device.
    pub fn current_settings(&self) -> Option<LineSettings> {
        self.state.lock().applied.last().copied()
    }

    pub fn read_calls(&self) -> usize {
        self.state.lock().read_calls
    }

    pub fn write_calls(&self) -> usize {
        self.state.lock().write_calls
    }

    pub fn drain_calls(&self) -> usize {
        self.state.lock().drain_calls
    }

    pub fn restore_calls(&self) -> usize {
        self.state.lock().restore_calls
    }

    /// Make connecting to this device fail.
    pub fn fail_open(&self, fail: bool) {
        self.state.lock().fail_open = fail;
    }

    /// Make clearing the non-blocking flag fail.
    pub fn fail_clear_nonblocking(&self, fail: bool) {
        self.state.lock().fail_clear_nonblocking = fail;
    }

    /// Make capturing the original attributes fail.
    pub fn fail_snapshot(&self, fail: bool) {
        self.state.lock().fail_snapshot = fail;
    }

    /// Make every apply call fail with the given OS error code.
    pub fn fail_apply(&self, errno: Option<i32>) {
        self.state.lock().fail_apply = errno;
    }

    pub fn fail_drain(&self, fail: bool) {
        self.state.lock().fail_drain = fail;
    }

    pub fn fail_restore(&self, fail: bool) {
        self.state.lock().fail_restore = fail;
    }

    /// Make every write call fail with the given OS error code.
    pub fn fail_write(&self, errno: Option<i32>) {
        self.state.lock().fail_write = errno;
    }

    /// Accept at most `limit` bytes per write call.
    pub fn limit_writes(&self, limit: Option<usize>) {
        self.state.lock().write_limit = limit;
    }
}

/// A handle a port owns while the mock device is open.
///
/// Dropping it marks the device as released.
#[derive(Debug)]
struct MockHandle {
    device: MockDevice,
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.device.state.lock().open = false;
    }
}

impl SerialDevice for MockHandle {
    fn clear_nonblocking(&mut self) -> io::Result<()> {
        if self.device.state.lock().fail_clear_nonblocking {
            return Err(io::Error::from_raw_os_error(errno::EBADF));
        }
        Ok(())
    }

    fn snapshot(&mut self) -> io::Result<Snapshot> {
        let state = self.device.state.lock();
        if state.fail_snapshot {
            return Err(io::Error::from_raw_os_error(errno::ENOTTY));
        }
        Ok(Snapshot::Settings(
            state.applied.last().copied().unwrap_or_default(),
        ))
    }

    fn apply(&mut self, settings: &LineSettings) -> io::Result<()> {
        let mut state = self.device.state.lock();
        if let Some(errno) = state.fail_apply {
            return Err(io::Error::from_raw_os_error(errno));
        }
        state.applied.push(*settings);
        Ok(())
    }

    fn restore(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        let mut state = self.device.state.lock();
        state.restore_calls += 1;
        if state.fail_restore {
            return Err(io::Error::from_raw_os_error(errno::EIO));
        }
        if let Snapshot::Settings(settings) = snapshot {
            state.applied.push(*settings);
        }
        Ok(())
    }

    fn drain(&mut self) -> io::Result<()> {
        let mut state = self.device.state.lock();
        state.drain_calls += 1;
        if state.fail_drain {
            return Err(io::Error::from_raw_os_error(errno::EIO));
        }
        Ok(())
    }

    fn read_available(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        let mut state = self.device.state.lock();
        state.read_calls += 1;

        let n = buffer.len().min(state.read_queue.len());
        for (slot, byte) in buffer.iter_mut().zip(state.read_queue.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_bytes(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut state = self.device.state.lock();
        state.write_calls += 1;
        if let Some(errno) = state.fail_write {
            return Err(io::Error::from_raw_os_error(errno));
        }

        let n = state.write_limit.map_or(data.len(), |limit| limit.min(data.len()));
        state.write_log.push(data[..n].to_vec());
        Ok(n)
    }
}

/// Connector that serves registered mock devices.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    devices: Arc<Mutex<HashMap<String, MockDevice>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device at `path` and return its test-side view.
    pub fn add_device(&self, path: &str) -> MockDevice {
        let device = MockDevice::new(path);
        self.devices
            .lock()
            .insert(path.to_string(), device.clone());
        device
    }

    /// Forget the device at `path`, as if it had been unplugged.
    pub fn unplug(&self, path: &str) -> Option<MockDevice> {
        self.devices.lock().remove(path)
    }

    pub fn device(&self, path: &str) -> Option<MockDevice> {
        self.devices.lock().get(path).cloned()
    }
}

impl Connector for MockConnector {
    fn connect(&self, path: &str) -> io::Result<Box<dyn SerialDevice>> {
        let device = self
            .device(path)
            .ok_or_else(|| io::Error::from_raw_os_error(errno::ENOENT))?;

        {
            let mut state = device.state.lock();
            if state.fail_open {
                return Err(io::Error::from_raw_os_error(errno::EACCES));
            }
            if state.open {
                return Err(io::Error::from_raw_os_error(errno::EBUSY));
            }
            state.open = true;
            state.open_count += 1;
        }

        Ok(Box::new(MockHandle { device }))
    }
}

/// Error codes the mock reports, fixed so tests behave the same everywhere.
mod errno {
    pub const ENOENT: i32 = 2;
    pub const EIO: i32 = 5;
    pub const EBADF: i32 = 9;
    pub const EACCES: i32 = 13;
    pub const EBUSY: i32 = 16;
    pub const ENOTTY: i32 = 25;
}
