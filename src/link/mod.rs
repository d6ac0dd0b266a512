//! Connection lifecycle for a single serial port.
//!
//! A `Port` owns its device handle and is the only writer of its state. All
//! transitions and handle accesses go through one lock, so `open`, `close`,
//! `send_data`, setting changes and read-loop ticks are mutually exclusive.
//!
//! # Lifecycle
//!
//! ```text
//! Closed ──open──> Open ──fall_sleep──> Sleeping
//!   ^               │  <────wake_up────    │
//!   └────close──────┴──────────────────────┘
//! any non-terminal state ──removed──> Removed (terminal)
//! ```
//!
//! # Example
//! ```no_run
//! use ttylink::Port;
//!
//! # async fn example() -> Result<(), ttylink::PortError> {
//! let port = Port::new("/dev/ttyUSB0");
//! let mut text = port.subscribe_text();
//! port.open()?;
//! port.send("AT\r\n")?;
//! if let Some(event) = text.recv().await {
//!     println!("{event:?}");
//! }
//! port.close()?;
//! # Ok(())
//! # }
//! ```

mod poller;

use crate::config::Config;
use crate::encoding::TextEncoding;
use crate::events::{DataEvent, EventHub, Subscription, TextEvent};
use crate::port::{Connector, LineSettings, Parity, PortError, SerialDevice, Snapshot, StopBits};
use crate::state::{PortState, PortStats};
use parking_lot::Mutex;
use poller::Poller;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

/// Read-loop period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Maximum bytes taken from the device per tick.
pub const DEFAULT_READ_CHUNK: usize = 1024;

/// Per-channel multicast buffer.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Construction-time options for a `Port`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortOptions {
    /// Settings applied at the first `open()`.
    pub settings: LineSettings,
    pub encoding: TextEncoding,
    pub poll_interval: Duration,
    pub read_chunk: usize,
    pub event_capacity: usize,
}

impl Default for PortOptions {
    fn default() -> Self {
        Self {
            settings: LineSettings::default(),
            encoding: TextEncoding::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            read_chunk: DEFAULT_READ_CHUNK,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl From<&Config> for PortOptions {
    fn from(config: &Config) -> Self {
        Self {
            settings: config.serial.line_settings(),
            encoding: config.serial.text_encoding,
            poll_interval: config.poller.interval(),
            read_chunk: config.poller.read_chunk,
            event_capacity: config.poller.event_capacity,
        }
    }
}

/// Mutable port state, guarded by `Shared::inner`.
#[derive(Debug)]
pub(crate) struct Inner {
    pub(crate) state: PortState,
    pub(crate) device: Option<Box<dyn SerialDevice>>,
    settings: LineSettings,
    original: Option<Snapshot>,
    poller: Option<Poller>,
    pub(crate) stats: PortStats,
}

/// State shared between a `Port` and its read loop.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) name: String,
    pub(crate) inner: Mutex<Inner>,
    pub(crate) events: EventHub,
    pub(crate) encoding: TextEncoding,
    closing: AtomicBool,
}

impl Shared {
    pub(crate) fn new(name: String, options: &PortOptions) -> Self {
        Self {
            name,
            inner: Mutex::new(Inner {
                state: PortState::Closed,
                device: None,
                settings: options.settings,
                original: None,
                poller: None,
                stats: PortStats::default(),
            }),
            events: EventHub::new(options.event_capacity),
            encoding: options.encoding,
            closing: AtomicBool::new(false),
        }
    }
}

/// A single serial-port connection.
///
/// Share it between tasks behind an `Arc`; every method takes `&self`.
#[derive(Debug)]
pub struct Port {
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    poll_interval: Duration,
    read_chunk: usize,
}

impl Port {
    /// Create a closed port for the terminal device at `path` with default options.
    #[cfg(unix)]
    pub fn new(path: impl Into<String>) -> Self {
        Self::with_connector(
            path,
            Arc::new(crate::port::TermiosConnector::default()),
            PortOptions::default(),
        )
    }

    /// Create a closed port from loaded configuration.
    ///
    /// `name` is resolved through the configured port aliases first.
    #[cfg(unix)]
    pub fn from_config(name: &str, config: &Config) -> Self {
        Self::with_connector(
            config.serial.resolve_port(name),
            Arc::new(crate::port::TermiosConnector::new(
                config.serial.inter_byte_timeout_ds,
            )),
            PortOptions::from(config),
        )
    }

    /// Create a closed port whose device is acquired through `connector`.
    pub fn with_connector(
        path: impl Into<String>,
        connector: Arc<dyn Connector>,
        options: PortOptions,
    ) -> Self {
        Self {
            shared: Arc::new(Shared::new(path.into(), &options)),
            connector,
            poll_interval: options.poll_interval,
            read_chunk: options.read_chunk,
        }
    }

    /// Device path, also the port's identifier.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn state(&self) -> PortState {
        self.shared.inner.lock().state
    }

    /// The last successfully applied line settings.
    pub fn settings(&self) -> LineSettings {
        self.shared.inner.lock().settings
    }

    pub fn baud_rate(&self) -> u32 {
        self.settings().baud_rate
    }

    pub fn parity(&self) -> Parity {
        self.settings().parity
    }

    pub fn stop_bits(&self) -> StopBits {
        self.settings().stop_bits
    }

    pub fn encoding(&self) -> TextEncoding {
        self.shared.encoding
    }

    /// Whether the port currently owns a device handle.
    pub fn has_handle(&self) -> bool {
        self.shared.inner.lock().device.is_some()
    }

    pub fn stats(&self) -> PortStats {
        self.shared.inner.lock().stats
    }

    pub fn subscribe_state(&self) -> Subscription<PortState> {
        self.shared.events.state.subscribe()
    }

    pub fn subscribe_text(&self) -> Subscription<TextEvent> {
        self.shared.events.text.subscribe()
    }

    pub fn subscribe_data(&self) -> Subscription<DataEvent> {
        self.shared.events.data.subscribe()
    }

    /// Open the device, apply the stored settings and start the read loop.
    ///
    /// Must be called from within a Tokio runtime, which hosts the read loop.
    /// Opening a port that is already open or sleeping does nothing.
    ///
    /// # Errors
    ///
    /// - `PortError::OpenFailed` if the device cannot be opened, its flags
    ///   cannot be reset, no runtime is available, or the port was removed
    /// - `PortError::OptionsApplyFailed` if the device rejects the settings
    pub fn open(&self) -> Result<(), PortError> {
        let name = &self.shared.name;
        let mut guard = self.shared.inner.lock();
        let inner = &mut *guard;

        match inner.state {
            PortState::Open | PortState::Sleeping => {
                debug!(port = %name, "Port already open");
                return Ok(());
            }
            PortState::Removed => {
                warn!(port = %name, "Cannot open a removed port");
                return Err(PortError::open_failed(name));
            }
            PortState::Closed => {}
        }

        let runtime = Handle::try_current().map_err(|e| {
            error!(port = %name, error = %e, "Opening a port requires a Tokio runtime");
            PortError::open_failed(name)
        })?;

        let mut device = self.connector.connect(name).map_err(|e| {
            warn!(port = %name, error = %e, "Failed to open device");
            PortError::open_failed(name)
        })?;

        device.clear_nonblocking().map_err(|e| {
            warn!(port = %name, error = %e, "Failed to clear non-blocking flag");
            PortError::open_failed(name)
        })?;

        inner.original = match device.snapshot() {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                debug!(port = %name, error = %e, "Could not capture original attributes");
                None
            }
        };

        if let Err(e) = device.apply(&inner.settings) {
            warn!(port = %name, error = %e, settings = %inner.settings, "Device rejected line settings");
            inner.original = None;
            return Err(PortError::options_apply_failed(name));
        }

        inner.device = Some(device);
        inner.poller = Some(Poller::spawn(
            &runtime,
            Arc::downgrade(&self.shared),
            self.poll_interval,
            self.read_chunk,
        ));
        inner.state = PortState::Open;

        info!(port = %name, settings = %inner.settings, "Port opened");
        self.shared.events.state_changed(PortState::Open);
        Ok(())
    }

    /// Drain output, reset the device attributes and release the handle.
    ///
    /// Does nothing if the port holds no handle or another close is already
    /// in flight. Blocks until queued output has been transmitted.
    ///
    /// # Errors
    ///
    /// - `PortError::CloseFailed` if draining or resetting fails; the port
    ///   keeps its state and handle so the close can be retried
    pub fn close(&self) -> Result<(), PortError> {
        if self.shared.closing.swap(true, Ordering::AcqRel) {
            debug!(port = %self.shared.name, "Close already in progress");
            return Ok(());
        }
        let result = self.close_locked();
        self.shared.closing.store(false, Ordering::Release);
        result
    }

    fn close_locked(&self) -> Result<(), PortError> {
        let name = &self.shared.name;
        let mut guard = self.shared.inner.lock();
        let inner = &mut *guard;

        if !inner.state.holds_handle() {
            return Ok(());
        }
        let Some(device) = inner.device.as_mut() else {
            return Ok(());
        };

        let poller = inner.poller.take();
        if let Err(e) = teardown(device.as_mut(), inner.original.as_ref()) {
            warn!(port = %name, error = %e, "Failed to close port");
            inner.poller = poller;
            return Err(PortError::close_failed(name));
        }
        if let Some(poller) = poller {
            poller.stop();
        }

        inner.device = None;
        inner.original = None;
        inner.state = PortState::Closed;

        info!(port = %name, "Port closed");
        self.shared.events.state_changed(PortState::Closed);
        Ok(())
    }

    /// Suspend the read loop while keeping the handle (system going to sleep).
    ///
    /// Only meaningful from `Open`; other states are left untouched.
    pub fn fall_sleep(&self) {
        let mut inner = self.shared.inner.lock();
        if inner.state != PortState::Open {
            debug!(port = %self.shared.name, state = %inner.state, "Ignoring sleep");
            return;
        }

        if let Some(poller) = &inner.poller {
            poller.pause();
        }
        inner.state = PortState::Sleeping;

        info!(port = %self.shared.name, "Port sleeping");
        self.shared.events.state_changed(PortState::Sleeping);
    }

    /// Resume the read loop after `fall_sleep`.
    pub fn wake_up(&self) {
        let mut inner = self.shared.inner.lock();
        if inner.state != PortState::Sleeping {
            debug!(port = %self.shared.name, state = %inner.state, "Ignoring wake-up");
            return;
        }

        if let Some(poller) = &inner.poller {
            poller.resume();
        }
        inner.state = PortState::Open;

        info!(port = %self.shared.name, "Port awake");
        self.shared.events.state_changed(PortState::Open);
    }

    /// Mark the device as gone.
    ///
    /// Stops the read loop, tries to drain and reset the device (giving up
    /// silently at the first failure), releases the handle and enters the
    /// terminal `Removed` state. Repeated calls do nothing.
    pub fn removed(&self) {
        let name = &self.shared.name;
        let mut guard = self.shared.inner.lock();
        let inner = &mut *guard;

        if inner.state == PortState::Removed {
            return;
        }

        if let Some(poller) = inner.poller.take() {
            poller.stop();
        }
        if let Some(mut device) = inner.device.take() {
            if let Err(e) = teardown(device.as_mut(), inner.original.as_ref()) {
                debug!(port = %name, error = %e, "Teardown of removed device stopped early");
            }
        }
        inner.original = None;
        inner.state = PortState::Removed;

        info!(port = %name, "Port removed");
        self.shared.events.state_changed(PortState::Removed);
    }

    pub fn set_baud_rate(&self, baud_rate: u32) -> Result<(), PortError> {
        self.update_settings(|s| s.baud_rate = baud_rate)
    }

    pub fn set_parity(&self, parity: Parity) -> Result<(), PortError> {
        self.update_settings(|s| s.parity = parity)
    }

    pub fn set_stop_bits(&self, stop_bits: StopBits) -> Result<(), PortError> {
        self.update_settings(|s| s.stop_bits = stop_bits)
    }

    /// Replace all line settings with one apply call.
    pub fn set_settings(&self, settings: LineSettings) -> Result<(), PortError> {
        self.update_settings(|s| *s = settings)
    }

    /// Change the stored settings and push them to the device.
    ///
    /// On a closed port the new value is stored and applied at the next
    /// `open()`. On an open or sleeping port a rejected value is rolled back
    /// before the error is returned. An unchanged value touches nothing.
    fn update_settings(&self, change: impl FnOnce(&mut LineSettings)) -> Result<(), PortError> {
        let name = &self.shared.name;
        let mut guard = self.shared.inner.lock();
        let inner = &mut *guard;

        let previous = inner.settings;
        let mut next = previous;
        change(&mut next);
        if next == previous {
            return Ok(());
        }

        match inner.state {
            PortState::Removed => Err(PortError::not_open(name)),
            PortState::Closed => {
                inner.settings = next;
                debug!(port = %name, settings = %next, "Stored settings for next open");
                Ok(())
            }
            PortState::Open | PortState::Sleeping => {
                let Some(device) = inner.device.as_mut() else {
                    return Err(PortError::not_open(name));
                };

                inner.settings = next;
                if let Err(e) = device.apply(&inner.settings) {
                    inner.settings = previous;
                    warn!(port = %name, error = %e, settings = %next, "Device rejected line settings");
                    return Err(PortError::options_apply_failed(name));
                }

                info!(port = %name, settings = %next, "Line settings applied");
                Ok(())
            }
        }
    }

    /// Encode `text` with the port's encoding and write it.
    ///
    /// # Errors
    ///
    /// - `PortError::InvalidBuffer` if `text` cannot be encoded
    /// - any error from [`Port::send_data`]
    pub fn send(&self, text: &str) -> Result<usize, PortError> {
        let bytes = self.shared.encoding.encode(text)?;
        self.send_data(&bytes)
    }

    /// Write `data` with a single blocking write.
    ///
    /// Returns the number of bytes written. A short write is not retried;
    /// the caller resubmits the remainder.
    ///
    /// # Errors
    ///
    /// - `PortError::NotOpen` if the port is not open (no write is attempted)
    /// - `PortError::WriteFailed` with the OS error code if the write fails
    pub fn send_data(&self, data: &[u8]) -> Result<usize, PortError> {
        let name = &self.shared.name;
        let mut guard = self.shared.inner.lock();
        let inner = &mut *guard;

        let device = match (inner.state, inner.device.as_mut()) {
            (PortState::Open, Some(device)) => device,
            _ => return Err(PortError::not_open(name)),
        };

        let written = device.write_bytes(data).map_err(|e| {
            warn!(port = %name, error = %e, "Write failed");
            PortError::write_failed(&e)
        })?;

        inner.stats.bytes_written += written as u64;
        debug!(port = %name, written, requested = data.len(), "Wrote to serial port");
        Ok(written)
    }
}

impl Drop for Port {
    fn drop(&mut self) {
        if self.state().holds_handle() {
            if let Err(e) = self.close() {
                warn!(port = %self.shared.name, error = %e, "Close on drop failed");
            }
        }
    }
}

/// Drain output, then put the original attributes back (or the neutral
/// configuration if none were captured). Stops at the first failure.
fn teardown(device: &mut dyn SerialDevice, original: Option<&Snapshot>) -> io::Result<()> {
    device.drain()?;
    match original {
        Some(snapshot) => device.restore(snapshot),
        None => device.apply(&LineSettings::default()),
    }
}
