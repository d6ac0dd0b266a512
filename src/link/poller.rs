//! Background read loop.
//!
//! One task per open port polls the device on a fixed period. The owning
//! `Port` steers it through a `watch` channel (run, pause, stop); the task
//! never tears the port down itself.

use super::Shared;
use crate::events::Received;
use crate::port::PortError;
use crate::state::PortState;
use std::io;
use std::sync::Weak;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

/// Shortest tick period; `tokio::time::interval` rejects zero.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Command the owner sends to the read loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Run,
    Pause,
    Stop,
}

/// Outcome of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tick {
    /// The port was busy with another operation or the loop is paused.
    Skipped,
    /// The port was not open; a `NotOpen` error went out on both read channels.
    NotOpen,
    /// Nothing was available.
    Empty,
    /// This many bytes were read and published.
    Data(usize),
    /// The loop has been told to stop.
    Exit,
}

/// Owner-side handle to a running read loop.
#[derive(Debug)]
pub(crate) struct Poller {
    control: watch::Sender<LoopControl>,
    task: JoinHandle<()>,
}

impl Poller {
    pub fn spawn(runtime: &Handle, shared: Weak<Shared>, period: Duration, chunk: usize) -> Self {
        let (control, rx) = watch::channel(LoopControl::Run);
        let task = runtime.spawn(run(shared, rx, period.max(MIN_PERIOD), chunk));
        Self { control, task }
    }

    pub fn pause(&self) {
        self.control.send_replace(LoopControl::Pause);
    }

    pub fn resume(&self) {
        self.control.send_replace(LoopControl::Run);
    }

    /// Signal the loop to exit. The task finishes at its next wakeup.
    pub fn stop(self) {
        self.control.send_replace(LoopControl::Stop);
    }

    #[cfg(test)]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

async fn run(
    shared: Weak<Shared>,
    mut control: watch::Receiver<LoopControl>,
    period: Duration,
    chunk: usize,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut buffer = vec![0u8; chunk.max(1)];

    loop {
        let current = *control.borrow_and_update();
        if current == LoopControl::Stop {
            break;
        }

        tokio::select! {
            biased;
            changed = control.changed() => {
                if changed.is_err() {
                    break;
                }
                if *control.borrow() == LoopControl::Run {
                    ticker.reset();
                }
            }
            _ = ticker.tick(), if current == LoopControl::Run => {
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                if tick(&shared, &control, &mut buffer) == Tick::Exit {
                    break;
                }
            }
        }
    }

    debug!("Read loop stopped");
}

/// Run one poll of the device and publish what it produced.
///
/// Never blocks on the port lock: if another operation holds it the tick is
/// skipped and the bytes stay in the OS buffer for the next one.
pub(crate) fn tick(
    shared: &Shared,
    control: &watch::Receiver<LoopControl>,
    buffer: &mut [u8],
) -> Tick {
    let Some(mut guard) = shared.inner.try_lock() else {
        trace!(port = %shared.name, "Port busy, skipping tick");
        return Tick::Skipped;
    };

    match *control.borrow() {
        LoopControl::Stop => return Tick::Exit,
        LoopControl::Pause => return Tick::Skipped,
        LoopControl::Run => {}
    }

    let inner = &mut *guard;
    let device = match (inner.state, inner.device.as_mut()) {
        (PortState::Open, Some(device)) => device,
        _ => {
            shared.events.read_error(PortError::not_open(&shared.name));
            return Tick::NotOpen;
        }
    };

    let n = match device.read_available(buffer) {
        Ok(n) => n,
        Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => 0,
        Err(e) => {
            debug!(port = %shared.name, error = %e, "Read failed, treating as no data");
            0
        }
    };
    if n == 0 {
        return Tick::Empty;
    }

    inner.stats.bytes_read += n as u64;
    inner.stats.data_ticks += 1;
    trace!(port = %shared.name, bytes = n, "Received data");

    let bytes = buffer[..n].to_vec();
    let text = match shared.encoding.decode(&bytes) {
        Ok(text) => Received::Payload(text),
        Err(err) => Received::Error(err),
    };
    shared.events.data.publish(Received::Payload(bytes));
    shared.events.text.publish(text);

    Tick::Data(n)
}
