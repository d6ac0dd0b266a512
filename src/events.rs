//! Multicast event channels for port notifications.
//!
//! A port publishes on three independent channels: state changes, decoded
//! text, and raw data. Publishing never waits on subscribers; a subscriber
//! that falls behind by more than the channel capacity skips the oldest
//! events. Late subscribers see only events published after they joined.

use crate::port::PortError;
use crate::state::PortState;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tracing::warn;

/// Something that arrived on the text or data channel.
///
/// Each variant carries exactly one of payload or error, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received<T> {
    /// Bytes (or their decoded text) read from the device.
    Payload(T),
    /// The read loop hit an error it cannot return to a caller.
    Error(PortError),
    /// The port reached `Closed` or `Removed`; no more items for this session.
    Ended(PortState),
}

impl<T> Received<T> {
    pub fn payload(&self) -> Option<&T> {
        match self {
            Self::Payload(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&PortError> {
        match self {
            Self::Error(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Self::Ended(_))
    }
}

/// Items on the raw data channel.
pub type DataEvent = Received<Vec<u8>>;

/// Items on the decoded text channel.
pub type TextEvent = Received<String>;

/// A single multicast channel.
#[derive(Debug)]
pub struct Channel<T> {
    tx: broadcast::Sender<T>,
    name: &'static str,
}

impl<T: Clone> Channel<T> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, name }
    }

    /// Deliver `item` to every current subscriber.
    ///
    /// Returns the number of subscribers reached.
    pub fn publish(&self, item: T) -> usize {
        // A send error only means nobody is listening.
        self.tx.send(item).unwrap_or(0)
    }

    pub fn subscribe(&self) -> Subscription<T> {
        Subscription {
            rx: self.tx.subscribe(),
            channel: self.name,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A live subscription to one channel.
///
/// Dropping the subscription (or calling [`Subscription::unsubscribe`])
/// detaches it.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: broadcast::Receiver<T>,
    channel: &'static str,
}

impl<T: Clone> Subscription<T> {
    /// Wait for the next item.
    ///
    /// Returns `None` once the port itself has been dropped.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.rx.recv().await {
                Ok(item) => return Some(item),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(channel = self.channel, skipped, "Subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next item if one is already queued.
    pub fn try_recv(&mut self) -> Option<T> {
        loop {
            match self.rx.try_recv() {
                Ok(item) => return Some(item),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(channel = self.channel, skipped, "Subscriber lagged, events dropped");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Take every item queued right now.
    pub fn drain(&mut self) -> Vec<T> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    pub fn unsubscribe(self) {}
}

/// The three channels a port publishes on.
#[derive(Debug)]
pub(crate) struct EventHub {
    pub state: Channel<PortState>,
    pub text: Channel<TextEvent>,
    pub data: Channel<DataEvent>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Channel::new("state", capacity),
            text: Channel::new("text", capacity),
            data: Channel::new("data", capacity),
        }
    }

    /// Publish a state change, closing the read channels when the session ends.
    pub fn state_changed(&self, state: PortState) {
        self.state.publish(state);
        if state.is_end_of_session() {
            self.data.publish(Received::Ended(state));
            self.text.publish(Received::Ended(state));
        }
    }

    /// Report a read-loop error on both read channels.
    pub fn read_error(&self, err: PortError) {
        self.data.publish(Received::Error(err.clone()));
        self.text.publish(Received::Error(err));
    }
}
