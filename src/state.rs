use serde::{Deserialize, Serialize};

/// Lifecycle state of a port.
///
/// `Closed` is the initial state and `Removed` is terminal.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    #[default]
    Closed,
    Open,
    Sleeping,
    Removed,
}

impl PortState {
    /// Whether a device handle is held in this state.
    pub fn holds_handle(self) -> bool {
        matches!(self, Self::Open | Self::Sleeping)
    }

    /// Whether this state ends a session (no more data will arrive).
    pub fn is_end_of_session(self) -> bool {
        matches!(self, Self::Closed | Self::Removed)
    }
}

impl std::fmt::Display for PortState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::Sleeping => "sleeping",
            Self::Removed => "removed",
        })
    }
}

/// Traffic counters kept for the lifetime of a port.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortStats {
    pub bytes_written: u64,
    pub bytes_read: u64,
    /// Read-loop ticks that returned at least one byte.
    pub data_ticks: u64,
}
