use std::fmt;

/// Connectivity sub-state of an endpoint, independent of signaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    New,
    Checking,
    Connected,
    Disconnected,
    Failed,
}

impl ConnectivityState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, ConnectivityState::Disconnected | ConnectivityState::Failed)
    }
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
