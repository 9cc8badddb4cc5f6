use serde::{Deserialize, Serialize};

use super::errors::NetworkError;

/// Data-plane state of the Tor connection. Errors are events, not states.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionState {
    pub fn from_reachable(reachable: bool) -> Self {
        if reachable {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

/// Events emitted by the Tor controller and its background poller.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    /// Result of a reachability probe, published on every check.
    StatusChanged(ConnectionState),
    /// A transient failure; the raw failure text lives in the error.
    Error(NetworkError),
    /// The control port acknowledged a circuit rotation.
    IdentityRenewed,
}
