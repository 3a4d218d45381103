//! Connection status shown to the user.

use serde::{Deserialize, Serialize};

/// Whether the live subscription is healthy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Subscribed and receiving updates.
    Connected,
    /// Not subscribed, signed out or the store is unreachable.
    #[default]
    Offline,
}

impl ConnectionStatus {
    /// Label for the status indicator.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Connected => "Connected",
            Self::Offline => "Offline",
        }
    }

    /// Whether the status is [`ConnectionStatus::Connected`].
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
