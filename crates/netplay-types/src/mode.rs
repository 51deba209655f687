//! Session mode state machine values.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::error::TypesError;

/// Status strings indexed by mode ordinal.
const STATUS_TEXT: [&str; 4] = ["Idle", "Server", "Server connected", "Client connected"];

/// Mode of the netplay session.
///
/// The ordinals are part of the UI contract: front-ends receive the mode as
/// a plain integer (0 = idle, 1 = server, 2 = server connected, 3 = client).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode,
)]
pub enum SessionMode {
    /// No networking activity.
    #[default]
    Idle,
    /// Listening for a client connection.
    Server,
    /// A client is connected; this instance is authoritative.
    ServerConnected,
    /// Connected to a remote server.
    Client,
}

impl SessionMode {
    /// Integer ordinal used by the `network_get_mode()` convention.
    pub fn ordinal(self) -> i32 {
        match self {
            Self::Idle => 0,
            Self::Server => 1,
            Self::ServerConnected => 2,
            Self::Client => 3,
        }
    }

    /// Map an ordinal back to a mode.
    pub fn from_ordinal(ordinal: i32) -> Result<Self, TypesError> {
        match ordinal {
            0 => Ok(Self::Idle),
            1 => Ok(Self::Server),
            2 => Ok(Self::ServerConnected),
            3 => Ok(Self::Client),
            other => Err(TypesError::UnknownMode(other)),
        }
    }

    /// Whether a peer session is live (input is being mirrored).
    pub fn is_connected(self) -> bool {
        matches!(self, Self::ServerConnected | Self::Client)
    }

    /// Whether any networking activity is going on.
    pub fn is_active(self) -> bool {
        self != Self::Idle
    }

    /// Text shown in the netplay status label.
    pub fn status_text(self) -> &'static str {
        status_text(self.ordinal())
    }
}

/// Status label text for a raw mode ordinal.
///
/// Out-of-range ordinals render as `"invalid"`.
pub fn status_text(ordinal: i32) -> &'static str {
    usize::try_from(ordinal)
        .ok()
        .and_then(|i| STATUS_TEXT.get(i))
        .copied()
        .unwrap_or("invalid")
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.status_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_table_matches_ordinals() {
        assert_eq!(status_text(0), "Idle");
        assert_eq!(status_text(1), "Server");
        assert_eq!(status_text(2), "Server connected");
        assert_eq!(status_text(3), "Client connected");
    }

    #[test]
    fn status_text_out_of_range_is_invalid() {
        assert_eq!(status_text(-1), "invalid");
        assert_eq!(status_text(4), "invalid");
        assert_eq!(status_text(i32::MAX), "invalid");
        assert_eq!(status_text(i32::MIN), "invalid");
    }

    #[test]
    fn ordinal_roundtrip() {
        for mode in [
            SessionMode::Idle,
            SessionMode::Server,
            SessionMode::ServerConnected,
            SessionMode::Client,
        ] {
            assert_eq!(SessionMode::from_ordinal(mode.ordinal()), Ok(mode));
            assert_eq!(mode.to_string(), status_text(mode.ordinal()));
        }
        assert_eq!(
            SessionMode::from_ordinal(7),
            Err(TypesError::UnknownMode(7))
        );
    }

    #[test]
    fn connected_and_active() {
        assert!(!SessionMode::Idle.is_active());
        assert!(SessionMode::Server.is_active());
        assert!(!SessionMode::Server.is_connected());
        assert!(SessionMode::ServerConnected.is_connected());
        assert!(SessionMode::Client.is_connected());
    }

    #[test]
    fn default_is_idle() {
        assert_eq!(SessionMode::default(), SessionMode::Idle);
    }
}
