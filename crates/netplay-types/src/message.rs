//! Protocol message types.
//!
//! Messages are exchanged over a single TCP stream between the two netplay
//! instances.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::control::ControlMask;
use crate::event::NetplayEvent;
use crate::instance::InstanceId;

/// Current protocol version.
pub const PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion { major: 1, minor: 0 };

/// Protocol version for compatibility negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct ProtocolVersion {
    pub major: u16,
    pub minor: u16,
}

impl ProtocolVersion {
    /// Peers can talk to each other when the major versions agree.
    pub fn is_compatible(self, other: Self) -> bool {
        self.major == other.major
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Messages on the netplay link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum NetplayMessage {
    /// Sent by the client right after connecting.
    Hello {
        version: ProtocolVersion,
        instance: InstanceId,
        /// The client's view of the control mask (informational).
        control: ControlMask,
    },

    /// Server response to Hello.
    Welcome {
        version: ProtocolVersion,
        instance: InstanceId,
        control: ControlMask,
    },

    /// Machine snapshot the client must load before play starts.
    Snapshot(Vec<u8>),

    /// Batch of events recorded on the sending side.
    Events(Vec<NetplayEvent>),

    /// Graceful disconnect.
    Bye,
}
