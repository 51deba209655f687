//! TCP transport layer and wire protocol for netplay.
//!
//! This crate handles listening and connecting (via tokio), message
//! serialisation/deserialisation (via bincode v2) and the framing of
//! messages on the byte stream.

pub mod connection;
pub mod error;
pub mod transport;
pub mod wire;

pub use connection::{MessageReceiver, MessageSender, PeerConnection};
pub use error::ProtocolError;
pub use transport::{connect, resolve, NetplayListener};
