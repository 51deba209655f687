//! Protocol and transport errors.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("cannot resolve {host}: {reason}")]
    Resolve { host: String, reason: String },

    #[error("cannot listen on {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("cannot connect to {addr}: {reason}")]
    Connect { addr: String, reason: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("incompatible protocol version: remote {remote}, local {local}")]
    VersionMismatch { remote: String, local: String },

    #[error("serialisation error: {0}")]
    Serialization(String),

    #[error("deserialisation error: {0}")]
    Deserialization(String),

    #[error("stream closed unexpectedly")]
    StreamClosed,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
