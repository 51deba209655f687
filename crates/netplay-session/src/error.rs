//! Session, resource and validation errors.

use netplay_protocol::ProtocolError;
use netplay_types::SessionMode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot start server: {0}")]
    Bind(#[source] ProtocolError),

    #[error("cannot connect client: {0}")]
    Connect(#[source] ProtocolError),

    #[error("netplay session already active ({0})")]
    AlreadyActive(SessionMode),

    #[error("command cancelled by disconnect")]
    Cancelled,

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Rejected user input, caught before any command is issued.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("port {0} out of range 1..=65535")]
    PortOutOfRange(i64),

    #[error("address must not be empty")]
    EmptyAddress,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("unknown resource {0}")]
    Unknown(String),

    #[error("resource {0} has a different type")]
    WrongType(String),

    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}
