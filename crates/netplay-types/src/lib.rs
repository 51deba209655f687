//! Shared types for netplay.
//!
//! This crate contains the types shared across the netplay workspace:
//! session modes and their status text, control masks, emulator events that
//! cross the link, instance identity, and protocol messages.

pub mod control;
pub mod error;
pub mod event;
pub mod instance;
pub mod message;
pub mod mode;

pub use control::{ControlChannel, ControlMask, Side};
pub use error::TypesError;
pub use event::NetplayEvent;
pub use instance::InstanceId;
pub use message::{NetplayMessage, ProtocolVersion, PROTOCOL_VERSION};
pub use mode::{status_text, SessionMode};
