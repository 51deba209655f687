//! Netplay session manager.
//!
//! Owns the single netplay session of an emulator instance: the mode state
//! machine (idle, server, server connected, client), the listener and peer
//! link tasks, the control mask deciding which events cross the link, the
//! string-keyed resource store the settings front-ends write to, and a
//! synchronous facade following the `network_*()` calling convention.

pub mod api;
pub mod config;
pub mod error;
mod link;
pub mod machine;
pub mod manager;
pub mod resources;
pub mod setup;
pub mod validate;

pub use api::{Netplay, UserMessages};
pub use config::Config;
pub use error::{ResourceError, SessionError, ValidationError};
pub use machine::{MachineLink, MemoryMachine, NullMachine};
pub use manager::{PeerInfo, SessionManager, SessionOptions};
pub use resources::{NetplayResources, ResourceStore};
