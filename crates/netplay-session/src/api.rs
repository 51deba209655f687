//! Synchronous facade for UI front-ends.
//!
//! Front-ends run on their own event loop thread and follow the classic
//! calling convention: write the resources, issue a command without
//! arguments, then re-read the mode. Commands return `0` on success and `-1`
//! on failure; failures are also reported to the user.

use std::sync::Arc;

use netplay_types::{ControlChannel, ControlMask, SessionMode, Side};
use tokio::runtime::Runtime;
use tracing::{error, warn};

use crate::error::{ResourceError, SessionError};
use crate::machine::MachineLink;
use crate::manager::{SessionManager, SessionOptions};
use crate::resources::{self, ResourceStore};
use crate::validate::{validate_address, validate_port};

/// Title of every netplay error message.
pub const ERROR_TITLE: &str = "Netplay error";

const START_SERVER_FAILED: &str = "An error occurred starting the server.";
const CONNECT_CLIENT_FAILED: &str = "An error occurred connecting the client.";

/// Modal message sink of the front-end.
pub trait UserMessages: Send {
    fn error(&mut self, title: &str, message: &str);
}

/// Netplay as seen from a UI thread.
pub struct Netplay<R: ResourceStore, U: UserMessages> {
    runtime: Runtime,
    manager: SessionManager,
    resources: R,
    messages: U,
}

impl<R: ResourceStore, U: UserMessages> Netplay<R, U> {
    /// Build the facade with its own multi-threaded runtime for network I/O.
    pub fn new(
        machine: Arc<dyn MachineLink>,
        options: SessionOptions,
        resources: R,
        messages: U,
    ) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("netplay")
            .enable_all()
            .build()?;
        let manager = SessionManager::new(machine, options);

        let netplay = Self {
            runtime,
            manager,
            resources,
            messages,
        };
        netplay.sync_control_mask();
        Ok(netplay)
    }

    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    pub fn resources(&self) -> &R {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut R {
        &mut self.resources
    }

    pub fn messages(&self) -> &U {
        &self.messages
    }

    /// Mode ordinal: 0 idle, 1 server, 2 server connected, 3 client.
    pub fn network_get_mode(&self) -> i32 {
        self.manager.mode().ordinal()
    }

    /// Whether a peer session is live.
    pub fn network_connected(&self) -> bool {
        self.manager.mode().is_connected()
    }

    /// Status label for the current mode.
    pub fn status_text(&self) -> &'static str {
        netplay_types::status_text(self.network_get_mode())
    }

    /// Start the server on the configured bind address and port.
    pub fn network_start_server(&mut self) -> i32 {
        let result = self.server_target().and_then(|(bind, port)| {
            self.sync_control_mask();
            self.runtime
                .block_on(self.manager.start_server(&bind, port))
        });
        self.report(result, "start server", START_SERVER_FAILED)
    }

    /// Connect to the configured server name and port.
    pub fn network_connect_client(&mut self) -> i32 {
        let result = self.client_target().and_then(|(host, port)| {
            self.sync_control_mask();
            self.runtime
                .block_on(self.manager.connect_client(&host, port))
        });
        self.report(result, "connect client", CONNECT_CLIENT_FAILED)
    }

    pub fn network_disconnect(&self) {
        self.manager.disconnect();
    }

    /// Handle the enable switch of a settings dialog.
    ///
    /// Any running session is dropped first, so switching roles never needs
    /// a separate disconnect. Returns whether the switch may stay in the
    /// requested position.
    pub fn enable_role(&mut self, role: Side, enabled: bool) -> bool {
        if self.manager.mode() != SessionMode::Idle {
            self.manager.disconnect();
        }
        if !enabled {
            return true;
        }
        let status = match role {
            Side::Server => self.network_start_server(),
            Side::Client => self.network_connect_client(),
        };
        status == 0
    }

    /// Flip one control checkbox, writing through the resource store.
    pub fn toggle_control(
        &mut self,
        channel: ControlChannel,
        side: Side,
    ) -> Result<ControlMask, ResourceError> {
        let current = self.resources.get_int(resources::CONTROL)?;
        let flipped = current ^ i64::from(ControlMask::flag(channel, side));
        self.resources.set_int(resources::CONTROL, flipped)?;
        self.sync_control_mask();
        Ok(self.manager.control_mask())
    }

    fn sync_control_mask(&self) {
        match self
            .resources
            .get_int(resources::CONTROL)
            .map(u16::try_from)
        {
            Ok(Ok(raw)) => self.manager.set_control_mask(ControlMask(raw)),
            Ok(Err(e)) => warn!(error = %e, "control resource out of range"),
            Err(e) => warn!(error = %e, "cannot read control resource"),
        }
    }

    fn server_target(&self) -> Result<(String, u16), SessionError> {
        let bind = self.resource_string(resources::SERVER_BIND_ADDRESS)?;
        let port = self.resource_port()?;
        Ok((bind, port))
    }

    fn client_target(&self) -> Result<(String, u16), SessionError> {
        let host = self.resource_string(resources::SERVER_NAME)?;
        let host = validate_address(&host)
            .map_err(|e| anyhow::anyhow!(e))?
            .to_string();
        let port = self.resource_port()?;
        Ok((host, port))
    }

    fn resource_string(&self, name: &str) -> Result<String, SessionError> {
        Ok(self
            .resources
            .get_string(name)
            .map_err(|e| anyhow::anyhow!(e))?)
    }

    fn resource_port(&self) -> Result<u16, SessionError> {
        let raw = self
            .resources
            .get_int(resources::SERVER_PORT)
            .map_err(|e| anyhow::anyhow!(e))?;
        Ok(validate_port(raw).map_err(|e| anyhow::anyhow!(e))?)
    }

    fn report(&mut self, result: Result<(), SessionError>, action: &str, message: &str) -> i32 {
        match result {
            Ok(()) => 0,
            Err(e) => {
                error!(error = %e, "failed to {action}");
                self.messages.error(ERROR_TITLE, message);
                -1
            }
        }
    }
}

impl<R: ResourceStore, U: UserMessages> Drop for Netplay<R, U> {
    fn drop(&mut self) {
        if self.manager.mode().is_active() {
            self.manager.disconnect();
        }
    }
}
