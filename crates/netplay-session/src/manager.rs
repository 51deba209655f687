//! The netplay session manager.
//!
//! One [`SessionManager`] owns one session. Commands are plain method calls
//! that either complete their transition or leave the mode untouched; the
//! listener and the peer link run as background tasks that update the mode
//! when a peer arrives or goes away.
//!
//! Every start of a session gets a new epoch. Background tasks carry the
//! epoch they were spawned for and only touch the shared state while it is
//! still current, so a task of a disconnected session can never change the
//! mode of a later one.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use netplay_protocol::{MessageReceiver, MessageSender, NetplayListener, PeerConnection};
use netplay_types::{ControlChannel, ControlMask, InstanceId, NetplayEvent, SessionMode, Side};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::SessionError;
use crate::link::{self, LinkEnd};
use crate::machine::MachineLink;

/// Capacity of the outbound and remote event queues.
const EVENT_QUEUE: usize = 1024;

/// How long a new command waits for the tasks of the previous session.
const RETIRE_TIMEOUT: Duration = Duration::from_secs(2);

/// Pause after a failed accept before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Tunables of a session manager.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub connect_timeout: Duration,
    pub handshake_timeout: Duration,
    pub control: ControlMask,
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            connect_timeout: config.timeouts.connect(),
            handshake_timeout: config.timeouts.handshake(),
            control: ControlMask(config.netplay.control),
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// The remote end of a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerInfo {
    pub instance: InstanceId,
    pub address: SocketAddr,
}

struct ActiveSession {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
    listen_addr: Option<SocketAddr>,
    peer: Option<PeerInfo>,
    outbound: Option<mpsc::Sender<NetplayEvent>>,
}

struct State {
    epoch: u64,
    /// Cancels the command currently between `reserve` and `settle`.
    pending: Option<watch::Sender<bool>>,
    control: ControlMask,
    session: Option<ActiveSession>,
    retiring: Vec<JoinHandle<()>>,
    remote_rx: Option<mpsc::Receiver<NetplayEvent>>,
}

struct Shared {
    instance: InstanceId,
    options: SessionOptions,
    machine: Arc<dyn MachineLink>,
    mode_tx: watch::Sender<SessionMode>,
    remote_tx: mpsc::Sender<NetplayEvent>,
    state: Mutex<State>,
}

/// Owner of the netplay session and its mode.
///
/// Cheap to clone; all clones control the same session.
#[derive(Clone)]
pub struct SessionManager {
    shared: Arc<Shared>,
}

impl SessionManager {
    /// Create an idle manager.
    pub fn new(machine: Arc<dyn MachineLink>, options: SessionOptions) -> Self {
        let (mode_tx, _) = watch::channel(SessionMode::Idle);
        let (remote_tx, remote_rx) = mpsc::channel(EVENT_QUEUE);
        let instance = InstanceId::new();
        debug!(instance = %instance, "netplay session manager created");

        Self {
            shared: Arc::new(Shared {
                instance,
                state: Mutex::new(State {
                    epoch: 0,
                    pending: None,
                    control: options.control,
                    session: None,
                    retiring: Vec::new(),
                    remote_rx: Some(remote_rx),
                }),
                options,
                machine,
                mode_tx,
                remote_tx,
            }),
        }
    }

    /// Identity announced to peers.
    pub fn instance_id(&self) -> InstanceId {
        self.shared.instance
    }

    /// Current mode. Never blocks on network activity.
    pub fn mode(&self) -> SessionMode {
        *self.shared.mode_tx.borrow()
    }

    /// Receive every mode change instead of polling [`mode`](Self::mode).
    pub fn subscribe(&self) -> watch::Receiver<SessionMode> {
        self.shared.mode_tx.subscribe()
    }

    /// Address the server is listening on, while in a server mode.
    pub fn listen_addr(&self) -> Option<SocketAddr> {
        self.lock().session.as_ref().and_then(|s| s.listen_addr)
    }

    /// The connected peer, while a session is live.
    pub fn peer(&self) -> Option<PeerInfo> {
        self.lock().session.as_ref().and_then(|s| s.peer)
    }

    pub fn control_mask(&self) -> ControlMask {
        self.lock().control
    }

    /// Replace the control mask. Last write wins.
    pub fn set_control_mask(&self, mask: ControlMask) {
        self.lock().control = mask;
        debug!(mask = %mask, "control mask updated");
    }

    /// Flip one channel bit and return the new mask.
    pub fn toggle_control(&self, channel: ControlChannel, side: Side) -> ControlMask {
        let mut state = self.lock();
        state.control = state.control.toggled(channel, side);
        debug!(mask = %state.control, ?channel, ?side, "control mask toggled");
        state.control
    }

    /// Take the stream of events received from peers.
    ///
    /// Returns `None` once taken. Events arriving while nobody holds the
    /// receiver are queued up to a bound and then dropped.
    pub fn take_remote_events(&self) -> Option<mpsc::Receiver<NetplayEvent>> {
        self.lock().remote_rx.take()
    }

    /// Offer a locally recorded event to the peer.
    ///
    /// Returns whether the event was queued for sending: there must be a live
    /// session and the control mask must let this side forward the event's
    /// channel.
    pub fn record_event(&self, event: NetplayEvent) -> bool {
        let state = self.lock();
        let side = match self.mode() {
            SessionMode::ServerConnected => Side::Server,
            SessionMode::Client => Side::Client,
            SessionMode::Idle | SessionMode::Server => return false,
        };

        if let Some(channel) = event.channel() {
            if !state.control.permits(channel, side) {
                debug!(?channel, ?side, "event filtered by control mask");
                return false;
            }
        }

        let Some(outbound) = state.session.as_ref().and_then(|s| s.outbound.as_ref()) else {
            return false;
        };
        match outbound.try_send(event) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "dropping local event");
                false
            }
        }
    }

    /// Listen for a client on `bind_address:port`.
    ///
    /// An empty bind address listens on all interfaces; port 0 picks a free
    /// port (see [`listen_addr`](Self::listen_addr)).
    pub async fn start_server(&self, bind_address: &str, port: u16) -> Result<(), SessionError> {
        let (ticket, mut cancel) = self.reserve()?;
        self.retire_previous().await;

        info!(bind = bind_address, port, "starting netplay server");
        let result = tokio::select! {
            _ = cancel.changed() => Err(SessionError::Cancelled),
            bound = NetplayListener::bind(bind_address, port) => bound.map_err(SessionError::Bind),
        };

        let mut state = self.lock();
        let listener = settle(&mut state, ticket, result)?;
        let listen_addr = listener.local_addr().ok();

        state.epoch += 1;
        let epoch = state.epoch;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.clone().serve(epoch, listener, shutdown_rx));
        state.session = Some(ActiveSession {
            shutdown: shutdown_tx,
            task: Some(task),
            listen_addr,
            peer: None,
            outbound: None,
        });
        self.set_mode(SessionMode::Server);
        drop(state);

        info!(addr = ?listen_addr, "server is waiting for a client");
        Ok(())
    }

    /// Connect to the server at `server_name:port`.
    ///
    /// Returns once the handshake is done and the server's snapshot is
    /// loaded.
    pub async fn connect_client(&self, server_name: &str, port: u16) -> Result<(), SessionError> {
        let (ticket, mut cancel) = self.reserve()?;
        self.retire_previous().await;

        info!(server = server_name, port, "connecting netplay client");
        let result = tokio::select! {
            _ = cancel.changed() => Err(SessionError::Cancelled),
            link = self.open_client_link(server_name, port) => link,
        };

        let mut state = self.lock();
        let (tx, rx, peer) = settle(&mut state, ticket, result)?;

        state.epoch += 1;
        let epoch = state.epoch;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (outbound_tx, outbound_rx) = mpsc::channel(EVENT_QUEUE);
        let task = tokio::spawn(self.clone().drive_client(epoch, tx, rx, outbound_rx, shutdown_rx));
        state.session = Some(ActiveSession {
            shutdown: shutdown_tx,
            task: Some(task),
            listen_addr: None,
            peer: Some(peer),
            outbound: Some(outbound_tx),
        });
        self.set_mode(SessionMode::Client);
        drop(state);

        info!(peer = %peer.instance, addr = %peer.address, "client connected");
        Ok(())
    }

    /// Tear down whatever is running and return to idle.
    ///
    /// Callable in any mode, including idle. Also cancels a command that is
    /// still in flight; its sockets are dropped right away and a new command
    /// may start immediately.
    pub fn disconnect(&self) {
        let mut state = self.lock();
        let was = self.mode();
        state.epoch += 1;
        if let Some(cancel) = state.pending.take() {
            let _ = cancel.send(true);
            debug!("cancelled pending command");
        }
        if let Some(mut session) = state.session.take() {
            let _ = session.shutdown.send(true);
            if let Some(task) = session.task.take() {
                state.retiring.push(task);
            }
        }
        self.set_mode(SessionMode::Idle);
        drop(state);

        if was == SessionMode::Idle {
            debug!("disconnect while idle");
        } else {
            info!(was = %was, "netplay disconnected");
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn set_mode(&self, mode: SessionMode) {
        let old = self.shared.mode_tx.send_replace(mode);
        if old != mode {
            debug!(from = %old, to = %mode, "mode changed");
        }
    }

    /// Claim the right to perform a transition out of idle.
    ///
    /// Returns the epoch the command belongs to and a signal that fires when
    /// a disconnect cancels it.
    fn reserve(&self) -> Result<(u64, watch::Receiver<bool>), SessionError> {
        let mut state = self.lock();
        let mode = self.mode();
        if mode != SessionMode::Idle || state.pending.is_some() {
            return Err(SessionError::AlreadyActive(mode));
        }
        let (cancel_tx, cancel_rx) = watch::channel(false);
        state.pending = Some(cancel_tx);
        Ok((state.epoch, cancel_rx))
    }

    /// Wait for the tasks of earlier sessions so their sockets are closed.
    async fn retire_previous(&self) {
        let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut self.lock().retiring);
        for task in tasks {
            if tokio::time::timeout(RETIRE_TIMEOUT, task).await.is_err() {
                warn!("previous session did not stop in time");
            }
        }
    }

    async fn open_client_link(
        &self,
        server_name: &str,
        port: u16,
    ) -> Result<(MessageSender, MessageReceiver, PeerInfo), SessionError> {
        let conn = netplay_protocol::connect(server_name, port, self.shared.options.connect_timeout)
            .await
            .map_err(SessionError::Connect)?;
        let address = conn.remote_address();
        let (mut tx, mut rx) = conn.into_split();

        let timeout = self.shared.options.handshake_timeout;
        let instance = link::handshake_initiator(
            &mut tx,
            &mut rx,
            self.shared.instance,
            self.control_mask(),
            timeout,
        )
        .await?;
        link::receive_snapshot(&mut rx, self.shared.machine.as_ref(), timeout).await?;

        Ok((tx, rx, PeerInfo { instance, address }))
    }

    /// Listener task: accept clients one at a time until shut down.
    async fn serve(
        self,
        epoch: u64,
        listener: NetplayListener,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            let conn = tokio::select! {
                _ = shutdown.changed() => break,
                accepted = listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        if back_off(&mut shutdown).await {
                            break;
                        }
                        continue;
                    }
                },
            };

            if self.host_client(epoch, conn, &mut shutdown).await == LinkEnd::Shutdown {
                break;
            }
        }
        debug!(epoch, "listener stopped");
    }

    /// Run one accepted client from handshake to hang-up.
    async fn host_client(
        &self,
        epoch: u64,
        conn: PeerConnection,
        shutdown: &mut watch::Receiver<bool>,
    ) -> LinkEnd {
        let address = conn.remote_address();
        let (mut tx, mut rx) = conn.into_split();

        let setup = async {
            let instance = link::handshake_responder(
                &mut tx,
                &mut rx,
                self.shared.instance,
                self.control_mask(),
                self.shared.options.handshake_timeout,
            )
            .await?;
            link::send_snapshot(&mut tx, self.shared.machine.as_ref()).await?;
            Ok::<_, SessionError>(instance)
        };
        let instance = tokio::select! {
            _ = shutdown.changed() => return LinkEnd::Shutdown,
            result = setup => match result {
                Ok(instance) => instance,
                Err(e) => {
                    warn!(remote = %address, error = %e, "client setup failed");
                    return LinkEnd::PeerLost;
                }
            },
        };

        let peer = PeerInfo { instance, address };
        let (outbound_tx, outbound_rx) = mpsc::channel(EVENT_QUEUE);
        {
            let mut state = self.lock();
            if state.epoch != epoch {
                return LinkEnd::Shutdown;
            }
            if let Some(session) = state.session.as_mut() {
                session.peer = Some(peer);
                session.outbound = Some(outbound_tx);
            }
            self.set_mode(SessionMode::ServerConnected);
        }
        info!(peer = %instance, remote = %address, "client connected");

        let end = link::run(tx, rx, outbound_rx, self.shared.remote_tx.clone(), shutdown).await;

        let mut state = self.lock();
        if state.epoch == epoch {
            if let Some(session) = state.session.as_mut() {
                session.peer = None;
                session.outbound = None;
            }
            self.set_mode(SessionMode::Server);
            info!(peer = %instance, ?end, "client left, waiting for a new one");
        }
        end
    }

    /// Client link task: run until either side hangs up.
    async fn drive_client(
        self,
        epoch: u64,
        tx: MessageSender,
        rx: MessageReceiver,
        outbound: mpsc::Receiver<NetplayEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let end = link::run(tx, rx, outbound, self.shared.remote_tx.clone(), &mut shutdown).await;

        let mut state = self.lock();
        if state.epoch == epoch {
            state.epoch += 1;
            state.session = None;
            self.set_mode(SessionMode::Idle);
            info!(?end, "remote host disconnected");
        }
    }
}

/// Release the reservation and decide whether the command may commit.
///
/// A disconnect has already released the reservation of a command it
/// overtook, and a newer command may hold it by now.
fn settle<T>(
    state: &mut State,
    ticket: u64,
    result: Result<T, SessionError>,
) -> Result<T, SessionError> {
    if state.epoch != ticket {
        debug!("command overtaken by disconnect");
        return Err(SessionError::Cancelled);
    }
    state.pending = None;
    result
}

/// Wait before retrying a failed accept. Returns true if shut down meanwhile.
async fn back_off(shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = shutdown.changed() => true,
        () = tokio::time::sleep(ACCEPT_BACKOFF) => false,
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("instance", &self.shared.instance)
            .field("mode", &self.mode())
            .finish_non_exhaustive()
    }
}
