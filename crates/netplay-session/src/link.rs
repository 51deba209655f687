//! Peer link: handshake, snapshot transfer and event exchange.

use std::time::Duration;

use netplay_protocol::{MessageReceiver, MessageSender, ProtocolError};
use netplay_types::{ControlMask, InstanceId, NetplayEvent, NetplayMessage, PROTOCOL_VERSION};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::machine::MachineLink;

/// Upper bound for the goodbye sent on a local disconnect.
const BYE_TIMEOUT: Duration = Duration::from_secs(1);

/// Why an established link stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LinkEnd {
    /// The local side disconnected.
    Shutdown,
    /// The peer said goodbye or closed the stream cleanly.
    PeerLeft,
    /// The stream broke.
    PeerLost,
}

async fn recv_within(
    rx: &mut MessageReceiver,
    timeout: Duration,
) -> Result<NetplayMessage, SessionError> {
    let msg = tokio::time::timeout(timeout, rx.recv::<NetplayMessage>())
        .await
        .map_err(|_| ProtocolError::Timeout(timeout))??
        .ok_or(ProtocolError::StreamClosed)?;
    Ok(msg)
}

fn verify_version(remote: netplay_types::ProtocolVersion) -> Result<(), SessionError> {
    if !PROTOCOL_VERSION.is_compatible(remote) {
        return Err(ProtocolError::VersionMismatch {
            remote: remote.to_string(),
            local: PROTOCOL_VERSION.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Client side of the handshake: send Hello, receive Welcome.
pub(crate) async fn handshake_initiator(
    tx: &mut MessageSender,
    rx: &mut MessageReceiver,
    our_id: InstanceId,
    control: ControlMask,
    timeout: Duration,
) -> Result<InstanceId, SessionError> {
    tx.send(&NetplayMessage::Hello {
        version: PROTOCOL_VERSION,
        instance: our_id,
        control,
    })
    .await?;
    debug!("sent Hello");

    match recv_within(rx, timeout).await? {
        NetplayMessage::Welcome {
            version,
            instance,
            control: remote_control,
        } => {
            verify_version(version)?;
            if remote_control != control {
                debug!(local = %control, remote = %remote_control, "control masks differ");
            }
            info!(peer = %instance, "handshake complete (initiator)");
            Ok(instance)
        }
        other => Err(ProtocolError::Handshake(format!(
            "expected Welcome, got {}",
            message_name(&other)
        ))
        .into()),
    }
}

/// Server side of the handshake: receive Hello, send Welcome.
pub(crate) async fn handshake_responder(
    tx: &mut MessageSender,
    rx: &mut MessageReceiver,
    our_id: InstanceId,
    control: ControlMask,
    timeout: Duration,
) -> Result<InstanceId, SessionError> {
    match recv_within(rx, timeout).await? {
        NetplayMessage::Hello {
            version, instance, ..
        } => {
            verify_version(version)?;
            tx.send(&NetplayMessage::Welcome {
                version: PROTOCOL_VERSION,
                instance: our_id,
                control,
            })
            .await?;
            info!(peer = %instance, "handshake complete (responder)");
            Ok(instance)
        }
        other => Err(ProtocolError::Handshake(format!(
            "expected Hello, got {}",
            message_name(&other)
        ))
        .into()),
    }
}

/// Capture the local machine and ship it to the client.
pub(crate) async fn send_snapshot(
    tx: &mut MessageSender,
    machine: &dyn MachineLink,
) -> Result<(), SessionError> {
    let snapshot = machine
        .snapshot()
        .await
        .map_err(|e| SessionError::Snapshot(format!("cannot create snapshot: {e}")))?;
    let size = snapshot.len();
    tx.send(&NetplayMessage::Snapshot(snapshot)).await?;
    info!(size, "sent snapshot to client");
    Ok(())
}

/// Receive the server's snapshot and load it.
pub(crate) async fn receive_snapshot(
    rx: &mut MessageReceiver,
    machine: &dyn MachineLink,
    timeout: Duration,
) -> Result<(), SessionError> {
    match recv_within(rx, timeout).await? {
        NetplayMessage::Snapshot(snapshot) => {
            let size = snapshot.len();
            machine
                .restore(snapshot)
                .await
                .map_err(|e| SessionError::Snapshot(format!("cannot load snapshot: {e}")))?;
            info!(size, "loaded snapshot from server");
            Ok(())
        }
        other => Err(ProtocolError::Handshake(format!(
            "expected Snapshot, got {}",
            message_name(&other)
        ))
        .into()),
    }
}

/// Exchange events with the peer until either side stops.
pub(crate) async fn run(
    mut tx: MessageSender,
    rx: MessageReceiver,
    mut outbound: mpsc::Receiver<NetplayEvent>,
    remote: mpsc::Sender<NetplayEvent>,
    shutdown: &mut watch::Receiver<bool>,
) -> LinkEnd {
    // A dedicated reader keeps frame reads from being cut short by select!.
    let (inbound_tx, mut inbound) = mpsc::channel(64);
    let reader = tokio::spawn(read_loop(rx, inbound_tx));

    let end = loop {
        tokio::select! {
            _ = shutdown.changed() => break LinkEnd::Shutdown,
            Some(event) = outbound.recv() => {
                let mut batch = vec![event];
                while let Ok(more) = outbound.try_recv() {
                    batch.push(more);
                }
                if let Err(e) = tx.send(&NetplayMessage::Events(batch)).await {
                    warn!(error = %e, "failed to send events to peer");
                    break LinkEnd::PeerLost;
                }
            }
            msg = inbound.recv() => match msg {
                Some(Ok(NetplayMessage::Events(events))) => deliver(&remote, events),
                Some(Ok(NetplayMessage::Bye)) => {
                    info!("peer sent Bye");
                    break LinkEnd::PeerLeft;
                }
                Some(Ok(other)) => {
                    debug!(message = message_name(&other), "ignoring unexpected message");
                }
                Some(Err(e)) => {
                    warn!(error = %e, "peer link failed");
                    break LinkEnd::PeerLost;
                }
                None => {
                    info!("peer closed the connection");
                    break LinkEnd::PeerLeft;
                }
            }
        }
    };

    reader.abort();
    if end == LinkEnd::Shutdown {
        say_goodbye(tx).await;
    }
    end
}

async fn read_loop(
    mut rx: MessageReceiver,
    inbound: mpsc::Sender<Result<NetplayMessage, ProtocolError>>,
) {
    loop {
        match rx.recv::<NetplayMessage>().await {
            Ok(Some(msg)) => {
                if inbound.send(Ok(msg)).await.is_err() {
                    return;
                }
            }
            Ok(None) => return,
            Err(e) => {
                let _ = inbound.send(Err(e)).await;
                return;
            }
        }
    }
}

fn deliver(remote: &mpsc::Sender<NetplayEvent>, events: Vec<NetplayEvent>) {
    debug!(count = events.len(), "received events from peer");
    for event in events {
        if let Err(e) = remote.try_send(event) {
            warn!(error = %e, "dropping remote event");
        }
    }
}

async fn say_goodbye(tx: MessageSender) {
    let bye = async move {
        let mut tx = tx;
        tx.send(&NetplayMessage::Bye).await?;
        tx.finish().await
    };
    match tokio::time::timeout(BYE_TIMEOUT, bye).await {
        Ok(Ok(())) => debug!("sent Bye"),
        Ok(Err(e)) => debug!(error = %e, "could not send Bye"),
        Err(_) => debug!("timed out sending Bye"),
    }
}

fn message_name(msg: &NetplayMessage) -> &'static str {
    match msg {
        NetplayMessage::Hello { .. } => "Hello",
        NetplayMessage::Welcome { .. } => "Welcome",
        NetplayMessage::Snapshot(_) => "Snapshot",
        NetplayMessage::Events(_) => "Events",
        NetplayMessage::Bye => "Bye",
    }
}
