//! TCP transport: resolve, listen, accept and connect.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{lookup_host, TcpListener, TcpStream};
use tracing::{debug, info};

use crate::connection::PeerConnection;
use crate::error::ProtocolError;

/// Resolve `host:port`. An empty host means every local interface.
pub async fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>, ProtocolError> {
    let host = if host.is_empty() { "0.0.0.0" } else { host };
    let addrs: Vec<SocketAddr> = lookup_host((host, port))
        .await
        .map_err(|e| ProtocolError::Resolve {
            host: host.to_string(),
            reason: e.to_string(),
        })?
        .collect();

    if addrs.is_empty() {
        return Err(ProtocolError::Resolve {
            host: host.to_string(),
            reason: "no addresses found".to_string(),
        });
    }
    Ok(addrs)
}

/// Listening socket of a netplay server.
pub struct NetplayListener {
    listener: TcpListener,
}

impl NetplayListener {
    /// Bind a listener on `host:port`.
    ///
    /// Every resolved address is tried in turn; the first that binds wins.
    pub async fn bind(host: &str, port: u16) -> Result<Self, ProtocolError> {
        let mut last_error = None;
        for addr in resolve(host, port).await? {
            match TcpListener::bind(addr).await {
                Ok(listener) => {
                    info!(addr = %addr, "netplay listener bound");
                    return Ok(Self { listener });
                }
                Err(e) => {
                    debug!(addr = %addr, error = %e, "bind attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(ProtocolError::Bind {
            addr: format!("{host}:{port}"),
            reason: last_error.map_or_else(|| "no usable address".to_string(), |e| e.to_string()),
        })
    }

    /// Accept an incoming connection.
    pub async fn accept(&self) -> Result<PeerConnection, ProtocolError> {
        let (stream, remote) = self.listener.accept().await?;
        debug!(remote = %remote, "accepted connection");
        PeerConnection::new(stream)
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ProtocolError> {
        Ok(self.listener.local_addr()?)
    }
}

/// Connect to a remote netplay server, giving up after `timeout`.
pub async fn connect(
    host: &str,
    port: u16,
    timeout: Duration,
) -> Result<PeerConnection, ProtocolError> {
    let attempt = async {
        let mut last_error = None;
        for addr in resolve(host, port).await? {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    debug!(remote = %addr, "connected to peer");
                    return PeerConnection::new(stream);
                }
                Err(e) => {
                    debug!(remote = %addr, error = %e, "connect attempt failed");
                    last_error = Some(e);
                }
            }
        }
        Err(ProtocolError::Connect {
            addr: format!("{host}:{port}"),
            reason: last_error.map_or_else(|| "no usable address".to_string(), |e| e.to_string()),
        })
    };

    tokio::time::timeout(timeout, attempt)
        .await
        .map_err(|_| ProtocolError::Timeout(timeout))?
}
