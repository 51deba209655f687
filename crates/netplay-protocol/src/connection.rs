//! TCP connection and stream framing.

use std::net::SocketAddr;

use bincode::{Decode, Encode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::trace;

use crate::error::ProtocolError;
use crate::wire::{self, MAX_MESSAGE_SIZE};

/// A connection to a remote netplay peer.
pub struct PeerConnection {
    stream: TcpStream,
    remote: SocketAddr,
}

impl PeerConnection {
    pub fn new(stream: TcpStream) -> Result<Self, ProtocolError> {
        // Frames are small and latency matters more than throughput.
        stream.set_nodelay(true)?;
        let remote = stream.peer_addr()?;
        Ok(Self { stream, remote })
    }

    /// Get the remote address of this connection.
    pub fn remote_address(&self) -> SocketAddr {
        self.remote
    }

    /// Split into independently owned send and receive halves.
    pub fn into_split(self) -> (MessageSender, MessageReceiver) {
        let (read, write) = self.stream.into_split();
        (MessageSender::new(write), MessageReceiver::new(read))
    }
}

/// Sends length-prefixed bincode messages over the write half of a stream.
pub struct MessageSender {
    stream: OwnedWriteHalf,
}

impl MessageSender {
    fn new(stream: OwnedWriteHalf) -> Self {
        Self { stream }
    }

    /// Send a message, encoding it as length-prefixed bincode.
    pub async fn send<T: Encode>(&mut self, msg: &T) -> Result<(), ProtocolError> {
        let frame = wire::encode_message(msg)?;
        self.stream.write_all(&frame).await?;
        self.stream.flush().await?;
        trace!(len = frame.len() - 4, "sent message");
        Ok(())
    }

    /// Shut down the write direction (signal no more data).
    pub async fn finish(mut self) -> Result<(), ProtocolError> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

/// Receives length-prefixed bincode messages from the read half of a stream.
pub struct MessageReceiver {
    stream: OwnedReadHalf,
}

impl MessageReceiver {
    fn new(stream: OwnedReadHalf) -> Self {
        Self { stream }
    }

    /// Receive and decode a message.
    ///
    /// Returns `None` if the peer closed the stream on a frame boundary.
    pub async fn recv<T: Decode<()>>(&mut self) -> Result<Option<T>, ProtocolError> {
        let mut len_buf = [0u8; 4];
        match self.stream.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(ProtocolError::Io(e)),
        }

        let len = u32::from_be_bytes(len_buf);
        if len > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::Deserialization(format!(
                "message size {len} exceeds maximum {MAX_MESSAGE_SIZE}"
            )));
        }

        let mut payload = vec![0u8; len as usize];
        match self.stream.read_exact(&mut payload).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(ProtocolError::StreamClosed);
            }
            Err(e) => return Err(ProtocolError::Io(e)),
        }

        let msg = wire::decode_message(&payload)?;
        trace!(len, "received message");
        Ok(Some(msg))
    }
}
