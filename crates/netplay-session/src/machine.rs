//! Machine capability the session needs from the emulator core.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

/// Snapshot access to the emulated machine.
///
/// When a client joins, the server's machine state is captured and shipped
/// so both instances start from the same point.
#[async_trait]
pub trait MachineLink: Send + Sync + 'static {
    /// Capture the current machine state (server side).
    async fn snapshot(&self) -> anyhow::Result<Vec<u8>>;

    /// Load a snapshot received from the server (client side).
    async fn restore(&self, snapshot: Vec<u8>) -> anyhow::Result<()>;
}

/// Machine without state: sends empty snapshots and ignores received ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMachine;

#[async_trait]
impl MachineLink for NullMachine {
    async fn snapshot(&self) -> anyhow::Result<Vec<u8>> {
        Ok(Vec::new())
    }

    async fn restore(&self, _snapshot: Vec<u8>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Machine whose state is a byte buffer held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryMachine {
    state: Arc<Mutex<Vec<u8>>>,
}

impl MemoryMachine {
    pub fn new(state: Vec<u8>) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Current state bytes.
    pub fn state(&self) -> Vec<u8> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl MachineLink for MemoryMachine {
    async fn snapshot(&self) -> anyhow::Result<Vec<u8>> {
        Ok(self.state())
    }

    async fn restore(&self, snapshot: Vec<u8>) -> anyhow::Result<()> {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = snapshot;
        Ok(())
    }
}
