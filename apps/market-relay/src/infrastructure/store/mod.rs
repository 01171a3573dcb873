//! In-Process Store and Bus Adapters
//!
//! Implements the snapshot store / broadcast channel transport and the
//! command channel with in-process primitives: a lock-guarded map for
//! snapshot entries and tokio broadcast channels for fan-out. The external
//! key/value + pub/sub service this stands in for is out of scope; these
//! adapters preserve its keyspace and channel contract behind the ports, so
//! a networked implementation drops in without touching the relay core.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::application::ports::command_port::CommandSource;
use crate::application::ports::store_port::{
    ACCESS_TOKEN_KEY, BatchUpdate, StoreError, TickStore, full_key, ltp_key,
};
use crate::domain::session::SessionToken;

// =============================================================================
// Tick Store
// =============================================================================

/// In-process snapshot store + tick broadcast channel.
#[derive(Debug)]
pub struct MemoryTickStore {
    entries: RwLock<HashMap<String, String>>,
    ticks_tx: broadcast::Sender<String>,
}

impl MemoryTickStore {
    /// Create a store with the given broadcast capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ticks_tx: broadcast::channel(capacity).0,
        }
    }

    /// Read a snapshot entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    /// Subscribe to the tick broadcast channel.
    #[must_use]
    pub fn subscribe_ticks(&self) -> broadcast::Receiver<String> {
        self.ticks_tx.subscribe()
    }

    /// Number of live tick subscribers.
    #[must_use]
    pub fn tick_receiver_count(&self) -> usize {
        self.ticks_tx.receiver_count()
    }

    /// Number of snapshot entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the snapshot surface is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for MemoryTickStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl TickStore for MemoryTickStore {
    async fn apply(&self, update: BatchUpdate) -> Result<(), StoreError> {
        {
            let mut entries = self.entries.write();
            for (token, price) in &update.prices {
                entries.insert(ltp_key(*token), price.to_string());
            }
            for (token, json) in &update.full_ticks {
                entries.insert(full_key(*token), json.clone());
            }
        }

        for payload in update.publishes {
            // A send error only means no subscriber is currently listening.
            let _ = self.ticks_tx.send(payload);
        }

        Ok(())
    }

    async fn put_access_token(&self, token: &SessionToken) -> Result<(), StoreError> {
        self.entries
            .write()
            .insert(ACCESS_TOKEN_KEY.to_string(), token.as_str().to_string());
        Ok(())
    }
}

// =============================================================================
// Command Bus
// =============================================================================

/// In-process command channel.
///
/// The publishing side is what a downstream consumer holds; [`source`]
/// hands the relay its receiving end.
///
/// [`source`]: MemoryCommandBus::source
#[derive(Debug, Clone)]
pub struct MemoryCommandBus {
    tx: broadcast::Sender<String>,
}

impl MemoryCommandBus {
    /// Create a bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            tx: broadcast::channel(capacity).0,
        }
    }

    /// Publish a raw command payload.
    ///
    /// Returns the number of listeners that received it.
    pub fn publish(&self, payload: impl Into<String>) -> usize {
        self.tx.send(payload.into()).unwrap_or(0)
    }

    /// Create a receiving end for the command listener.
    #[must_use]
    pub fn source(&self) -> MemoryCommandSource {
        MemoryCommandSource {
            rx: self.tx.subscribe(),
        }
    }
}

/// Receiving end of the in-process command bus.
pub struct MemoryCommandSource {
    rx: broadcast::Receiver<String>,
}

#[async_trait]
impl CommandSource for MemoryCommandSource {
    async fn next_command(&mut self) -> Option<String> {
        loop {
            match self.rx.recv().await {
                Ok(payload) => return Some(payload),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Command listener lagged, commands dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
