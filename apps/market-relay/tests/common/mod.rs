//! Shared test fakes: a scripted feed transport, a recording store, and a
//! scripted session source.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use market_relay::{
    AuthError, BatchUpdate, ConnectionConfig, FeedCommand, FeedError, FeedMessage, FeedSink,
    FeedSource, FeedTransport, ReconnectConfig, SessionSource, SessionToken, StoreError, TickStore,
};

// =============================================================================
// Scripted Feed Transport
// =============================================================================

/// Test-side handle to one scripted connection.
pub struct StreamHandle {
    /// Feed messages into the relay through this sender; dropping it ends
    /// the stream.
    pub messages: mpsc::Sender<Result<FeedMessage, FeedError>>,
    /// Commands the relay sent on this connection.
    pub sent: Arc<Mutex<Vec<FeedCommand>>>,
}

/// Relay-side halves of a scripted connection.
pub struct FakeConnection {
    sink: FakeSink,
    source: FakeSource,
}

/// Command sink recording everything the relay sends.
pub struct FakeSink {
    sent: Arc<Mutex<Vec<FeedCommand>>>,
}

/// Message source fed by the test through [`StreamHandle::messages`].
pub struct FakeSource {
    rx: mpsc::Receiver<Result<FeedMessage, FeedError>>,
}

/// Create a scripted connection pair.
pub fn scripted_stream() -> (FakeConnection, StreamHandle) {
    let (tx, rx) = mpsc::channel(64);
    let sent = Arc::new(Mutex::new(Vec::new()));
    (
        FakeConnection {
            sink: FakeSink {
                sent: Arc::clone(&sent),
            },
            source: FakeSource { rx },
        },
        StreamHandle { messages: tx, sent },
    )
}

#[async_trait]
impl FeedSink for FakeSink {
    async fn send(&mut self, command: FeedCommand) -> Result<(), FeedError> {
        self.sent.lock().push(command);
        Ok(())
    }
}

#[async_trait]
impl FeedSource for FakeSource {
    async fn next_message(&mut self) -> Option<Result<FeedMessage, FeedError>> {
        self.rx.recv().await
    }
}

/// Feed transport handing out connections the test offers.
///
/// `connect` blocks until the test supplies the next [`FakeConnection`], so
/// the test controls exactly when each (re)connection is established.
pub struct FakeTransport {
    offers: tokio::sync::Mutex<mpsc::Receiver<FakeConnection>>,
    connects: AtomicUsize,
}

impl FakeTransport {
    /// Create the transport and the offer sender the test keeps.
    pub fn new() -> (Arc<Self>, mpsc::Sender<FakeConnection>) {
        let (tx, rx) = mpsc::channel(8);
        (
            Arc::new(Self {
                offers: tokio::sync::Mutex::new(rx),
                connects: AtomicUsize::new(0),
            }),
            tx,
        )
    }

    /// Number of connections established so far.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedTransport for FakeTransport {
    async fn connect(
        &self,
        _session: &SessionToken,
    ) -> Result<(Box<dyn FeedSink>, Box<dyn FeedSource>), FeedError> {
        match self.offers.lock().await.recv().await {
            Some(connection) => {
                self.connects.fetch_add(1, Ordering::SeqCst);
                Ok((Box::new(connection.sink), Box::new(connection.source)))
            }
            None => Err(FeedError::Connect("no scripted connection left".to_string())),
        }
    }
}

// =============================================================================
// Recording Store
// =============================================================================

/// Tick store that records every batch it is handed.
#[derive(Default)]
pub struct RecordingStore {
    /// Every batch committed through `apply`, in order.
    pub updates: Mutex<Vec<BatchUpdate>>,
    /// Every credential persisted through `put_access_token`.
    pub access_tokens: Mutex<Vec<String>>,
}

#[async_trait]
impl TickStore for RecordingStore {
    async fn apply(&self, update: BatchUpdate) -> Result<(), StoreError> {
        self.updates.lock().push(update);
        Ok(())
    }

    async fn put_access_token(&self, token: &SessionToken) -> Result<(), StoreError> {
        self.access_tokens.lock().push(token.as_str().to_string());
        Ok(())
    }
}

// =============================================================================
// Scripted Session Source
// =============================================================================

/// Session source that plays back a fixed script, then blocks forever.
pub struct ScriptedSessions {
    script: Mutex<VecDeque<Result<SessionToken, AuthError>>>,
    acquires: AtomicUsize,
}

impl ScriptedSessions {
    /// Create a source playing back the given results in order.
    pub fn new(script: Vec<Result<SessionToken, AuthError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            acquires: AtomicUsize::new(0),
        })
    }

    /// Number of acquisition attempts made so far.
    pub fn acquire_count(&self) -> usize {
        self.acquires.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionSource for ScriptedSessions {
    async fn acquire(&self) -> Result<SessionToken, AuthError> {
        self.acquires.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();
        match next {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Connection config with near-instant reconnects for tests.
pub fn fast_connection_config() -> ConnectionConfig {
    ConnectionConfig {
        reconnect: ReconnectConfig {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            multiplier: 2.0,
            jitter_factor: 0.0,
        },
        idle_timeout: Duration::from_secs(5),
        store_full_ticks: false,
    }
}

/// Poll until the condition holds, failing after the deadline.
pub async fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) {
    let start = tokio::time::Instant::now();
    while !condition() {
        assert!(
            start.elapsed() < deadline,
            "condition not met within {deadline:?}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
