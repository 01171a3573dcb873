//! Connection Manager
//!
//! Owns the single streaming connection to the upstream feed and drives it
//! through an explicit state machine:
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> { Reconnecting -> Connecting
//!                                            | Terminated }
//! ```
//!
//! On every transition into `Connected` the manager re-issues a full-mode
//! subscribe for the entire registry snapshot - the upstream vendor does not
//! remember prior subscriptions across a fresh socket. Each inbound tick
//! batch is fanned into the snapshot store and the broadcast channel as one
//! atomic unit of work. Transport losses reconnect internally with backoff;
//! a hard authentication revocation propagates out as
//! [`ConnectionError::SessionRejected`] so the supervisor can re-run session
//! acquisition.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU32, AtomicU64, AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::application::ports::feed_port::{
    FeedCommand, FeedError, FeedMessage, FeedSink, FeedSource, FeedTransport,
    SESSION_REVOKED_CODE, SubscriptionMode,
};
use crate::application::ports::store_port::{BatchUpdate, TickStore};
use crate::domain::registry::SubscriptionRegistry;
use crate::domain::session::SessionToken;
use crate::domain::tick::{InstrumentToken, TickBatch};
use crate::infrastructure::metrics;

use super::reconnect::{ReconnectConfig, ReconnectPolicy};

// =============================================================================
// Errors
// =============================================================================

/// Errors surfaced by the connection manager.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConnectionError {
    /// Transport-level failure. Handled internally by reconnecting; never
    /// escapes [`ConnectionManager::run`].
    #[error("upstream transport failure: {0}")]
    Transport(String),

    /// The upstream rejected the session outright. Propagates to the
    /// supervisor to trigger full re-authentication.
    #[error("upstream session rejected: {0}")]
    SessionRejected(String),
}

// =============================================================================
// Connection State
// =============================================================================

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ConnectionState {
    /// No connection attempt yet.
    #[default]
    Disconnected = 0,
    /// Connection attempt in flight.
    Connecting = 1,
    /// Streaming and subscribed.
    Connected = 2,
    /// Waiting out the backoff delay before the next attempt.
    Reconnecting = 3,
    /// The manager has returned and will not reconnect.
    Terminated = 4,
}

impl ConnectionState {
    /// State name for health reporting.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Terminated => "terminated",
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Reconnecting,
            4 => Self::Terminated,
            _ => Self::Disconnected,
        }
    }
}

/// Observable feed connection status, shared with the health endpoint.
#[derive(Debug, Default)]
pub struct FeedStatus {
    state: AtomicU8,
    messages_received: AtomicU64,
    reconnect_attempts: AtomicU32,
    subscription_count: AtomicUsize,
    last_error: RwLock<Option<String>>,
}

impl FeedStatus {
    /// Create a status in the `Disconnected` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Relaxed))
    }

    /// Total ticks received this process lifetime.
    #[must_use]
    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    /// Reconnection attempts made this process lifetime.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts.load(Ordering::Relaxed)
    }

    /// Number of instruments subscribed on the live connection.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscription_count.load(Ordering::Relaxed)
    }

    /// Most recent error message, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Relaxed);
    }

    fn record_messages(&self, count: u64) {
        self.messages_received.fetch_add(count, Ordering::Relaxed);
    }

    fn record_reconnect(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    fn set_subscription_count(&self, count: usize) {
        self.subscription_count.store(count, Ordering::Relaxed);
    }

    fn set_error(&self, message: String) {
        *self.last_error.write() = Some(message);
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Connection manager configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Backoff policy for reconnection.
    pub reconnect: ReconnectConfig,
    /// A connection with no inbound frames for this long is treated as dead
    /// and reconnected.
    pub idle_timeout: std::time::Duration,
    /// Also write `FULL:<token>` snapshot entries with the serialized tick.
    pub store_full_ticks: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            reconnect: ReconnectConfig::default(),
            idle_timeout: std::time::Duration::from_secs(60),
            store_full_ticks: false,
        }
    }
}

/// Capacity of the per-connection live command channel.
const LIVE_COMMAND_BUFFER: usize = 64;

// =============================================================================
// Connection Manager
// =============================================================================

/// Drives the upstream feed connection.
pub struct ConnectionManager {
    transport: Arc<dyn FeedTransport>,
    store: Arc<dyn TickStore>,
    registry: Arc<SubscriptionRegistry>,
    config: ConnectionConfig,
    status: Arc<FeedStatus>,
    cancel: CancellationToken,
    live_tx: Mutex<Option<mpsc::Sender<FeedCommand>>>,
}

impl ConnectionManager {
    /// Create a new connection manager.
    #[must_use]
    pub fn new(
        transport: Arc<dyn FeedTransport>,
        store: Arc<dyn TickStore>,
        registry: Arc<SubscriptionRegistry>,
        config: ConnectionConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            store,
            registry,
            config,
            status: Arc::new(FeedStatus::new()),
            cancel,
            live_tx: Mutex::new(None),
        }
    }

    /// Observable connection status.
    #[must_use]
    pub fn status(&self) -> Arc<FeedStatus> {
        Arc::clone(&self.status)
    }

    /// Whether a live, authenticated connection currently exists.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live_tx.lock().is_some()
    }

    /// Issue an incremental full-mode subscribe on the live connection.
    ///
    /// Returns `false` when no connection is live or the command could not
    /// be queued; the tokens stay recorded in the registry and are replayed
    /// on the next successful connect.
    pub fn subscribe_live(&self, tokens: &[InstrumentToken]) -> bool {
        if tokens.is_empty() {
            return true;
        }

        let guard = self.live_tx.lock();
        let Some(tx) = guard.as_ref() else {
            return false;
        };

        let subscribed = tx.try_send(FeedCommand::Subscribe(tokens.to_vec())).is_ok();
        let moded = subscribed
            && tx
                .try_send(FeedCommand::Mode(SubscriptionMode::Full, tokens.to_vec()))
                .is_ok();

        subscribed && moded
    }

    /// Run the connection loop until cancelled or the session is revoked.
    ///
    /// Blocks for the life of the session under normal operation. Transport
    /// losses are handled internally: the registry is untouched, missed
    /// ticks are not replayed, and subscriptions are re-issued on the next
    /// connect.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::SessionRejected`] when the upstream
    /// revokes the session; the caller must re-authenticate before calling
    /// again.
    pub async fn run(&self, session: &SessionToken) -> Result<(), ConnectionError> {
        let mut policy = ReconnectPolicy::new(self.config.reconnect.clone());

        loop {
            if self.cancel.is_cancelled() {
                self.status.set_state(ConnectionState::Terminated);
                return Ok(());
            }

            self.status.set_state(ConnectionState::Connecting);
            tracing::info!("Connecting to upstream feed");

            match self.transport.connect(session).await {
                Ok((sink, source)) => {
                    policy.reset();
                    match self.drive(sink, source).await {
                        Ok(()) => {
                            self.status.set_state(ConnectionState::Terminated);
                            return Ok(());
                        }
                        Err(ConnectionError::SessionRejected(reason)) => {
                            self.status.set_error(reason.clone());
                            self.status.set_state(ConnectionState::Terminated);
                            return Err(ConnectionError::SessionRejected(reason));
                        }
                        Err(ConnectionError::Transport(reason)) => {
                            self.status.set_error(reason.clone());
                            tracing::warn!(%reason, "Upstream connection lost");
                        }
                    }
                }
                Err(FeedError::AuthRejected(reason)) => {
                    self.status.set_error(reason.clone());
                    self.status.set_state(ConnectionState::Terminated);
                    return Err(ConnectionError::SessionRejected(reason));
                }
                Err(e) => {
                    self.status.set_error(e.to_string());
                    tracing::warn!(error = %e, "Upstream connect failed");
                }
            }

            self.status.set_state(ConnectionState::Reconnecting);
            self.status.record_reconnect();
            metrics::record_reconnect();

            let delay = policy.next_delay();
            tracing::info!(
                attempt = policy.attempt_count(),
                delay_ms = delay.as_millis(),
                "Reconnecting to upstream feed"
            );

            tokio::select! {
                () = self.cancel.cancelled() => {
                    self.status.set_state(ConnectionState::Terminated);
                    return Ok(());
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Drive one established connection until it ends.
    ///
    /// `Ok(())` means cancellation; transport losses and session revocation
    /// come back as errors for the outer loop to classify.
    async fn drive(
        &self,
        mut sink: Box<dyn FeedSink>,
        mut source: Box<dyn FeedSource>,
    ) -> Result<(), ConnectionError> {
        self.status.set_state(ConnectionState::Connected);
        tracing::info!("Upstream feed connected");

        self.resubscribe(sink.as_mut()).await?;

        let (live_tx, mut live_rx) = mpsc::channel::<FeedCommand>(LIVE_COMMAND_BUFFER);
        *self.live_tx.lock() = Some(live_tx);

        let result = self
            .read_loop(sink.as_mut(), source.as_mut(), &mut live_rx)
            .await;

        *self.live_tx.lock() = None;
        result
    }

    /// Replay the full registry snapshot in full mode.
    ///
    /// Runs on every connect, not only the first: tokens recorded while
    /// disconnected are picked up here.
    async fn resubscribe(&self, sink: &mut dyn FeedSink) -> Result<(), ConnectionError> {
        let snapshot = self.registry.snapshot();
        self.status.set_subscription_count(snapshot.len());
        metrics::set_subscriptions(snapshot.len());

        if snapshot.is_empty() {
            return Ok(());
        }

        tracing::info!(count = snapshot.len(), "Restoring subscriptions");

        sink.send(FeedCommand::Subscribe(snapshot.clone()))
            .await
            .map_err(|e| ConnectionError::Transport(e.to_string()))?;
        sink.send(FeedCommand::Mode(SubscriptionMode::Full, snapshot))
            .await
            .map_err(|e| ConnectionError::Transport(e.to_string()))?;

        Ok(())
    }

    async fn read_loop(
        &self,
        sink: &mut dyn FeedSink,
        source: &mut dyn FeedSource,
        live_rx: &mut mpsc::Receiver<FeedCommand>,
    ) -> Result<(), ConnectionError> {
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::info!("Connection manager cancelled");
                    return Ok(());
                }
                command = live_rx.recv() => {
                    if let Some(command) = command {
                        sink.send(command)
                            .await
                            .map_err(|e| ConnectionError::Transport(e.to_string()))?;
                        let count = self.registry.len();
                        self.status.set_subscription_count(count);
                        metrics::set_subscriptions(count);
                    }
                }
                inbound = tokio::time::timeout(self.config.idle_timeout, source.next_message()) => {
                    match inbound {
                        Err(_) => {
                            return Err(ConnectionError::Transport(format!(
                                "no inbound frames for {}s",
                                self.config.idle_timeout.as_secs()
                            )));
                        }
                        Ok(None) => {
                            return Err(ConnectionError::Transport("stream ended".to_string()));
                        }
                        Ok(Some(Ok(FeedMessage::Ticks(batch)))) => {
                            self.handle_batch(batch).await;
                        }
                        Ok(Some(Ok(FeedMessage::Error { code, message }))) => {
                            if code == SESSION_REVOKED_CODE {
                                return Err(ConnectionError::SessionRejected(message));
                            }
                            self.status.set_error(message.clone());
                            tracing::warn!(code, %message, "Upstream error frame");
                        }
                        Ok(Some(Ok(FeedMessage::Closed { reason }))) => {
                            return Err(ConnectionError::Transport(
                                reason.unwrap_or_else(|| "server closed connection".to_string()),
                            ));
                        }
                        Ok(Some(Err(FeedError::AuthRejected(reason)))) => {
                            return Err(ConnectionError::SessionRejected(reason));
                        }
                        Ok(Some(Err(e))) => {
                            return Err(ConnectionError::Transport(e.to_string()));
                        }
                    }
                }
            }
        }
    }

    /// Fan one tick batch into the snapshot store and broadcast channel.
    ///
    /// Snapshot writes are price-gated; publishing is unconditional. Both
    /// go through a single `apply` so the batch is never partially visible.
    async fn handle_batch(&self, batch: TickBatch) {
        if batch.is_empty() {
            return;
        }

        self.status.record_messages(batch.len() as u64);
        metrics::record_ticks_received(batch.len() as u64);

        let mut update = BatchUpdate::default();
        for tick in &batch {
            if let Some(price) = tick.last_price {
                update.prices.push((tick.instrument_token, price));
            }

            match serde_json::to_string(tick) {
                Ok(json) => {
                    if self.config.store_full_ticks {
                        update.full_ticks.push((tick.instrument_token, json.clone()));
                    }
                    update.publishes.push(json);
                }
                Err(e) => {
                    tracing::warn!(
                        instrument_token = tick.instrument_token,
                        error = %e,
                        "Dropping unserializable tick"
                    );
                }
            }
        }

        metrics::record_snapshot_writes(update.prices.len() as u64);
        metrics::record_publishes(update.publishes.len() as u64);

        if let Err(e) = self.store.apply(update).await {
            metrics::record_store_failure();
            tracing::error!(error = %e, "Failed to commit tick batch");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trips_through_u8() {
        for state in [
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Reconnecting,
            ConnectionState::Terminated,
        ] {
            assert_eq!(ConnectionState::from_u8(state as u8), state);
        }
    }

    #[test]
    fn state_names() {
        assert_eq!(ConnectionState::Connected.as_str(), "connected");
        assert_eq!(ConnectionState::Reconnecting.as_str(), "reconnecting");
    }

    #[test]
    fn status_starts_disconnected() {
        let status = FeedStatus::new();
        assert_eq!(status.state(), ConnectionState::Disconnected);
        assert_eq!(status.messages_received(), 0);
        assert_eq!(status.reconnect_attempts(), 0);
        assert!(status.last_error().is_none());
    }

    #[test]
    fn status_counters_accumulate() {
        let status = FeedStatus::new();

        status.set_state(ConnectionState::Connected);
        status.record_messages(3);
        status.record_messages(2);
        status.record_reconnect();
        status.set_subscription_count(7);
        status.set_error("boom".to_string());

        assert_eq!(status.state(), ConnectionState::Connected);
        assert_eq!(status.messages_received(), 5);
        assert_eq!(status.reconnect_attempts(), 1);
        assert_eq!(status.subscription_count(), 7);
        assert_eq!(status.last_error().as_deref(), Some("boom"));
    }
}
