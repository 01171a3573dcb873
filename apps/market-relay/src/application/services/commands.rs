//! Command Listener
//!
//! Consumes subscription-change requests from the external command channel
//! and mutates the subscription registry. Newly added tokens are pushed to
//! the live connection as an incremental full-mode subscribe - never a
//! re-subscribe of the whole registry.
//!
//! Per-message errors are contained here: a malformed payload or a single
//! non-numeric token is logged and skipped, and the listener loop carries
//! on. No acknowledgment is published back to the sender.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::application::ports::command_port::CommandSource;
use crate::domain::registry::SubscriptionRegistry;
use crate::domain::tick::InstrumentToken;
use crate::infrastructure::metrics;

use super::connection::ConnectionManager;

/// The only recognized command action.
const SUBSCRIBE_ACTION: &str = "SUBSCRIBE";

/// Consumes the external command channel.
pub struct CommandListener {
    registry: Arc<SubscriptionRegistry>,
    connection: Arc<ConnectionManager>,
}

impl CommandListener {
    /// Create a new command listener.
    #[must_use]
    pub const fn new(
        registry: Arc<SubscriptionRegistry>,
        connection: Arc<ConnectionManager>,
    ) -> Self {
        Self {
            registry,
            connection,
        }
    }

    /// Consume the command channel until cancelled or the channel closes.
    pub async fn run(self, mut source: Box<dyn CommandSource>, cancel: CancellationToken) {
        tracing::info!("Command listener started");

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("Command listener cancelled");
                    break;
                }
                payload = source.next_command() => {
                    match payload {
                        Some(payload) => self.handle(&payload),
                        None => {
                            tracing::warn!("Command channel closed");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Process one raw command payload.
    fn handle(&self, payload: &str) {
        let value: serde_json::Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(e) => {
                metrics::record_command_rejected();
                tracing::warn!(error = %e, "Discarding malformed command payload");
                return;
            }
        };

        let Some(action) = value.get("action").and_then(serde_json::Value::as_str) else {
            metrics::record_command_rejected();
            tracing::warn!("Discarding command without an action field");
            return;
        };

        if action != SUBSCRIBE_ACTION {
            tracing::debug!(action, "Ignoring unrecognized command action");
            return;
        }

        let tokens = match value.get("tokens") {
            Some(serde_json::Value::Array(raw)) => coerce_tokens(raw),
            Some(other) => {
                metrics::record_command_rejected();
                tracing::warn!(tokens = %other, "Discarding command with non-array tokens");
                return;
            }
            None => Vec::new(),
        };

        metrics::record_command_received();

        let newly_added = self.registry.add(&tokens);
        if newly_added.is_empty() {
            tracing::debug!("Command carried no new instruments");
            return;
        }

        if self.connection.subscribe_live(&newly_added) {
            tracing::info!(tokens = ?newly_added, "Subscribed to new instruments on live connection");
        } else {
            tracing::info!(
                tokens = ?newly_added,
                "Recorded new instruments; no live connection, subscribing on next connect"
            );
        }
    }
}

/// Coerce raw token values to instrument tokens, skipping the ones that
/// fail individually.
fn coerce_tokens(raw: &[serde_json::Value]) -> Vec<InstrumentToken> {
    let mut tokens = Vec::with_capacity(raw.len());

    for value in raw {
        match coerce_token(value) {
            Some(token) => tokens.push(token),
            None => {
                tracing::warn!(value = %value, "Skipping non-numeric instrument token");
            }
        }
    }

    tokens
}

fn coerce_token(value: &serde_json::Value) -> Option<InstrumentToken> {
    if let Some(token) = value.as_u64() {
        return Some(token);
    }
    value.as_str().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use crate::application::ports::feed_port::{FeedError, FeedSink, FeedSource, FeedTransport};
    use crate::application::ports::store_port::{BatchUpdate, StoreError, TickStore};
    use crate::application::services::connection::ConnectionConfig;
    use crate::domain::session::SessionToken;

    use super::*;

    struct NullTransport;

    #[async_trait]
    impl FeedTransport for NullTransport {
        async fn connect(
            &self,
            _session: &SessionToken,
        ) -> Result<(Box<dyn FeedSink>, Box<dyn FeedSource>), FeedError> {
            Err(FeedError::Connect("unused".to_string()))
        }
    }

    struct NullStore;

    #[async_trait]
    impl TickStore for NullStore {
        async fn apply(&self, _update: BatchUpdate) -> Result<(), StoreError> {
            Ok(())
        }

        async fn put_access_token(&self, _token: &SessionToken) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn listener() -> (CommandListener, Arc<SubscriptionRegistry>) {
        let registry = Arc::new(SubscriptionRegistry::new());
        let connection = Arc::new(ConnectionManager::new(
            Arc::new(NullTransport),
            Arc::new(NullStore),
            Arc::clone(&registry),
            ConnectionConfig::default(),
            CancellationToken::new(),
        ));
        (
            CommandListener::new(Arc::clone(&registry), connection),
            registry,
        )
    }

    #[test]
    fn subscribe_records_and_deduplicates() {
        let (listener, registry) = listener();

        listener.handle(r#"{"action":"SUBSCRIBE","tokens":["256265","408065","256265"]}"#);

        assert_eq!(registry.len(), 2);
        assert!(registry.contains(256265));
        assert!(registry.contains(408065));
    }

    #[test]
    fn numeric_and_string_tokens_both_coerce() {
        let (listener, registry) = listener();

        listener.handle(r#"{"action":"SUBSCRIBE","tokens":[256265,"408065"]}"#);

        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn bad_token_skips_only_itself() {
        let (listener, registry) = listener();

        listener.handle(r#"{"action":"SUBSCRIBE","tokens":["256265","not-a-number",408065]}"#);

        assert_eq!(registry.len(), 2);
        assert!(!registry.contains(0));
    }

    #[test]
    fn malformed_payload_leaves_registry_untouched() {
        let (listener, registry) = listener();

        listener.handle("not json at all");
        listener.handle(r#"{"tokens":[1,2]}"#);
        listener.handle(r#"{"action":"SUBSCRIBE","tokens":"oops"}"#);

        assert!(registry.is_empty());
    }

    #[test]
    fn unrecognized_action_is_ignored() {
        let (listener, registry) = listener();

        listener.handle(r#"{"action":"UNSUBSCRIBE","tokens":[256265]}"#);

        assert!(registry.is_empty());
    }

    #[test]
    fn listener_survives_malformed_then_processes_valid() {
        let (listener, registry) = listener();

        listener.handle("garbage");
        listener.handle(r#"{"action":"SUBSCRIBE","tokens":[7]}"#);

        assert!(registry.contains(7));
    }

    #[test]
    fn missing_tokens_field_is_a_no_op() {
        let (listener, registry) = listener();

        listener.handle(r#"{"action":"SUBSCRIBE"}"#);

        assert!(registry.is_empty());
    }

    #[test]
    fn coerce_rejects_negatives_and_floats() {
        assert_eq!(coerce_token(&serde_json::json!(-5)), None);
        assert_eq!(coerce_token(&serde_json::json!(12.5)), None);
        assert_eq!(coerce_token(&serde_json::json!("  256265 ")), Some(256265));
    }
}
