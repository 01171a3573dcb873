//! Tick Store Port (Driven Port)
//!
//! Interface for the shared distribution transport: a key/value snapshot
//! surface plus a pub/sub broadcast channel. The relay performs only blind
//! overwrites and publishes against it, never read-modify-write.
//!
//! # Keyspace
//!
//! - `LTP:<token>` - latest price per instrument, as a decimal string
//! - `FULL:<token>` - serialized full tick, when enabled
//! - `ACCESS_TOKEN` - current session credential, for other processes

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::session::SessionToken;
use crate::domain::tick::InstrumentToken;

/// Key holding the current session credential.
pub const ACCESS_TOKEN_KEY: &str = "ACCESS_TOKEN";

/// Snapshot key for an instrument's latest price.
#[must_use]
pub fn ltp_key(token: InstrumentToken) -> String {
    format!("LTP:{token}")
}

/// Snapshot key for an instrument's serialized full tick.
#[must_use]
pub fn full_key(token: InstrumentToken) -> String {
    format!("FULL:{token}")
}

/// The writes and publishes of one tick batch.
///
/// An update is handed to [`TickStore::apply`] as a single atomic unit of
/// work against the transport: one round trip covering every instrument in
/// the batch, so a batch is never partially visible under load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchUpdate {
    /// Latest-price overwrites (`LTP:<token>`), price-carrying ticks only.
    pub prices: Vec<(InstrumentToken, Decimal)>,
    /// Serialized full-tick overwrites (`FULL:<token>`), when enabled.
    pub full_ticks: Vec<(InstrumentToken, String)>,
    /// Serialized payloads for the broadcast channel, one per tick,
    /// unconditionally.
    pub publishes: Vec<String>,
}

impl BatchUpdate {
    /// Whether the update carries any work.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty() && self.full_ticks.is_empty() && self.publishes.is_empty()
    }
}

/// Errors produced by the store transport.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The transport could not be reached or refused the operation.
    #[error("store transport unavailable: {0}")]
    Unavailable(String),
}

/// Snapshot store + broadcast channel transport.
#[async_trait]
pub trait TickStore: Send + Sync {
    /// Commit one batch's snapshot writes and publishes as a single unit.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the transport rejects the batch; the
    /// caller logs and carries on, it never tears the upstream connection
    /// down over a store hiccup.
    async fn apply(&self, update: BatchUpdate) -> Result<(), StoreError>;

    /// Persist the current session credential under [`ACCESS_TOKEN_KEY`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the transport rejects the write.
    async fn put_access_token(&self, token: &SessionToken) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_derivation() {
        assert_eq!(ltp_key(256265), "LTP:256265");
        assert_eq!(full_key(408065), "FULL:408065");
        assert_eq!(ACCESS_TOKEN_KEY, "ACCESS_TOKEN");
    }

    #[test]
    fn empty_update() {
        assert!(BatchUpdate::default().is_empty());

        let update = BatchUpdate {
            publishes: vec!["{}".to_string()],
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
