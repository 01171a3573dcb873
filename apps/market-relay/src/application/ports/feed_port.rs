//! Feed Transport Port (Driven Port)
//!
//! Interface for the single streaming connection to the upstream vendor
//! feed. The relay treats the vendor SDK as an opaque streaming client: the
//! port vocabulary below is the complete surface the connection manager
//! drives, so reconnect and resubscribe behavior is testable without a live
//! network.
//!
//! A connection is handed out as two halves - a command sink and a message
//! source - so the connection manager can wait on inbound frames while
//! pushing incremental subscribes from another task.

use async_trait::async_trait;

use crate::domain::session::SessionToken;
use crate::domain::tick::{InstrumentToken, TickBatch};

/// Subscription verbosity level requested from the upstream feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubscriptionMode {
    /// All available fields per tick (depth, volume, OI, ...).
    #[default]
    Full,
    /// Quote-level fields only.
    Quote,
    /// Last-traded price only.
    Ltp,
}

impl SubscriptionMode {
    /// Mode name as the vendor gateway spells it.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Quote => "quote",
            Self::Ltp => "ltp",
        }
    }
}

/// Outbound command to the live feed connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedCommand {
    /// Start streaming the given instruments.
    Subscribe(Vec<InstrumentToken>),
    /// Stop streaming the given instruments. Nothing in the relay emits
    /// this today; the registry is grow-only.
    Unsubscribe(Vec<InstrumentToken>),
    /// Set the verbosity mode for the given instruments.
    Mode(SubscriptionMode, Vec<InstrumentToken>),
}

/// Inbound message from the feed connection.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    /// A batch of ticks delivered in one frame.
    Ticks(TickBatch),
    /// Error frame from the vendor gateway. Code 403 means the session was
    /// revoked outright, not a transient blip.
    Error {
        /// Vendor error code.
        code: u16,
        /// Human-readable error description.
        message: String,
    },
    /// The server closed the connection.
    Closed {
        /// Close reason, when the server supplied one.
        reason: Option<String>,
    },
}

/// Vendor error code signalling outright session revocation.
pub const SESSION_REVOKED_CODE: u16 = 403;

/// Errors produced by the feed transport.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FeedError {
    /// Could not establish the connection.
    #[error("feed connection failed: {0}")]
    Connect(String),

    /// The upstream rejected the session credential at connect time.
    #[error("feed authentication rejected: {0}")]
    AuthRejected(String),

    /// Transport-level failure on an established connection.
    #[error("feed transport error: {0}")]
    Transport(String),

    /// A frame could not be encoded or decoded.
    #[error("feed codec error: {0}")]
    Codec(String),
}

/// Outbound half of an established connection.
#[async_trait]
pub trait FeedSink: Send {
    /// Send a command to the upstream feed.
    async fn send(&mut self, command: FeedCommand) -> Result<(), FeedError>;
}

/// Inbound half of an established connection.
#[async_trait]
pub trait FeedSource: Send {
    /// Receive the next message.
    ///
    /// Returns `None` once the underlying stream is exhausted.
    async fn next_message(&mut self) -> Option<Result<FeedMessage, FeedError>>;
}

/// Factory for feed connections.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// Open a new authenticated connection to the upstream feed.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::AuthRejected`] when the upstream refuses the
    /// session credential, and [`FeedError::Connect`] for any other
    /// connection failure.
    async fn connect(
        &self,
        session: &SessionToken,
    ) -> Result<(Box<dyn FeedSink>, Box<dyn FeedSource>), FeedError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_names_match_gateway_spelling() {
        assert_eq!(SubscriptionMode::Full.as_str(), "full");
        assert_eq!(SubscriptionMode::Quote.as_str(), "quote");
        assert_eq!(SubscriptionMode::Ltp.as_str(), "ltp");
    }

    #[test]
    fn default_mode_is_full() {
        assert_eq!(SubscriptionMode::default(), SubscriptionMode::Full);
    }
}
