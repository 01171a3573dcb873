//! Subscription Registry
//!
//! The set of instrument tokens currently being streamed. Written by the
//! command listener, read by the connection manager on every reconnect.
//!
//! # Design
//!
//! The registry only grows during a process lifetime: once an instrument is
//! added it is never silently removed. `add` reports exactly the tokens that
//! were new, so callers can issue incremental upstream subscriptions without
//! re-subscribing the whole set.
//!
//! Mutation is safe to interleave with `snapshot` reads from other tasks; no
//! token can be observed as added by one caller and then dropped by another.

use std::collections::HashSet;

use parking_lot::RwLock;

use crate::domain::tick::InstrumentToken;

/// Concurrency-safe, grow-only set of subscribed instrument tokens.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    tokens: RwLock<HashSet<InstrumentToken>>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add tokens to the registry.
    ///
    /// Duplicates within `tokens` and tokens already present are filtered
    /// out; the returned vector contains exactly the tokens that were newly
    /// added, in first-seen order.
    pub fn add(&self, tokens: &[InstrumentToken]) -> Vec<InstrumentToken> {
        let mut set = self.tokens.write();
        let mut newly_added = Vec::new();

        for &token in tokens {
            if set.insert(token) {
                newly_added.push(token);
            }
        }

        newly_added
    }

    /// Point-in-time copy of every subscribed token.
    #[must_use]
    pub fn snapshot(&self) -> Vec<InstrumentToken> {
        self.tokens.read().iter().copied().collect()
    }

    /// Whether the token is currently subscribed.
    #[must_use]
    pub fn contains(&self, token: InstrumentToken) -> bool {
        self.tokens.read().contains(&token)
    }

    /// Number of subscribed tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.read().len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.read().is_empty()
    }
}
