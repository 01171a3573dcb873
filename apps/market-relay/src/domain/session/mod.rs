//! Session Credential
//!
//! The short-lived credential authorizing the upstream streaming connection.
//! Issued once per login exchange, owned by the connection manager, and
//! invalidated wholesale on any authentication failure - the vendor never
//! partially refreshes a session.

/// Upstream session credential with an implicit daily expiry boundary.
///
/// The `Debug` implementation redacts the value for safe logging.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    value: String,
}

impl SessionToken {
    /// Wrap a raw credential issued by the vendor's session exchange.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Raw credential value, for authenticating outbound calls.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionToken")
            .field("value", &"[REDACTED]")
            .finish()
    }
}
