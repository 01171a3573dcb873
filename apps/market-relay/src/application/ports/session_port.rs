//! Session Ports
//!
//! Interfaces for session acquisition. The login collaborator is a black
//! box: browser automation, a manual prompt, or a stored token all satisfy
//! [`LoginFlow`]. [`SessionSource`] is the full acquisition operation the
//! supervisor retries.

use async_trait::async_trait;

use crate::domain::session::SessionToken;

/// Errors from the login collaborator or the vendor session exchange.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    /// The external login collaborator reported failure (bad credentials,
    /// bad one-time code, timeout).
    #[error("login failed: {0}")]
    Login(String),

    /// The vendor rejected the authorization code exchange.
    #[error("session exchange rejected: {0}")]
    Exchange(String),

    /// The vendor's exchange response could not be understood.
    #[error("malformed session exchange response: {0}")]
    MalformedResponse(String),

    /// The acquired token could not be persisted to the snapshot store.
    #[error("failed to persist session token: {0}")]
    Store(String),
}

/// External login collaborator.
///
/// Exchanges user credentials and a time-based one-time code for a
/// short-lived request token at the given login URL.
#[async_trait]
pub trait LoginFlow: Send + Sync {
    /// Obtain a request token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Login`] with a human-readable reason on any
    /// step failure.
    async fn request_token(&self, login_url: &str) -> Result<String, AuthError>;
}

/// Full session acquisition: login, code exchange, token persistence.
///
/// No retry happens here - retry policy belongs to the supervisor.
#[async_trait]
pub trait SessionSource: Send + Sync {
    /// Acquire a valid upstream session token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when the login collaborator fails or the
    /// vendor rejects the exchange.
    async fn acquire(&self) -> Result<SessionToken, AuthError>;
}
