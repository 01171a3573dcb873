//! Relay Supervisor
//!
//! Top-level control loop. Acquires a session with unbounded fixed-backoff
//! retry, starts the command listener as a concurrent task, then runs the
//! connection manager on the calling task for the life of the session. When
//! the connection manager reports that the upstream revoked the session,
//! the loop re-enters session acquisition and the chain restarts.
//!
//! The retry loop is intentionally unbounded: bad credentials are a human
//! problem, and the relay keeps trying rather than exiting.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::application::ports::command_port::CommandSource;
use crate::application::ports::session_port::SessionSource;
use crate::domain::registry::SubscriptionRegistry;
use crate::infrastructure::metrics;

use super::commands::CommandListener;
use super::connection::{ConnectionError, ConnectionManager};

/// Default wait between failed session acquisition attempts.
pub const DEFAULT_AUTH_RETRY: Duration = Duration::from_secs(30);

/// Top-level relay control loop.
pub struct RelaySupervisor {
    sessions: Arc<dyn SessionSource>,
    connection: Arc<ConnectionManager>,
    registry: Arc<SubscriptionRegistry>,
    auth_retry: Duration,
    cancel: CancellationToken,
}

impl RelaySupervisor {
    /// Create a new supervisor.
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionSource>,
        connection: Arc<ConnectionManager>,
        registry: Arc<SubscriptionRegistry>,
        auth_retry: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            sessions,
            connection,
            registry,
            auth_retry,
            cancel,
        }
    }

    /// Run the relay until cancelled.
    ///
    /// Never returns under normal operation. The command listener is
    /// spawned once, on the first successful session: registry state and
    /// the command channel outlive any one session, so re-authentication
    /// cycles never lose subscriber state.
    pub async fn run(self, command_source: Box<dyn CommandSource>) {
        let mut command_source = Some(command_source);

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("Relay supervisor cancelled");
                return;
            }

            let session = match self.sessions.acquire().await {
                Ok(session) => session,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        retry_secs = self.auth_retry.as_secs(),
                        "Session acquisition failed, retrying"
                    );
                    tokio::select! {
                        () = self.cancel.cancelled() => {
                            tracing::info!("Relay supervisor cancelled during auth backoff");
                            return;
                        }
                        () = tokio::time::sleep(self.auth_retry) => {}
                    }
                    continue;
                }
            };

            tracing::info!("Session acquired");
            metrics::record_session_renewal();

            if let Some(source) = command_source.take() {
                let listener =
                    CommandListener::new(Arc::clone(&self.registry), Arc::clone(&self.connection));
                let listener_cancel = self.cancel.clone();
                tokio::spawn(async move {
                    listener.run(source, listener_cancel).await;
                });
            }

            match self.connection.run(&session).await {
                Ok(()) => {
                    tracing::info!("Connection manager stopped");
                    return;
                }
                Err(ConnectionError::SessionRejected(reason)) => {
                    tracing::warn!(%reason, "Session revoked upstream, re-authenticating");
                }
                Err(ConnectionError::Transport(reason)) => {
                    tracing::error!(%reason, "Connection manager returned a transport error");
                }
            }
        }
    }
}
