//! Command Source Port (Driver Port)
//!
//! Interface for the external command channel carrying subscription-change
//! requests from downstream consumers. Payloads arrive as raw strings; the
//! command listener owns parsing so a malformed message can never take the
//! channel down.

use async_trait::async_trait;

/// Receiving side of the external command channel.
#[async_trait]
pub trait CommandSource: Send {
    /// Receive the next raw command payload.
    ///
    /// Blocks until a message arrives; returns `None` once the channel is
    /// closed.
    async fn next_command(&mut self) -> Option<String>;
}
