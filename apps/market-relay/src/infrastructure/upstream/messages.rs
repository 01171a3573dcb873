//! Upstream Gateway Wire Types
//!
//! Frame formats for the vendor gateway's WebSocket protocol.
//!
//! # Outbound Command Frames
//!
//! ```json
//! {"a": "subscribe", "v": [256265, 408065]}
//! {"a": "mode", "v": ["full", [256265, 408065]]}
//! ```
//!
//! # Inbound Frames
//!
//! Tick batches arrive as JSON arrays of tick objects. Control frames
//! arrive as single objects:
//!
//! ```json
//! {"type": "error", "code": 403, "data": "session expired"}
//! ```

use serde::{Deserialize, Serialize};

use crate::application::ports::feed_port::{FeedCommand, SubscriptionMode};
use crate::domain::tick::InstrumentToken;

/// Subscription mode name as the gateway spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeName {
    /// All available fields per tick.
    Full,
    /// Quote-level fields only.
    Quote,
    /// Last-traded price only.
    Ltp,
}

impl From<SubscriptionMode> for ModeName {
    fn from(mode: SubscriptionMode) -> Self {
        match mode {
            SubscriptionMode::Full => Self::Full,
            SubscriptionMode::Quote => Self::Quote,
            SubscriptionMode::Ltp => Self::Ltp,
        }
    }
}

/// Outbound command frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "a", content = "v", rename_all = "lowercase")]
pub enum CommandFrame {
    /// Start streaming the given instruments.
    Subscribe(Vec<InstrumentToken>),
    /// Stop streaming the given instruments.
    Unsubscribe(Vec<InstrumentToken>),
    /// Set the verbosity mode for the given instruments.
    Mode(ModeName, Vec<InstrumentToken>),
}

impl From<FeedCommand> for CommandFrame {
    fn from(command: FeedCommand) -> Self {
        match command {
            FeedCommand::Subscribe(tokens) => Self::Subscribe(tokens),
            FeedCommand::Unsubscribe(tokens) => Self::Unsubscribe(tokens),
            FeedCommand::Mode(mode, tokens) => Self::Mode(mode.into(), tokens),
        }
    }
}

/// Kind of inbound control frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    /// Error report; code 403 means session revocation.
    Error,
    /// Order postback. Not part of the relay's data path.
    Order,
    /// Informational broadcast from the vendor.
    Message,
    /// Anything this relay does not recognize.
    #[serde(other)]
    Unknown,
}

/// Inbound control frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlFrame {
    /// Frame kind.
    #[serde(rename = "type")]
    pub kind: ControlKind,

    /// Error code, present on error frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,

    /// Frame payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ControlFrame {
    /// Payload rendered as a display string.
    #[must_use]
    pub fn data_text(&self) -> String {
        match &self.data {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }
}
