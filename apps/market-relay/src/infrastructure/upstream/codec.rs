//! Gateway Frame Codec
//!
//! Decodes inbound text frames from the vendor gateway. Tick batches arrive
//! as JSON arrays; control frames as single JSON objects.

use crate::domain::tick::TickBatch;

use super::messages::{CommandFrame, ControlFrame};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// The frame is neither a tick array nor a control object.
    #[error("invalid frame format: {0}")]
    InvalidFormat(String),
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// A batch of ticks.
    Ticks(TickBatch),
    /// A control frame.
    Control(ControlFrame),
}

/// JSON codec for gateway frames.
#[derive(Debug, Default, Clone)]
pub struct FrameCodec;

impl FrameCodec {
    /// Create a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode one inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON parsing fails or the frame shape is
    /// unrecognizable.
    pub fn decode(&self, text: &str) -> Result<InboundFrame, CodecError> {
        let trimmed = text.trim();

        if trimmed.starts_with('[') {
            let batch: TickBatch = serde_json::from_str(trimmed)?;
            Ok(InboundFrame::Ticks(batch))
        } else if trimmed.starts_with('{') {
            let frame: ControlFrame = serde_json::from_str(trimmed)?;
            Ok(InboundFrame::Control(frame))
        } else {
            Err(CodecError::InvalidFormat(format!(
                "expected JSON array or object, got: {}...",
                &trimmed[..trimmed.len().min(50)]
            )))
        }
    }

    /// Encode an outbound command frame.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode(&self, frame: &CommandFrame) -> Result<String, CodecError> {
        Ok(serde_json::to_string(frame)?)
    }
}
