//! Upstream Feed Gateway Adapter
//!
//! Speaks the vendor's streaming gateway at the interface level: JSON
//! command frames out, JSON tick/control frames in, over a WebSocket
//! authenticated by query-string credentials.

pub mod codec;
pub mod messages;
pub mod ws;

pub use codec::{CodecError, FrameCodec, InboundFrame};
pub use messages::{CommandFrame, ControlFrame, ControlKind, ModeName};
pub use ws::{WsFeedConfig, WsFeedTransport};
