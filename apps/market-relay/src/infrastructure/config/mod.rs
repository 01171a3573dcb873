//! Configuration Module
//!
//! Configuration loading for the relay service.

mod settings;

pub use settings::{
    ChannelSettings, ConfigError, FeedCredentials, RelayConfig, ServerSettings, UpstreamSettings,
    WebSocketSettings,
};
