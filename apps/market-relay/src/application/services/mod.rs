//! Relay Services
//!
//! The services that make up the relay's data and control paths:
//!
//! - [`connection`]: the connection manager driving the upstream feed
//! - [`commands`]: the command listener consuming subscription requests
//! - [`supervisor`]: the top-level control loop
//! - [`reconnect`]: backoff policy for upstream reconnection

pub mod commands;
pub mod connection;
pub mod reconnect;
pub mod supervisor;

pub use commands::CommandListener;
pub use connection::{
    ConnectionConfig, ConnectionError, ConnectionManager, ConnectionState, FeedStatus,
};
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
pub use supervisor::RelaySupervisor;
