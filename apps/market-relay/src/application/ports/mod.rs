//! Port Interfaces
//!
//! Interfaces (ports) for the relay's external collaborators, following the
//! Hexagonal Architecture pattern. Infrastructure adapters implement these
//! contracts.
//!
//! ## Driven Ports (Outbound)
//!
//! - [`feed_port::FeedTransport`]: streaming connection to the upstream feed
//! - [`store_port::TickStore`]: snapshot store + broadcast channel transport
//! - [`session_port::LoginFlow`]: external login collaborator
//!
//! ## Driver Ports (Inbound)
//!
//! - [`command_port::CommandSource`]: external subscription-command channel

pub mod command_port;
pub mod feed_port;
pub mod session_port;
pub mod store_port;

pub use command_port::CommandSource;
pub use feed_port::{
    FeedCommand, FeedError, FeedMessage, FeedSink, FeedSource, FeedTransport, SubscriptionMode,
};
pub use session_port::{AuthError, LoginFlow, SessionSource};
pub use store_port::{BatchUpdate, StoreError, TickStore};
