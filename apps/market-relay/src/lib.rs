#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Market Data Relay
//!
//! Relays real-time market ticks from a single upstream vendor feed into a
//! shared distribution layer: a latest-value snapshot store and a pub/sub
//! broadcast channel. Downstream consumers steer the relay at runtime
//! through a command channel.
//!
//! # Layers (inside -> outside)
//!
//! - **Domain**: Core relay types
//!   - `tick`: Tick records and instrument identity
//!   - `registry`: The grow-only subscription registry
//!   - `session`: The upstream session credential
//!
//! - **Application**: Services and port definitions
//!   - `ports`: Interfaces for the feed, store, command, and login collaborators
//!   - `services`: Connection manager, command listener, relay supervisor
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `upstream`: WebSocket client for the vendor gateway
//!   - `session`: Login adapter and vendor session exchange
//!   - `store`: In-process snapshot store / broadcast / command bus
//!   - `config`: Configuration loading
//!   - `health`: Health check HTTP endpoint
//!
//! # Data Flow
//!
//! ```text
//!                       +--------------+     +----------------+
//! Upstream feed WS ---->|  Connection  |---->| Snapshot store |--> on-demand reads
//!                       |   manager    |     +----------------+
//!                       |              |     +----------------+
//!                       |              |---->|   Broadcast    |--> Listener 1..N
//!                       +------^-------+     +----------------+
//!                              |
//!                       +------+-------+
//! Command channel ----->|   Command    |
//!                       |   listener   |
//!                       +--------------+
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core relay types with no external dependencies.
pub mod domain;

/// Application layer - Services and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::registry::SubscriptionRegistry;
pub use domain::session::SessionToken;
pub use domain::tick::{InstrumentToken, Tick, TickBatch};

// Ports
pub use application::ports::{
    AuthError, BatchUpdate, CommandSource, FeedCommand, FeedError, FeedMessage, FeedSink,
    FeedSource, FeedTransport, LoginFlow, SessionSource, StoreError, SubscriptionMode, TickStore,
};

// Services
pub use application::services::{
    CommandListener, ConnectionConfig, ConnectionError, ConnectionManager, ConnectionState,
    FeedStatus, ReconnectConfig, ReconnectPolicy, RelaySupervisor,
};

// Infrastructure config
pub use infrastructure::config::{
    ChannelSettings, ConfigError, FeedCredentials, RelayConfig, ServerSettings, UpstreamSettings,
    WebSocketSettings,
};

// Store adapters (also used by integration tests)
pub use infrastructure::store::{MemoryCommandBus, MemoryCommandSource, MemoryTickStore};

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// Upstream adapter
pub use infrastructure::upstream::{WsFeedConfig, WsFeedTransport};

// Session acquisition
pub use infrastructure::session::{ProvisionedLogin, SessionProvider, SessionProviderConfig};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
