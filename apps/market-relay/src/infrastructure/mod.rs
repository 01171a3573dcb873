//! Infrastructure Layer - Adapters and external integrations.
//!
//! Concrete implementations of the port interfaces defined in the
//! application layer.

/// Upstream feed gateway adapter (wire types, codec, WebSocket client).
pub mod upstream;

/// Session acquisition (login flow adapter + vendor code exchange).
pub mod session;

/// Snapshot store / broadcast channel / command bus adapters.
pub mod store;

/// Configuration loading.
pub mod config;

/// Health check HTTP endpoint.
pub mod health;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Tracing and OpenTelemetry integration.
pub mod telemetry;
