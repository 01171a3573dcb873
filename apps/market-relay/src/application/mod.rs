//! Application Layer - Services and port definitions.
//!
//! This layer contains the relay services and the port interfaces that
//! define how the domain interacts with external systems.

/// Port interfaces for external systems (feed, store, commands, login).
pub mod ports;

/// Relay services: connection management, command handling, supervision.
pub mod services;
