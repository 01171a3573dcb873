//! Prometheus Metrics Module
//!
//! Exposes relay metrics via Prometheus format, rendered on the health
//! server's `/metrics` route.
//!
//! # Metrics Categories
//!
//! - **Ticks**: received, snapshot writes, publishes, store failures
//! - **Connection**: reconnect attempts, active subscriptions
//! - **Commands**: received and rejected command payloads
//! - **Sessions**: renewals

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if the recorder cannot be installed.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

fn register_metrics() {
    describe_counter!(
        "relay_ticks_received_total",
        "Total ticks received from the upstream feed"
    );
    describe_counter!(
        "relay_snapshot_writes_total",
        "Total latest-price snapshot writes"
    );
    describe_counter!(
        "relay_ticks_published_total",
        "Total ticks published to the broadcast channel"
    );
    describe_counter!(
        "relay_store_failures_total",
        "Total tick batches the store transport rejected"
    );
    describe_counter!(
        "relay_reconnects_total",
        "Total upstream reconnection attempts"
    );
    describe_counter!(
        "relay_commands_received_total",
        "Total subscription commands accepted"
    );
    describe_counter!(
        "relay_commands_rejected_total",
        "Total malformed command payloads discarded"
    );
    describe_counter!(
        "relay_session_renewals_total",
        "Total successful session acquisitions"
    );
    describe_gauge!(
        "relay_subscriptions",
        "Instruments subscribed on the live connection"
    );
}

/// Record ticks received from the upstream feed.
pub fn record_ticks_received(count: u64) {
    counter!("relay_ticks_received_total").increment(count);
}

/// Record latest-price snapshot writes.
pub fn record_snapshot_writes(count: u64) {
    counter!("relay_snapshot_writes_total").increment(count);
}

/// Record ticks published to the broadcast channel.
pub fn record_publishes(count: u64) {
    counter!("relay_ticks_published_total").increment(count);
}

/// Record a rejected batch commit.
pub fn record_store_failure() {
    counter!("relay_store_failures_total").increment(1);
}

/// Record an upstream reconnection attempt.
pub fn record_reconnect() {
    counter!("relay_reconnects_total").increment(1);
}

/// Record an accepted subscription command.
pub fn record_command_received() {
    counter!("relay_commands_received_total").increment(1);
}

/// Record a discarded command payload.
pub fn record_command_rejected() {
    counter!("relay_commands_rejected_total").increment(1);
}

/// Record a successful session acquisition.
pub fn record_session_renewal() {
    counter!("relay_session_renewals_total").increment(1);
}

/// Update the live subscription count.
pub fn set_subscriptions(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("relay_subscriptions").set(count as f64);
}
