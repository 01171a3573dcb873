//! Market Relay Binary
//!
//! Starts the market data relay.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin market-relay
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `FEED_API_KEY`: Vendor API key
//! - `FEED_API_SECRET`: Vendor API secret
//! - `FEED_WS_URL`: Gateway WebSocket URL
//! - `FEED_API_BASE`: Vendor HTTP API base URL
//!
//! ## Optional
//! - `FEED_REQUEST_TOKEN`: Pre-provisioned login request token
//! - `FEED_LOGIN_URL`: Login page URL (default: `<FEED_API_BASE>/connect/login`)
//! - `RELAY_HEALTH_PORT`: Health check HTTP port (default: 8080)
//! - `RELAY_AUTH_RETRY_SECS`: Wait between failed logins (default: 30)
//! - `RELAY_IDLE_TIMEOUT_SECS`: Upstream idle timeout (default: 60)
//! - `RELAY_STORE_FULL_TICKS`: Also write `FULL:<token>` entries (default: false)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use market_relay::infrastructure::telemetry;
use market_relay::{
    ConnectionManager, HealthServer, HealthServerState, MemoryCommandBus, MemoryTickStore,
    ProvisionedLogin, RelayConfig, RelaySupervisor, SessionProvider, SessionProviderConfig,
    SubscriptionRegistry, WsFeedConfig, WsFeedTransport, init_metrics,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    load_dotenv();

    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting market relay");

    let _metrics_handle = init_metrics();

    let config = RelayConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    let store = Arc::new(MemoryTickStore::new(config.channels.tick_capacity));
    let command_bus = MemoryCommandBus::new(config.channels.command_capacity);
    let registry = Arc::new(SubscriptionRegistry::new());

    let transport = Arc::new(WsFeedTransport::new(WsFeedConfig {
        url: config.upstream.ws_url.clone(),
        api_key: config.credentials.api_key().to_string(),
    }));

    let connection = Arc::new(ConnectionManager::new(
        transport,
        Arc::clone(&store) as Arc<dyn market_relay::TickStore>,
        Arc::clone(&registry),
        config.connection_config(),
        shutdown_token.clone(),
    ));

    let login = Arc::new(ProvisionedLogin::new(config.upstream.request_token.clone()));
    let sessions = Arc::new(SessionProvider::new(
        SessionProviderConfig {
            api_key: config.credentials.api_key().to_string(),
            api_secret: config.credentials.api_secret().to_string(),
            api_base: config.upstream.api_base.clone(),
            login_url: config.upstream.login_url.clone(),
            timeout: config.upstream.exchange_timeout,
        },
        login,
        Arc::clone(&store) as Arc<dyn market_relay::TickStore>,
    )?);

    let health_state = Arc::new(HealthServerState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        connection.status(),
        Arc::clone(&registry),
        Arc::clone(&store),
    ));
    let health_server = HealthServer::new(
        config.server.health_port,
        health_state,
        shutdown_token.clone(),
    );

    tokio::spawn(async move {
        if let Err(e) = health_server.run().await {
            tracing::error!(error = %e, "Health server error");
        }
    });

    let supervisor = RelaySupervisor::new(
        sessions,
        connection,
        registry,
        config.auth_retry,
        shutdown_token.clone(),
    );
    let command_source = Box::new(command_bus.source());

    tokio::spawn(async move {
        supervisor.run(command_source).await;
        tracing::info!("Relay supervisor exited");
    });

    tracing::info!("Market relay ready");

    await_shutdown(shutdown_token).await;

    tracing::info!("Market relay stopped");
    Ok(())
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }
}

/// Log the parsed configuration.
fn log_config(config: &RelayConfig) {
    tracing::info!(
        health_port = config.server.health_port,
        tick_channel = %config.channels.tick_channel,
        command_channel = %config.channels.command_channel,
        auth_retry_secs = config.auth_retry.as_secs(),
        store_full_ticks = config.store_full_ticks,
        "Configuration loaded"
    );
    tracing::debug!(
        ws_url = %config.upstream.ws_url,
        api_base = %config.upstream.api_base,
        login_url = %config.upstream.login_url,
        "Upstream endpoints"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv_from_ancestors() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
}
