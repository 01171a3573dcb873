//! Relay Configuration Settings
//!
//! Configuration types for the relay, loaded from environment variables.
//! The upstream transport endpoints are the only required values; a missing
//! endpoint is the one unrecoverable startup error this process has.

use std::time::Duration;

use crate::application::services::connection::ConnectionConfig;
use crate::application::services::reconnect::ReconnectConfig;
use crate::application::services::supervisor::DEFAULT_AUTH_RETRY;

/// Vendor API credentials.
#[derive(Clone)]
pub struct FeedCredentials {
    api_key: String,
    api_secret: String,
}

impl FeedCredentials {
    /// Create new credentials.
    #[must_use]
    pub const fn new(api_key: String, api_secret: String) -> Self {
        Self {
            api_key,
            api_secret,
        }
    }

    /// Vendor API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Vendor API secret.
    #[must_use]
    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }
}

impl std::fmt::Debug for FeedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedCredentials")
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

/// Upstream endpoint settings.
#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    /// Gateway WebSocket URL.
    pub ws_url: String,
    /// Vendor HTTP API base URL.
    pub api_base: String,
    /// Login page URL handed to the login collaborator.
    pub login_url: String,
    /// Pre-provisioned request token, when the external login flow is
    /// bypassed.
    pub request_token: Option<String>,
    /// HTTP timeout for the session exchange.
    pub exchange_timeout: Duration,
}

/// Upstream connection settings.
#[derive(Debug, Clone)]
pub struct WebSocketSettings {
    /// A connection with no inbound frames for this long is reconnected.
    pub idle_timeout: Duration,
    /// Initial reconnection delay.
    pub reconnect_delay_initial: Duration,
    /// Maximum reconnection delay.
    pub reconnect_delay_max: Duration,
    /// Reconnection delay multiplier for exponential backoff.
    pub reconnect_delay_multiplier: f64,
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(60),
            reconnect_delay_initial: Duration::from_millis(500),
            reconnect_delay_max: Duration::from_secs(30),
            reconnect_delay_multiplier: 2.0,
        }
    }
}

impl From<&WebSocketSettings> for ReconnectConfig {
    fn from(settings: &WebSocketSettings) -> Self {
        Self {
            initial_delay: settings.reconnect_delay_initial,
            max_delay: settings.reconnect_delay_max,
            multiplier: settings.reconnect_delay_multiplier,
            jitter_factor: 0.1,
        }
    }
}

/// Distribution channel settings.
#[derive(Debug, Clone)]
pub struct ChannelSettings {
    /// Broadcast channel name carrying the tick stream.
    pub tick_channel: String,
    /// Command channel name carrying subscription requests.
    pub command_channel: String,
    /// Tick broadcast capacity.
    pub tick_capacity: usize,
    /// Command channel capacity.
    pub command_capacity: usize,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            tick_channel: "market_ticks".to_string(),
            command_channel: "relay_commands".to_string(),
            tick_capacity: 10_000,
            command_capacity: 256,
        }
    }
}

/// Server port settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Health check HTTP port.
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { health_port: 8080 }
    }
}

/// Complete relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Vendor API credentials.
    pub credentials: FeedCredentials,
    /// Upstream endpoints.
    pub upstream: UpstreamSettings,
    /// Server ports.
    pub server: ServerSettings,
    /// Upstream connection settings.
    pub websocket: WebSocketSettings,
    /// Distribution channel settings.
    pub channels: ChannelSettings,
    /// Wait between failed session acquisition attempts.
    pub auth_retry: Duration,
    /// Also write `FULL:<token>` snapshot entries.
    pub store_full_ticks: bool,
}

impl RelayConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required environment variable is missing or
    /// empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = require_env("FEED_API_KEY")?;
        let api_secret = require_env("FEED_API_SECRET")?;
        let ws_url = require_env("FEED_WS_URL")?;
        let api_base = require_env("FEED_API_BASE")?;

        let login_url = std::env::var("FEED_LOGIN_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| format!("{api_base}/connect/login"));

        let request_token = std::env::var("FEED_REQUEST_TOKEN")
            .ok()
            .filter(|v| !v.is_empty());

        let upstream = UpstreamSettings {
            ws_url,
            api_base,
            login_url,
            request_token,
            exchange_timeout: parse_env_duration_secs(
                "FEED_EXCHANGE_TIMEOUT_SECS",
                Duration::from_secs(30),
            ),
        };

        let server = ServerSettings {
            health_port: parse_env_u16("RELAY_HEALTH_PORT", ServerSettings::default().health_port),
        };

        let defaults = WebSocketSettings::default();
        let websocket = WebSocketSettings {
            idle_timeout: parse_env_duration_secs("RELAY_IDLE_TIMEOUT_SECS", defaults.idle_timeout),
            reconnect_delay_initial: parse_env_duration_millis(
                "RELAY_RECONNECT_DELAY_INITIAL_MS",
                defaults.reconnect_delay_initial,
            ),
            reconnect_delay_max: parse_env_duration_secs(
                "RELAY_RECONNECT_DELAY_MAX_SECS",
                defaults.reconnect_delay_max,
            ),
            reconnect_delay_multiplier: parse_env_f64(
                "RELAY_RECONNECT_DELAY_MULTIPLIER",
                defaults.reconnect_delay_multiplier,
            ),
        };

        let channel_defaults = ChannelSettings::default();
        let channels = ChannelSettings {
            tick_channel: parse_env_string("RELAY_TICK_CHANNEL", &channel_defaults.tick_channel),
            command_channel: parse_env_string(
                "RELAY_COMMAND_CHANNEL",
                &channel_defaults.command_channel,
            ),
            tick_capacity: parse_env_usize("RELAY_TICK_CAPACITY", channel_defaults.tick_capacity),
            command_capacity: parse_env_usize(
                "RELAY_COMMAND_CAPACITY",
                channel_defaults.command_capacity,
            ),
        };

        Ok(Self {
            credentials: FeedCredentials::new(api_key, api_secret),
            upstream,
            server,
            websocket,
            channels,
            auth_retry: parse_env_duration_secs("RELAY_AUTH_RETRY_SECS", DEFAULT_AUTH_RETRY),
            store_full_ticks: parse_env_bool("RELAY_STORE_FULL_TICKS", false),
        })
    }

    /// Connection manager configuration derived from these settings.
    #[must_use]
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            reconnect: ReconnectConfig::from(&self.websocket),
            idle_timeout: self.websocket.idle_timeout,
            store_full_ticks: self.store_full_ticks,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has an empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn require_env(key: &str) -> Result<String, ConfigError> {
    let value =
        std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))?;
    if value.is_empty() {
        return Err(ConfigError::EmptyValue(key.to_string()));
    }
    Ok(value)
}

fn parse_env_string(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map_or(default, |v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_redacted_debug() {
        let creds = FeedCredentials::new("key123".to_string(), "secret456".to_string());
        let debug = format!("{creds:?}");
        assert!(!debug.contains("key123"));
        assert!(!debug.contains("secret456"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn websocket_settings_defaults() {
        let settings = WebSocketSettings::default();
        assert_eq!(settings.idle_timeout, Duration::from_secs(60));
        assert_eq!(settings.reconnect_delay_initial, Duration::from_millis(500));
        assert_eq!(settings.reconnect_delay_max, Duration::from_secs(30));
        assert!((settings.reconnect_delay_multiplier - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn channel_settings_defaults() {
        let settings = ChannelSettings::default();
        assert_eq!(settings.tick_channel, "market_ticks");
        assert_eq!(settings.command_channel, "relay_commands");
        assert_eq!(settings.tick_capacity, 10_000);
    }

    #[test]
    fn reconnect_config_from_settings() {
        let settings = WebSocketSettings::default();
        let reconnect = ReconnectConfig::from(&settings);
        assert_eq!(reconnect.initial_delay, settings.reconnect_delay_initial);
        assert_eq!(reconnect.max_delay, settings.reconnect_delay_max);
    }

    #[test]
    fn auth_retry_default_is_thirty_seconds() {
        assert_eq!(DEFAULT_AUTH_RETRY, Duration::from_secs(30));
    }
}
