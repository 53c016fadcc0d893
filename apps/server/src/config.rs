//! Application configuration.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use ticker_feeds::{FeedConfig, FINNHUB_WS_URL};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Upstream feed configuration.
    pub feed: FeedSettings,
    /// Downstream server configuration.
    pub server: ServerSettings,
    /// Logging level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            feed: FeedSettings::default(),
            server: ServerSettings::default(),
            log_level: default_log_level(),
        }
    }
}

/// Upstream feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSettings {
    /// WebSocket URL without credentials.
    pub ws_url: String,
    /// Finnhub API key. Never written back out.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Fixed reconnect delay in milliseconds.
    pub reconnect_delay_ms: u64,
    /// Capacity of the client -> feed channel.
    pub channel_capacity: usize,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            ws_url: FINNHUB_WS_URL.to_string(),
            api_key: None,
            reconnect_delay_ms: 5000,
            channel_capacity: 1000,
        }
    }
}

impl From<&FeedSettings> for FeedConfig {
    fn from(settings: &FeedSettings) -> Self {
        FeedConfig {
            ws_url: settings.ws_url.clone(),
            api_key: settings.api_key.clone(),
            reconnect_delay_ms: settings.reconnect_delay_ms,
            channel_capacity: settings.channel_capacity,
        }
    }
}

/// Downstream server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// HTTP/WebSocket listen port.
    pub port: u16,
    /// Broadcast period in milliseconds.
    pub broadcast_interval_ms: u64,
    /// Buffered events per subscriber before it starts lagging.
    pub broadcast_capacity: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 3000,
            broadcast_interval_ms: 1000,
            broadcast_capacity: 64,
        }
    }
}

impl ServerSettings {
    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_millis(self.broadcast_interval_ms)
    }

    /// Listen on every interface.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}
