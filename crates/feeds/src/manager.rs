//! Feed connection settings and lifecycle state.

use crate::FeedError;
use std::time::Duration;
use url::Url;

/// Default Finnhub WebSocket endpoint.
pub const FINNHUB_WS_URL: &str = "wss://ws.finnhub.io";

/// Environment variable holding the Finnhub credential.
pub const API_KEY_ENV: &str = "FINNHUB_API_KEY";

/// Connection state for the upstream feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    Stopped,
}

impl ConnectionState {
    /// Transition to connecting state. A pending reconnect keeps its attempt number.
    pub fn connect(self) -> Self {
        match self {
            ConnectionState::Reconnecting { attempt } => ConnectionState::Reconnecting { attempt },
            _ => ConnectionState::Connecting,
        }
    }

    /// Transition to connected state.
    pub fn connected(self) -> Self {
        ConnectionState::Connected
    }

    /// Transition after the socket closed. Counts consecutive attempts.
    pub fn disconnect(self) -> Self {
        match self {
            ConnectionState::Reconnecting { attempt } => ConnectionState::Reconnecting {
                attempt: attempt.saturating_add(1),
            },
            ConnectionState::Stopped => ConnectionState::Stopped,
            _ => ConnectionState::Reconnecting { attempt: 1 },
        }
    }

    /// Terminal state after cancellation.
    pub fn stop(self) -> Self {
        ConnectionState::Stopped
    }

    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// Configuration for the upstream feed connection.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// WebSocket URL without credentials
    pub ws_url: String,
    /// API token appended as `?token=`
    pub api_key: Option<String>,
    /// Fixed delay before reconnecting (ms)
    pub reconnect_delay_ms: u64,
    /// Capacity of the client -> feed channel
    pub channel_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            ws_url: FINNHUB_WS_URL.to_string(),
            api_key: None,
            reconnect_delay_ms: 5000,
            channel_capacity: 1000,
        }
    }
}

impl FeedConfig {
    /// Create config for the Finnhub endpoint with the given credential.
    pub fn finnhub(api_key: Option<String>) -> Self {
        Self {
            api_key,
            ..Default::default()
        }
    }

    /// Credential, treating an empty string as absent.
    pub fn credential(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }

    /// Authenticated endpoint URL.
    pub fn endpoint(&self) -> Result<Url, FeedError> {
        let key = self
            .credential()
            .ok_or(FeedError::MissingCredential(API_KEY_ENV))?;
        let mut url = Url::parse(&self.ws_url)?;
        url.query_pairs_mut().append_pair("token", key);
        Ok(url)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}
