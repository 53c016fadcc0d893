//! WebSocket client for the upstream feed connection.

use crate::{ConnectionState, FeedConfig, FeedError};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::connect_async;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Message received from WebSocket.
#[derive(Debug, Clone, PartialEq)]
pub enum WsMessage {
    /// Text message (JSON).
    Text(String),
    /// Binary message.
    Binary(Vec<u8>),
    /// Connection established (first time).
    Connected,
    /// Connection closed; a reconnect is scheduled.
    Disconnected,
    /// Reconnected after disconnection.
    Reconnected,
    /// Transport error that did not close the connection.
    Error(String),
}

/// How a single connection ended.
enum SessionEnd {
    /// Socket closed or failed; reconnect after the fixed delay.
    Closed(FeedError),
    /// Cancelled, or nobody is listening any more.
    Shutdown,
}

/// WebSocket client for the upstream feed.
///
/// Reconnects after every close with a fixed delay and no attempt limit.
/// The loop only exits when `cancel` fires or the receiver is dropped.
pub struct WsClient {
    config: FeedConfig,
    tx: mpsc::Sender<WsMessage>,
    cancel: CancellationToken,
}

impl WsClient {
    /// Create a new WebSocket client.
    pub fn new(config: FeedConfig, tx: mpsc::Sender<WsMessage>, cancel: CancellationToken) -> Self {
        Self { config, tx, cancel }
    }

    /// Connect, subscribe, and keep the connection alive until cancelled.
    pub async fn run(self, subscribe_msgs: Vec<String>) -> Result<(), FeedError> {
        let url = self.config.endpoint()?;
        let delay = self.config.reconnect_delay();
        let mut state = ConnectionState::Disconnected;
        let mut has_connected_once = false;

        loop {
            state = state.connect();

            match self
                .connect_and_handle(url.as_str(), &subscribe_msgs, has_connected_once, &mut state)
                .await
            {
                SessionEnd::Shutdown => break,
                SessionEnd::Closed(e) => {
                    has_connected_once |= state.is_connected();
                    state = state.disconnect();

                    warn!(
                        "Upstream WebSocket closed: {}. Reconnecting in {:.1}s ({:?})",
                        e,
                        delay.as_secs_f64(),
                        state
                    );

                    if self.tx.send(WsMessage::Disconnected).await.is_err() {
                        break;
                    }

                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        state = state.stop();
        debug!("Upstream WebSocket client stopped ({:?})", state);
        Ok(())
    }

    async fn connect_and_handle(
        &self,
        url: &str,
        subscribe_msgs: &[String],
        is_reconnect: bool,
        state: &mut ConnectionState,
    ) -> SessionEnd {
        debug!("Connecting to upstream feed");

        let connected = tokio::select! {
            _ = self.cancel.cancelled() => return SessionEnd::Shutdown,
            res = connect_async(url) => res,
        };
        let (ws_stream, response) = match connected {
            Ok(conn) => conn,
            Err(e) => return SessionEnd::Closed(e.into()),
        };

        info!(
            "{} to upstream feed (status: {:?})",
            if is_reconnect { "Reconnected" } else { "Connected" },
            response.status()
        );
        *state = state.clone().connected();

        let event = if is_reconnect {
            WsMessage::Reconnected
        } else {
            WsMessage::Connected
        };
        if self.tx.send(event).await.is_err() {
            return SessionEnd::Shutdown;
        }

        let (mut write, mut read) = ws_stream.split();

        for msg in subscribe_msgs {
            if let Err(e) = write.send(Message::Text(msg.clone())).await {
                error!("Failed to send subscription: {}", e);
                return SessionEnd::Closed(FeedError::ConnectionFailed(format!(
                    "Subscription failed: {}",
                    e
                )));
            }
            debug!("Subscribed: {}", msg);
        }

        loop {
            let msg = tokio::select! {
                _ = self.cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    return SessionEnd::Shutdown;
                }
                msg = read.next() => msg,
            };

            let forward = match msg {
                Some(Ok(Message::Text(text))) => WsMessage::Text(text),
                Some(Ok(Message::Binary(data))) => WsMessage::Binary(data),
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = write.send(Message::Pong(data)).await {
                        return SessionEnd::Closed(FeedError::ConnectionFailed(format!(
                            "PONG send failed: {}",
                            e
                        )));
                    }
                    continue;
                }
                Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => continue,
                Some(Ok(Message::Close(frame))) => {
                    debug!("Received close frame: {:?}", frame);
                    return SessionEnd::Closed(FeedError::Disconnected(
                        "Close frame received".to_string(),
                    ));
                }
                Some(Err(e)) if is_fatal(&e) => {
                    error!("Upstream WebSocket read error: {}", e);
                    return SessionEnd::Closed(e.into());
                }
                Some(Err(e)) => {
                    error!("Upstream WebSocket error: {}", e);
                    WsMessage::Error(e.to_string())
                }
                None => {
                    return SessionEnd::Closed(FeedError::Disconnected("Stream ended".to_string()));
                }
            };

            // Awaiting backpressure keeps trades in delivery order and never drops them.
            if self.tx.send(forward).await.is_err() {
                return SessionEnd::Shutdown;
            }
        }
    }
}

/// Errors after which the socket cannot be read again.
fn is_fatal(err: &tungstenite::Error) -> bool {
    matches!(
        err,
        tungstenite::Error::ConnectionClosed
            | tungstenite::Error::AlreadyClosed
            | tungstenite::Error::Io(_)
            | tungstenite::Error::Tls(_)
            | tungstenite::Error::Protocol(_)
    )
}
