//! HTTP and WebSocket server for downstream viewers.
//!
//! Clients connect to `/ws` and receive a `crypto-data` frame once per
//! broadcast tick. Each connection registers with the scheduler for as long
//! as its socket is open.

use crate::error::ServerError;
use crate::state::SharedState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::net::SocketAddr;
use ticker_core::{Snapshot, TradingPair};
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

/// Events pushed to every connected client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Current price and hourly average for every pair.
    #[serde(rename = "crypto-data")]
    DataUpdate([Snapshot; TradingPair::COUNT]),
}

/// Broadcast channel sender.
pub type BroadcastSender = broadcast::Sender<ServerEvent>;

/// Create the HTTP/WebSocket router.
pub fn create_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root_handler))
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state)
}

async fn root_handler() -> &'static str {
    "Hello World!"
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection.
async fn handle_socket(socket: WebSocket, state: SharedState) {
    let client_id = state.next_client_id();
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before registering so the first tick cannot be missed.
    let mut broadcast_rx = state.broadcast_tx.subscribe();
    state.scheduler.on_connect(client_id);
    debug!("Client {} connected ({:?})", client_id, state.scheduler.state());

    let send_task = tokio::spawn(async move {
        loop {
            match broadcast_rx.recv().await {
                Ok(event) => {
                    let json = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(e) => {
                            warn!("Failed to serialize event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Client {} lagged, skipped {} updates", client_id, skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Inbound frames are ignored; pong is handled by axum.
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Close(_)) => break,
            Err(e) => {
                warn!("WebSocket error from client {}: {}", client_id, e);
                break;
            }
            _ => {}
        }
    }

    send_task.abort();
    state.scheduler.on_disconnect(client_id);
}

/// Bind `addr` and serve in the background. Returns the bound address.
pub async fn start_ws_server(state: SharedState, addr: SocketAddr) -> Result<SocketAddr, ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let local_addr = listener
        .local_addr()
        .map_err(|source| ServerError::Bind { addr, source })?;

    info!("Server listening on http://{}", local_addr);

    let app = create_router(state);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok(local_addr)
}
