//! Errors that stop the server process.

use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to listen for shutdown signal: {0}")]
    Signal(#[source] std::io::Error),

    #[error("Failed to set tracing subscriber: {0}")]
    Logging(String),
}
