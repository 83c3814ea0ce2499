use ledger_core::MiningError;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NodeError>;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        source: std::io::Error,
    },

    #[error("WebSocket handshake with {target} failed: {source}")]
    Handshake {
        target: String,
        source: tokio_tungstenite::tungstenite::Error,
    },

    #[error("connecting to {target} timed out after {timeout:?}")]
    ConnectTimeout { target: String, timeout: Duration },

    #[error("invalid peer address {0:?}, expected host:port")]
    InvalidPeerAddr(String),

    #[error(transparent)]
    Mining(#[from] MiningError),

    #[error("mining worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    /// Every mining round finished after the head had already moved on.
    #[error("chain head advanced during each of {rounds} mining rounds")]
    StaleHead { rounds: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
