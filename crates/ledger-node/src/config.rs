use crate::constants::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_MAX_MINING_ROUNDS, DEFAULT_P2P_PORT,
};
use crate::error::NodeError;
use ledger_core::constants::POW_DIFFICULTY;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

/// Runtime settings for a [`crate::Node`].
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Address the peer listener binds. Port 0 picks an ephemeral port.
    pub p2p_listen: SocketAddr,
    /// Trailing zero hex digits required of every mined block.
    pub difficulty: usize,
    pub connect_timeout: Duration,
    /// Largest inbound WebSocket message or frame accepted from a peer.
    pub max_message_size: usize,
    /// How many times a locally mined block is re-mined when the head moves underneath it.
    pub max_mining_rounds: u32,
    /// Bound on the nonce search; unbounded when `None`.
    pub max_nonce: Option<u64>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            p2p_listen: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_P2P_PORT)),
            difficulty: POW_DIFFICULTY,
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_mining_rounds: DEFAULT_MAX_MINING_ROUNDS,
            max_nonce: None,
        }
    }
}

/// A manually supplied `host:port` peer address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerAddr {
    pub host: String,
    pub port: u16,
}

impl FromStr for PeerAddr {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || NodeError::InvalidPeerAddr(s.to_string());
        let (host, port) = s.rsplit_once(':').ok_or_else(invalid)?;
        if host.is_empty() {
            return Err(invalid());
        }
        let port = port.parse().map_err(|_| invalid())?;
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
