//! Peer-to-peer synchronisation for the proof-of-work ledger.
//!
//! Nodes keep persistent WebSocket connections carrying one JSON message per frame and
//! converge on the longest valid chain.

pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod message;
pub mod node;
pub mod peers;
pub mod sync;

pub use config::{NodeConfig, PeerAddr};
pub use error::{NodeError, Result};
pub use message::{DecodeError, Message};
pub use node::{Node, Stats};
pub use peers::{Direction, PeerId, PeerInfo, PeerSet};
