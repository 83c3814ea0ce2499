//! Wire vocabulary exchanged between peers.
//!
//! Every WebSocket message carries one JSON envelope shaped
//! `{"event": <EVENT>, "message": <payload>}`.
//!
//! Block payloads are strict: `data` must be a JSON string, so a block whose `data` is any
//! other JSON value decodes as [`DecodeError::InvalidPayload`] and is dropped.

use ledger_core::Block;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const REQUEST_CHAIN: &str = "REQUEST_CHAIN";
pub const REQUEST_BLOCK: &str = "REQUEST_BLOCK";
pub const BLOCK: &str = "BLOCK";
pub const CHAIN: &str = "CHAIN";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Ask the peer for its full chain.
    RequestChain,
    /// Ask the peer for its latest block.
    RequestBlock,
    Block(Block),
    Chain(Vec<Block>),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed message: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("unknown event {0:?}")]
    UnknownEvent(String),
    #[error("invalid {event} payload: {source}")]
    InvalidPayload {
        event: &'static str,
        source: serde_json::Error,
    },
}

#[derive(Serialize)]
struct OutboundEnvelope<'a, T: Serialize> {
    event: &'static str,
    message: &'a T,
}

#[derive(Deserialize)]
struct InboundEnvelope {
    event: String,
    #[serde(default)]
    message: serde_json::Value,
}

impl Message {
    pub fn event(&self) -> &'static str {
        match self {
            Message::RequestChain => REQUEST_CHAIN,
            Message::RequestBlock => REQUEST_BLOCK,
            Message::Block(_) => BLOCK,
            Message::Chain(_) => CHAIN,
        }
    }

    /// Requests carry a `null` payload.
    pub fn encode(&self) -> serde_json::Result<String> {
        let event = self.event();
        match self {
            Message::RequestChain | Message::RequestBlock => {
                serde_json::to_string(&OutboundEnvelope { event, message: &() })
            }
            Message::Block(block) => serde_json::to_string(&OutboundEnvelope {
                event,
                message: block,
            }),
            Message::Chain(chain) => serde_json::to_string(&OutboundEnvelope {
                event,
                message: chain,
            }),
        }
    }

    /// Parses one frame into a typed message. Bytes that are not UTF-8 JSON are
    /// `Malformed`. Request payloads are ignored whatever they contain.
    pub fn decode(frame: &[u8]) -> Result<Message, DecodeError> {
        let envelope: InboundEnvelope =
            serde_json::from_slice(frame).map_err(DecodeError::Malformed)?;
        match envelope.event.as_str() {
            REQUEST_CHAIN => Ok(Message::RequestChain),
            REQUEST_BLOCK => Ok(Message::RequestBlock),
            BLOCK => serde_json::from_value(envelope.message)
                .map(Message::Block)
                .map_err(|source| DecodeError::InvalidPayload { event: BLOCK, source }),
            CHAIN => serde_json::from_value(envelope.message)
                .map(Message::Chain)
                .map_err(|source| DecodeError::InvalidPayload { event: CHAIN, source }),
            _ => Err(DecodeError::UnknownEvent(envelope.event)),
        }
    }
}
