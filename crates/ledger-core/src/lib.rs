use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod chain;
pub mod constants;
pub mod mine;

pub use chain::{genesis_block, BlockRejected, ChainRejected, Ledger};
pub use mine::{mine_block_parallel, MiningError};

/// A hash-linked record. Field names on the wire are camelCase so that nodes agree on
/// the JSON shape as well as on the digest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    /// Milliseconds since the unix epoch.
    pub timestamp: u64,
    pub data: String,
    pub previous_hash: String,
    pub nonce: u64,
    pub hash: String,
}

impl Block {
    /// Builds an unmined successor of `head` carrying `data`, stamped with the current time.
    pub fn next(head: &Block, data: impl Into<String>) -> Self {
        let mut block = Block {
            index: head.index + 1,
            timestamp: now_millis(),
            data: data.into(),
            previous_hash: head.hash.clone(),
            nonce: 0,
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Hasher primed with every field that precedes the nonce in the preimage:
    /// `timestamp ++ data ++ index ++ previous_hash`.
    pub(crate) fn prefix_hasher(&self) -> Sha256 {
        let mut hasher = Sha256::new();
        hasher.update(self.timestamp.to_string());
        hasher.update(self.data.as_bytes());
        hasher.update(self.index.to_string());
        hasher.update(self.previous_hash.as_bytes());
        hasher
    }

    /// Hex SHA-256 of `timestamp ++ data ++ index ++ previous_hash ++ nonce`, each
    /// number in its decimal form.
    pub fn compute_hash(&self) -> String {
        hash_with_nonce(&self.prefix_hasher(), self.nonce)
    }

    pub fn has_valid_hash(&self) -> bool {
        self.compute_hash() == self.hash
    }
}

pub(crate) fn hash_with_nonce(prefix: &Sha256, nonce: u64) -> String {
    let mut hasher = prefix.clone();
    hasher.update(nonce.to_string());
    hex::encode(hasher.finalize())
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

pub mod pow {
    use super::Block;

    /// Number of trailing `'0'` characters in a hex digest.
    pub fn trailing_zero_digits(hash: &str) -> usize {
        hash.bytes().rev().take_while(|b| *b == b'0').count()
    }

    pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
        trailing_zero_digits(hash) >= difficulty
    }

    /// Mine the block by incrementing the nonce from its current value until the
    /// digest ends in `difficulty` zero digits.
    pub fn mine_block(mut block: Block, difficulty: usize) -> Block {
        let prefix = block.prefix_hasher();
        loop {
            block.hash = super::hash_with_nonce(&prefix, block.nonce);
            if meets_difficulty(&block.hash, difficulty) {
                return block;
            }
            block.nonce = block.nonce.wrapping_add(1);
        }
    }
}
