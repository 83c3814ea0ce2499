//! Reconciliation of blocks and chains received from peers.

use ledger_core::{Block, BlockRejected, ChainRejected, Ledger};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOutcome {
    /// Same height as our head or older.
    Stale,
    Appended,
    /// Claimed to extend our head but failed validation.
    Rejected(BlockRejected),
    /// Ahead of us without linking to our head; the caller asks peers for their chains.
    ChainRequested,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    Replaced,
    Rejected(ChainRejected),
}

pub fn receive_block(ledger: &mut Ledger, block: Block) -> BlockOutcome {
    let head = ledger.latest_block();
    if block.index <= head.index {
        return BlockOutcome::Stale;
    }
    if block.previous_hash != head.hash {
        return BlockOutcome::ChainRequested;
    }
    match ledger.add_to_chain(block) {
        Ok(()) => BlockOutcome::Appended,
        Err(reason) => BlockOutcome::Rejected(reason),
    }
}

/// Applies the longest-valid-chain rule after ordering the candidate by index.
pub fn receive_chain(ledger: &mut Ledger, mut chain: Vec<Block>) -> ChainOutcome {
    chain.sort_by_key(|block| block.index);
    match ledger.try_replace_chain(chain) {
        Ok(()) => ChainOutcome::Replaced,
        Err(reason) => ChainOutcome::Rejected(reason),
    }
}
