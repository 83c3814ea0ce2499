use crate::constants::{GENESIS_DATA, GENESIS_PREVIOUS_HASH, GENESIS_TIMESTAMP, POW_DIFFICULTY};
use crate::{pow, Block};
use thiserror::Error;
use tracing::debug;

/// Why `Ledger::add_to_chain` refused a block. Checks run in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockRejected {
    #[error("expected index {expected}, got {actual}")]
    IndexMismatch { expected: u64, actual: u64 },
    #[error("previous hash {actual} does not match head hash {expected}")]
    PreviousHashMismatch { expected: String, actual: String },
    #[error("stored hash {stored} does not match computed hash {computed}")]
    HashMismatch { stored: String, computed: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainRejected {
    #[error("candidate chain is empty")]
    Empty,
    #[error("candidate chain is not rooted at our genesis block")]
    GenesisMismatch,
    #[error("block at position {position} has index {index}")]
    IndexGap { position: usize, index: u64 },
    #[error("block {index} does not link to its predecessor")]
    BrokenLink { index: u64 },
    #[error("block {index} carries a hash that does not match its fields")]
    HashMismatch { index: u64 },
    #[error("block {index} hash {hash} lacks proof of work")]
    InsufficientWork { index: u64, hash: String },
    #[error("candidate has {candidate} blocks, local chain has {local}")]
    NotLonger { candidate: usize, local: usize },
}

/// The fixed root every conforming node starts from.
pub fn genesis_block() -> Block {
    let mut genesis = Block {
        index: 0,
        timestamp: GENESIS_TIMESTAMP,
        data: GENESIS_DATA.to_string(),
        previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
        nonce: 0,
        hash: String::new(),
    };
    genesis.hash = genesis.compute_hash();
    genesis
}

/// In-memory append-only chain. The head is always the last element, and the chain is
/// never empty once constructed.
#[derive(Clone, Debug)]
pub struct Ledger {
    genesis: Block,
    chain: Vec<Block>,
    difficulty: usize,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::with_difficulty(POW_DIFFICULTY)
    }

    pub fn with_difficulty(difficulty: usize) -> Self {
        let genesis = genesis_block();
        Self {
            chain: vec![genesis.clone()],
            genesis,
            difficulty,
        }
    }

    /// Resets the ledger to a single genesis block, discarding everything else.
    pub fn init(&mut self) {
        self.genesis = genesis_block();
        self.chain = vec![self.genesis.clone()];
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn genesis(&self) -> &Block {
        &self.genesis
    }

    pub fn latest_block(&self) -> &Block {
        self.chain.last().unwrap_or(&self.genesis)
    }

    pub fn total_blocks(&self) -> usize {
        self.chain.len()
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    /// Mines a successor of the current head. The ledger itself is left untouched.
    pub fn create_block(&self, data: impl Into<String>) -> Block {
        pow::mine_block(Block::next(self.latest_block(), data), self.difficulty)
    }

    pub fn add_to_chain(&mut self, block: Block) -> Result<(), BlockRejected> {
        check_successor(self.latest_block(), &block)?;
        debug!(index = block.index, hash = %block.hash, "block appended");
        self.chain.push(block);
        Ok(())
    }

    pub fn check_new_chain_is_valid(&self, candidate: &[Block]) -> bool {
        self.validate_chain(candidate).is_ok()
    }

    /// Full validation of a candidate chain: genesis match, consecutive indices, linkage,
    /// self-consistent hashes and proof of work on every non-genesis block.
    pub fn validate_chain(&self, candidate: &[Block]) -> Result<(), ChainRejected> {
        let first = candidate.first().ok_or(ChainRejected::Empty)?;
        if first.compute_hash() != self.genesis.hash || first.hash != self.genesis.hash {
            return Err(ChainRejected::GenesisMismatch);
        }

        for (position, pair) in candidate.windows(2).enumerate() {
            let (previous, block) = (&pair[0], &pair[1]);
            if block.index != position as u64 + 1 {
                return Err(ChainRejected::IndexGap {
                    position: position + 1,
                    index: block.index,
                });
            }
            if block.previous_hash != previous.compute_hash() {
                return Err(ChainRejected::BrokenLink { index: block.index });
            }
            if !block.has_valid_hash() {
                return Err(ChainRejected::HashMismatch { index: block.index });
            }
            if !pow::meets_difficulty(&block.hash, self.difficulty) {
                return Err(ChainRejected::InsufficientWork {
                    index: block.index,
                    hash: block.hash.clone(),
                });
            }
        }
        Ok(())
    }

    /// Swaps in `candidate` wholesale. Callers validate first; an empty candidate leaves
    /// the ledger untouched.
    pub fn replace_chain(&mut self, candidate: Vec<Block>) {
        if candidate.is_empty() {
            return;
        }
        self.chain = candidate;
    }

    /// Longest-valid-chain rule: adopt `candidate` only if it is strictly longer than the
    /// local chain and fully valid.
    pub fn try_replace_chain(&mut self, candidate: Vec<Block>) -> Result<(), ChainRejected> {
        if candidate.len() <= self.total_blocks() {
            return Err(ChainRejected::NotLonger {
                candidate: candidate.len(),
                local: self.total_blocks(),
            });
        }
        self.validate_chain(&candidate)?;
        self.replace_chain(candidate);
        Ok(())
    }
}

fn check_successor(head: &Block, block: &Block) -> Result<(), BlockRejected> {
    if block.index != head.index + 1 {
        return Err(BlockRejected::IndexMismatch {
            expected: head.index + 1,
            actual: block.index,
        });
    }
    if block.previous_hash != head.hash {
        return Err(BlockRejected::PreviousHashMismatch {
            expected: head.hash.clone(),
            actual: block.previous_hash.clone(),
        });
    }
    let computed = block.compute_hash();
    if computed != block.hash {
        return Err(BlockRejected::HashMismatch {
            stored: block.hash.clone(),
            computed,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENESIS_HASH: &str = "2caf601e673c319ca7df1a4f6b967316efea6f7d9f7ae1062dc5df87ce9ac55d";

    fn ledger_with(blocks: usize) -> Ledger {
        tagged_ledger("block", blocks)
    }

    fn tagged_ledger(tag: &str, blocks: usize) -> Ledger {
        let mut ledger = Ledger::new();
        for i in 0..blocks {
            let block = ledger.create_block(format!("{tag} {i}"));
            ledger.add_to_chain(block).unwrap();
        }
        ledger
    }

    #[test]
    fn genesis_block_example() {
        let ledger = Ledger::new();
        let genesis = ledger.latest_block();
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.previous_hash, "-1");
        assert_eq!(genesis.nonce, 0);
        assert_eq!(genesis.data, GENESIS_DATA);
        assert_eq!(genesis.timestamp, GENESIS_TIMESTAMP);
        assert_eq!(genesis.hash, GENESIS_HASH);
        assert_eq!(ledger.total_blocks(), 1);
    }

    #[test]
    fn independent_ledgers_share_genesis() {
        assert_eq!(Ledger::new().genesis(), Ledger::with_difficulty(1).genesis());
    }

    #[test]
    fn init_resets_to_genesis() {
        let mut ledger = ledger_with(2);
        assert_eq!(ledger.total_blocks(), 3);
        ledger.init();
        assert_eq!(ledger.total_blocks(), 1);
        assert_eq!(ledger.latest_block().hash, GENESIS_HASH);
    }

    #[test]
    fn create_block_example() {
        let ledger = Ledger::new();
        let block = ledger.create_block("hello");
        assert_eq!(block.index, 1);
        assert_eq!(block.previous_hash, GENESIS_HASH);
        assert_eq!(block.data, "hello");
        assert!(block.hash.ends_with("000"));
        assert!(block.has_valid_hash());
        // mining does not touch the ledger
        assert_eq!(ledger.total_blocks(), 1);
    }

    #[test]
    fn create_block_links_to_current_head() {
        let ledger = ledger_with(2);
        let head = ledger.latest_block().clone();
        let block = ledger.create_block("third");
        assert_eq!(block.index, head.index + 1);
        assert_eq!(block.previous_hash, head.hash);
        assert!(pow::meets_difficulty(&block.hash, POW_DIFFICULTY));
    }

    #[test]
    fn add_to_chain_advances_head() {
        let mut ledger = Ledger::new();
        let block = ledger.create_block("hello");
        ledger.add_to_chain(block.clone()).unwrap();
        assert_eq!(ledger.latest_block(), &block);
        assert_eq!(ledger.total_blocks(), 2);
    }

    #[test]
    fn add_to_chain_rejects_non_consecutive_index() {
        let mut ledger = Ledger::new();
        let mut block = ledger.create_block("hello");
        block.index = 2;
        block = pow::mine_block(block, POW_DIFFICULTY);
        assert_eq!(
            ledger.add_to_chain(block),
            Err(BlockRejected::IndexMismatch {
                expected: 1,
                actual: 2
            })
        );
        assert_eq!(ledger.total_blocks(), 1);
    }

    #[test]
    fn add_to_chain_rejects_wrong_previous_hash() {
        let mut ledger = Ledger::new();
        let mut block = ledger.create_block("hello");
        block.previous_hash = "f".repeat(64);
        block = pow::mine_block(block, POW_DIFFICULTY);
        assert!(matches!(
            ledger.add_to_chain(block),
            Err(BlockRejected::PreviousHashMismatch { .. })
        ));
        assert_eq!(ledger.total_blocks(), 1);
    }

    #[test]
    fn add_to_chain_rejects_tampered_hash() {
        let mut ledger = Ledger::new();
        let mut block = ledger.create_block("hello");
        block.data = "tampered".to_string();
        assert!(matches!(
            ledger.add_to_chain(block),
            Err(BlockRejected::HashMismatch { .. })
        ));
        assert_eq!(ledger.total_blocks(), 1);
    }

    #[test]
    fn valid_chain_satisfies_linkage_and_work() {
        let source = ledger_with(4);
        let chain = source.chain();
        assert!(Ledger::new().check_new_chain_is_valid(chain));
        for pair in chain.windows(2) {
            assert_eq!(pair[1].previous_hash, pair[0].compute_hash());
            assert!(pow::meets_difficulty(&pair[1].hash, POW_DIFFICULTY));
        }
    }

    #[test]
    fn validate_chain_rejects_foreign_genesis() {
        let mut chain = ledger_with(1).chain().to_vec();
        chain[0].data = "another genesis".to_string();
        chain[0].hash = chain[0].compute_hash();
        assert_eq!(
            Ledger::new().validate_chain(&chain),
            Err(ChainRejected::GenesisMismatch)
        );
        assert_eq!(Ledger::new().validate_chain(&[]), Err(ChainRejected::Empty));
    }

    #[test]
    fn validate_chain_rejects_broken_link() {
        let mut chain = ledger_with(3).chain().to_vec();
        chain[1].data = "rewritten history".to_string();
        chain[1] = pow::mine_block(chain[1].clone(), POW_DIFFICULTY);
        assert_eq!(
            Ledger::new().validate_chain(&chain),
            Err(ChainRejected::BrokenLink { index: 2 })
        );
    }

    #[test]
    fn validate_chain_rejects_missing_work() {
        let mut chain = ledger_with(1).chain().to_vec();
        let mut lazy = Block::next(chain.last().unwrap(), "no work");
        while pow::meets_difficulty(&lazy.hash, POW_DIFFICULTY) {
            lazy.nonce += 1;
            lazy.hash = lazy.compute_hash();
        }
        chain.push(lazy);
        assert!(matches!(
            Ledger::new().validate_chain(&chain),
            Err(ChainRejected::InsufficientWork { index: 2, .. })
        ));
    }

    #[test]
    fn validate_chain_rejects_forged_tip_hash() {
        let mut chain = ledger_with(2).chain().to_vec();
        let tip = chain.last_mut().unwrap();
        tip.hash = format!("{}000", "a".repeat(61));
        assert_eq!(
            Ledger::new().validate_chain(&chain),
            Err(ChainRejected::HashMismatch { index: 2 })
        );
    }

    #[test]
    fn validate_chain_rejects_index_gap() {
        let mut chain = ledger_with(2).chain().to_vec();
        chain.remove(1);
        assert!(matches!(
            Ledger::new().validate_chain(&chain),
            Err(ChainRejected::IndexGap { position: 1, index: 2 })
        ));
    }

    #[test]
    fn try_replace_chain_requires_strictly_longer() {
        let mut local = tagged_ledger("local", 2);
        let equal = tagged_ledger("remote", 2).chain().to_vec();
        assert_ne!(local.chain(), equal.as_slice());
        assert_eq!(
            local.try_replace_chain(equal),
            Err(ChainRejected::NotLonger {
                candidate: 3,
                local: 3
            })
        );

        let longer = ledger_with(3).chain().to_vec();
        local.try_replace_chain(longer.clone()).unwrap();
        assert_eq!(local.chain(), longer.as_slice());
        assert_eq!(local.latest_block(), longer.last().unwrap());
    }

    #[test]
    fn try_replace_chain_rejects_longer_invalid_chain() {
        let mut local = ledger_with(1);
        let mut longer = ledger_with(3).chain().to_vec();
        longer[2].data = "forged".to_string();
        assert!(local.try_replace_chain(longer).is_err());
        assert_eq!(local.total_blocks(), 2);
    }

    #[test]
    fn replace_chain_is_unconditional() {
        let mut local = ledger_with(3);
        let shorter = ledger_with(1).chain().to_vec();
        local.replace_chain(shorter.clone());
        assert_eq!(local.chain(), shorter.as_slice());
        local.replace_chain(Vec::new());
        assert_eq!(local.total_blocks(), 2);
    }
}
