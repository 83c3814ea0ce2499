use crate::{hash_with_nonce, pow::meets_difficulty, Block};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MiningError {
    #[error("mining cancelled")]
    Cancelled,
    #[error("no nonce below {max_nonce} satisfies difficulty {difficulty}")]
    Exhausted { max_nonce: u64, difficulty: usize },
}

/// Mines `candidate` by searching nonces in parallel until its hex digest ends in
/// `difficulty` zero digits. Only the nonce and hash of `candidate` change.
///
/// The search covers `0..max_nonce` (the whole `u64` range when `None`) and stops early
/// once `cancel` is raised. Any satisfying nonce may win, not necessarily the smallest.
pub fn mine_block_parallel(
    mut candidate: Block,
    difficulty: usize,
    max_nonce: Option<u64>,
    cancel: &AtomicBool,
) -> Result<Block, MiningError> {
    let prefix = candidate.prefix_hasher();
    let limit = max_nonce.unwrap_or(u64::MAX);

    // Some(None) signals cancellation; the outer None means the range ran dry.
    let found = (0u64..limit).into_par_iter().find_map_any(|nonce| {
        if cancel.load(Ordering::Relaxed) {
            return Some(None);
        }
        let hash = hash_with_nonce(&prefix, nonce);
        meets_difficulty(&hash, difficulty).then_some(Some((nonce, hash)))
    });

    match found {
        Some(Some((nonce, hash))) => {
            info!(index = candidate.index, nonce, %hash, "mined block");
            candidate.nonce = nonce;
            candidate.hash = hash;
            Ok(candidate)
        }
        Some(None) => Err(MiningError::Cancelled),
        None => Err(MiningError::Exhausted {
            max_nonce: limit,
            difficulty,
        }),
    }
}
