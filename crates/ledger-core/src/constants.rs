pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;

/// Number of trailing `'0'` characters a mined block's hex digest must carry.
pub const POW_DIFFICULTY: usize = 3;

pub const GENESIS_TIMESTAMP: u64 = 1_511_818_270_000;
pub const GENESIS_DATA: &str = "Our genesis data";
pub const GENESIS_PREVIOUS_HASH: &str = "-1";
