//! Protocol parameters shared by every node.

/// Leading zero hex characters required of a block hash.
pub const DIFFICULTY: usize = 4;

/// User transactions per block; the reward row comes on top of these.
pub const MAX_TRANSACTIONS: usize = 5;

/// Amount credited to the miner by the reward transaction.
pub const REWARD_AMOUNT: i64 = 50;

/// Sentinel parent hash of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Fixed genesis timestamp so every node derives the same block zero.
pub const GENESIS_TIMESTAMP: u64 = 0;

/// Seconds a peer gets to answer a chain request during reconciliation.
pub const SYNC_TIMEOUT_SECS: u64 = 10;
