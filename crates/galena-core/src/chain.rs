use tracing::warn;

use crate::block::Block;
use crate::constants::{DIFFICULTY, REWARD_AMOUNT};
use crate::error::{ChainFault, Violation};

/// Parameters a chain is checked against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainParams {
    pub difficulty: usize,
    pub reward: i64,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            difficulty: DIFFICULTY,
            reward: REWARD_AMOUNT,
        }
    }
}

/// Ordered block sequence. Append-only in normal operation; reconciliation
/// may replace it wholesale and [`Chain::validate`] may truncate its tail.
#[derive(Clone, Debug)]
pub struct Chain {
    blocks: Vec<Block>,
    params: ChainParams,
}

impl Chain {
    /// Fresh chain holding only genesis.
    pub fn new(params: ChainParams) -> Self {
        Self {
            blocks: vec![Block::genesis()],
            params,
        }
    }

    /// Wrap blocks received off the wire; nothing is checked here.
    pub fn from_blocks(blocks: Vec<Block>, params: ChainParams) -> Self {
        Self { blocks, params }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    /// Current tail block.
    pub fn tip(&self) -> &Block {
        self.blocks
            .last()
            .expect("chain holds at least the genesis block")
    }

    /// Append a block exactly as received. Stored hash, nonce and timestamp
    /// are kept; the next [`Chain::validate`] decides whether it survives.
    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Replace the whole sequence with `other`'s blocks.
    pub fn replace(&mut self, other: Chain) {
        self.blocks = other.blocks;
    }

    /// Walk every block from index 1 upward without mutating. The first
    /// failing check classifies the fault; checks run in a fixed order, so
    /// a block that is broken several ways reports the first kind only.
    pub fn verify(&self) -> Result<(), Violation> {
        for i in 1..self.blocks.len() {
            let block = &self.blocks[i];
            let prev = &self.blocks[i - 1];
            let fault = if block.hash != block.calculate_hash() {
                Some(ChainFault::TamperedData)
            } else if block.previous_hash != prev.hash {
                Some(ChainFault::OutOfSync)
            } else if prev.index.checked_add(1) != Some(block.index) {
                // a peer-supplied predecessor at u64::MAX can follow nothing
                Some(ChainFault::OutOfSync)
            } else if !block.meets_difficulty(self.params.difficulty) {
                Some(ChainFault::InvalidPow)
            } else {
                self.reward_fault(block)
            };
            if let Some(fault) = fault {
                return Err(Violation {
                    fault,
                    height: i as u64,
                });
            }
        }
        Ok(())
    }

    /// An unsigned row may only sit at data position 0 and must carry the
    /// configured reward amount.
    fn reward_fault(&self, block: &Block) -> Option<ChainFault> {
        for (pos, tx) in block.data.iter().enumerate() {
            if tx.is_reward() && (pos != 0 || tx.amount != self.params.reward) {
                return Some(ChainFault::InvalidPow);
            }
        }
        None
    }

    /// [`Chain::verify`], then truncate at the first violation so the
    /// surviving prefix is exactly the blocks already checked. One
    /// truncation per call; a later corrupt tail needs another call.
    pub fn validate(&mut self) -> Result<(), Violation> {
        match self.verify() {
            Ok(()) => Ok(()),
            Err(violation) => {
                warn!(
                    "invalid block at height {} ({}), truncating chain",
                    violation.height, violation.fault
                );
                self.blocks.truncate(violation.height as usize);
                Err(violation)
            }
        }
    }

    /// Net of every transfer touching `address`, scanned over the full
    /// chain. Pending transactions are not counted. Adopted chains may
    /// carry any representable amount, so the sum saturates at the i64
    /// extremes instead of wrapping.
    pub fn balance_of(&self, address: &str) -> i64 {
        let mut balance = 0i64;
        for block in &self.blocks {
            for tx in &block.data {
                if tx.sender.as_deref() == Some(address) {
                    balance = balance.saturating_sub(tx.amount);
                }
                if tx.receiver == address {
                    balance = balance.saturating_add(tx.amount);
                }
            }
        }
        balance
    }
}
