use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use crate::block::{Block, Transaction};
use crate::chain::{Chain, ChainParams};
use crate::constants::{DIFFICULTY, MAX_TRANSACTIONS, REWARD_AMOUNT};
use crate::error::{ChainFault, Violation};
use crate::pool::TransactionPool;

/// Knobs for a running ledger. `address` is credited by every reward row
/// this node seeds.
#[derive(Clone, Debug)]
pub struct LedgerConfig {
    pub address: String,
    pub difficulty: usize,
    pub max_transactions: usize,
    pub reward: i64,
}

impl LedgerConfig {
    pub fn new(address: String) -> Self {
        Self {
            address,
            difficulty: DIFFICULTY,
            max_transactions: MAX_TRANSACTIONS,
            reward: REWARD_AMOUNT,
        }
    }
}

/// Signals the transport layer subscribes to.
#[derive(Clone, Debug)]
pub enum LedgerEvent {
    /// A locally mined block was appended and validated; announce it.
    NewBlock(Block),
    /// The chain fell out of sync; run peer reconciliation.
    SyncRequested,
}

/// The chain, the pending pool and their configuration under one owner.
/// Every mutation goes through here; mining and networking stay outside
/// and talk back through [`Ledger::accept_mined`], [`Ledger::accept_remote`]
/// and [`Ledger::adopt`].
pub struct Ledger {
    chain: Chain,
    pool: TransactionPool,
    config: LedgerConfig,
    events: UnboundedSender<LedgerEvent>,
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> (Self, UnboundedReceiver<LedgerEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let chain = Chain::new(ChainParams {
            difficulty: config.difficulty,
            reward: config.reward,
        });
        let pool = TransactionPool::new(
            config.address.clone(),
            config.max_transactions,
            config.reward,
        );
        let ledger = Self {
            chain,
            pool,
            config,
            events,
        };
        (ledger, rx)
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn balance_of(&self, address: &str) -> i64 {
        self.chain.balance_of(address)
    }

    /// Chain records for the wire.
    pub fn snapshot(&self) -> Vec<Block> {
        self.chain.blocks().to_vec()
    }

    /// Feed transactions through the pool. When the pool reaches its
    /// threshold the assembled candidate comes back; hand it to the miner
    /// without awaiting the search.
    pub fn submit(&mut self, transactions: Vec<Transaction>) -> Option<Block> {
        let data = self.pool.add(transactions, &self.chain)?;
        let candidate = Block::next(self.chain.tip(), data);
        info!(
            "assembled candidate block {} with {} transactions",
            candidate.index,
            candidate.data.len()
        );
        Some(candidate)
    }

    /// Append a block this node mined itself. A block that survives
    /// validation is announced for broadcast; a stale one is truncated
    /// away, requesting reconciliation when it no longer lines up.
    pub fn accept_mined(&mut self, block: Block) -> Result<(), Violation> {
        let outcome = self.append_and_validate(block.clone());
        if outcome.is_ok() {
            let _ = self.events.send(LedgerEvent::NewBlock(block));
        }
        outcome
    }

    /// Append a block pushed by a peer. Relaying is the transport's call;
    /// only the resync signal is raised from here.
    pub fn accept_remote(&mut self, block: Block) -> Result<(), Violation> {
        self.append_and_validate(block)
    }

    fn append_and_validate(&mut self, block: Block) -> Result<(), Violation> {
        let index = block.index;
        self.chain.push(block);
        let outcome = self.chain.validate();
        match &outcome {
            Ok(()) => info!("appended block {index}, chain length {}", self.chain.len()),
            Err(violation) => {
                debug!("rejected block {index}: {violation}");
                if violation.fault == ChainFault::OutOfSync {
                    let _ = self.events.send(LedgerEvent::SyncRequested);
                }
            }
        }
        outcome
    }

    /// Wholesale replacement with a reconciled peer chain.
    pub fn adopt(&mut self, chain: Chain) {
        info!("adopting peer chain of length {}", chain.len());
        self.chain.replace(chain);
    }
}
