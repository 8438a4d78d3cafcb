//! Core engine of the galena ledger: hash-linked blocks secured by
//! proof-of-work, signed value transfers screened through a pending pool,
//! chain validation with truncation, and longest-chain peer reconciliation.
//!
//! Transport lives in `galena-node`; every consensus rule lives here.

pub mod block;
pub mod chain;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod miner;
pub mod pool;
pub mod sync;

pub use block::{Block, Transaction};
pub use chain::{Chain, ChainParams};
pub use error::{ChainFault, CryptoError, TxRejection, Violation};
pub use ledger::{Ledger, LedgerConfig, LedgerEvent};
pub use pool::TransactionPool;
