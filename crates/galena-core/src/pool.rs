use tracing::{debug, warn};

use crate::block::Transaction;
use crate::chain::Chain;
use crate::crypto::{self, transfer_message};
use crate::error::TxRejection;

/// Pending-transaction buffer. Position 0 always holds the reward row for
/// the next block; screened user transactions queue behind it in submission
/// order. Rejections are logged and dropped without telling the submitter.
#[derive(Debug)]
pub struct TransactionPool {
    pending: Vec<Transaction>,
    max_transactions: usize,
    reward: i64,
    beneficiary: String,
}

impl TransactionPool {
    pub fn new(beneficiary: String, max_transactions: usize, reward: i64) -> Self {
        let mut pool = Self {
            pending: Vec::new(),
            max_transactions,
            reward,
            beneficiary,
        };
        pool.reseed();
        pool
    }

    fn reseed(&mut self) {
        self.pending
            .push(Transaction::reward(&self.beneficiary, self.reward));
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Screen `candidates` against the current chain and queue the
    /// survivors. Once the queue holds the reward row plus at least
    /// `max_transactions` transfers, the whole queue is drained and
    /// returned as the data of the next block, and a fresh reward row is
    /// seeded for the round after.
    ///
    /// Balances are checked against the chain only; earlier pending
    /// transfers from the same sender do not reduce what it can spend.
    pub fn add(&mut self, candidates: Vec<Transaction>, chain: &Chain) -> Option<Vec<Transaction>> {
        for tx in candidates {
            match self.screen(&tx, chain) {
                Ok(()) => {
                    debug!("queued transfer of {} to {}", tx.amount, tx.receiver);
                    self.pending.push(tx);
                }
                Err(reason) => {
                    warn!("dropping transaction: {reason}");
                }
            }
        }
        if self.pending.len() >= self.max_transactions + 1 {
            let data = std::mem::take(&mut self.pending);
            self.reseed();
            return Some(data);
        }
        None
    }

    fn screen(&self, tx: &Transaction, chain: &Chain) -> Result<(), TxRejection> {
        let (sender, signature) = match (&tx.sender, &tx.signature) {
            (Some(sender), Some(signature)) => (sender, signature),
            _ => return Err(TxRejection::Malformed),
        };
        if tx.amount < 0 {
            return Err(TxRejection::Malformed);
        }
        let message = transfer_message(sender, &tx.receiver, tx.amount);
        crypto::verify_transfer(sender, signature, &message)
            .map_err(|_| TxRejection::InvalidSignature)?;
        // amount is non-negative by now, so this comparison cannot overflow
        // the way `balance - amount` would against a negative chain balance
        if chain.balance_of(sender) < tx.amount {
            return Err(TxRejection::InsufficientBalance);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::chain::ChainParams;
    use crate::crypto::Keypair;

    fn signed(keypair: &Keypair, receiver: &str, amount: i64) -> Transaction {
        let message = transfer_message(&keypair.address, receiver, amount);
        Transaction {
            sender: Some(keypair.address.clone()),
            receiver: receiver.to_string(),
            amount,
            signature: Some(crypto::sign_transfer(&keypair.secret_hex, &message).unwrap()),
        }
    }

    /// Chain whose only purpose is to answer balance queries; the pool
    /// never validates it.
    fn funded_chain(address: &str, amount: i64) -> Chain {
        let funding = Block {
            index: 1,
            timestamp: 1,
            previous_hash: "0".to_string(),
            data: vec![Transaction {
                sender: Some("faucet".to_string()),
                receiver: address.to_string(),
                amount,
                signature: Some("sig".to_string()),
            }],
            nonce: 0,
            hash: "0".to_string(),
        };
        Chain::from_blocks(vec![Block::genesis(), funding], ChainParams::default())
    }

    /// Chain in which `address` has only ever sent, leaving it negative.
    fn overdrawn_chain(address: &str, amount: i64) -> Chain {
        let spend = Block {
            index: 1,
            timestamp: 1,
            previous_hash: "0".to_string(),
            data: vec![Transaction {
                sender: Some(address.to_string()),
                receiver: "elsewhere".to_string(),
                amount,
                signature: Some("sig".to_string()),
            }],
            nonce: 0,
            hash: "0".to_string(),
        };
        Chain::from_blocks(vec![Block::genesis(), spend], ChainParams::default())
    }

    #[test]
    fn starts_with_a_single_reward_row() {
        let pool = TransactionPool::new("miner".to_string(), 5, 50);
        assert_eq!(pool.len(), 1);
        assert!(pool.pending[0].is_reward());
        assert_eq!(pool.pending[0].amount, 50);
        assert_eq!(pool.pending[0].receiver, "miner");
    }

    #[test]
    fn drops_unsigned_and_senderless_transactions() {
        let keypair = crypto::generate_keypair();
        let chain = funded_chain(&keypair.address, 100);
        let mut pool = TransactionPool::new("miner".to_string(), 5, 50);
        let mut unsigned = signed(&keypair, "bob", 10);
        unsigned.signature = None;
        let mut senderless = signed(&keypair, "bob", 10);
        senderless.sender = None;
        assert!(pool.add(vec![unsigned, senderless], &chain).is_none());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn drops_negative_amount() {
        let keypair = crypto::generate_keypair();
        let chain = funded_chain(&keypair.address, 100);
        let mut pool = TransactionPool::new("miner".to_string(), 5, 50);
        pool.add(vec![signed(&keypair, "bob", -1)], &chain);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn drops_bad_signature() {
        let keypair = crypto::generate_keypair();
        let chain = funded_chain(&keypair.address, 100);
        let mut pool = TransactionPool::new("miner".to_string(), 5, 50);
        let mut tampered = signed(&keypair, "bob", 10);
        tampered.amount = 90;
        pool.add(vec![tampered], &chain);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn drops_overdraft() {
        let keypair = crypto::generate_keypair();
        let chain = funded_chain(&keypair.address, 30);
        let mut pool = TransactionPool::new("miner".to_string(), 5, 50);
        pool.add(vec![signed(&keypair, "bob", 31)], &chain);
        assert_eq!(pool.len(), 1);
        // spending the exact balance is allowed
        pool.add(vec![signed(&keypair, "bob", 30)], &chain);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn drops_max_amount_from_overdrawn_sender() {
        // a negative chain balance against a near-max amount must not
        // wrap the overdraft comparison into acceptance
        let keypair = crypto::generate_keypair();
        let chain = overdrawn_chain(&keypair.address, 2);
        let mut pool = TransactionPool::new("miner".to_string(), 5, 50);
        pool.add(vec![signed(&keypair, "bob", i64::MAX)], &chain);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn zero_amount_from_empty_balance_is_allowed() {
        let keypair = crypto::generate_keypair();
        let chain = Chain::new(ChainParams::default());
        let mut pool = TransactionPool::new("miner".to_string(), 5, 50);
        pool.add(vec![signed(&keypair, "bob", 0)], &chain);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn pending_spend_is_not_tracked() {
        let keypair = crypto::generate_keypair();
        let chain = funded_chain(&keypair.address, 50);
        let mut pool = TransactionPool::new("miner".to_string(), 5, 50);
        pool.add(vec![signed(&keypair, "bob", 40)], &chain);
        // 40 already queued, but the chain still says 50
        pool.add(vec![signed(&keypair, "carol", 40)], &chain);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn threshold_drains_in_submission_order() {
        let keypair = crypto::generate_keypair();
        let chain = funded_chain(&keypair.address, 100);
        let mut pool = TransactionPool::new("miner".to_string(), 2, 50);
        let first = signed(&keypair, "bob", 10);
        let second = signed(&keypair, "carol", 20);
        assert!(pool.add(vec![first.clone()], &chain).is_none());
        let data = pool.add(vec![second.clone()], &chain).unwrap();
        assert_eq!(data.len(), 3);
        assert!(data[0].is_reward());
        assert_eq!(data[1], first);
        assert_eq!(data[2], second);
        // fresh reward row for the next round
        assert_eq!(pool.len(), 1);
        assert!(pool.pending[0].is_reward());
    }

    #[test]
    fn oversized_batch_drains_whole_queue() {
        let keypair = crypto::generate_keypair();
        let chain = funded_chain(&keypair.address, 100);
        let mut pool = TransactionPool::new("miner".to_string(), 2, 50);
        let batch = vec![
            signed(&keypair, "bob", 1),
            signed(&keypair, "carol", 2),
            signed(&keypair, "dave", 3),
        ];
        let data = pool.add(batch, &chain).unwrap();
        assert_eq!(data.len(), 4);
        assert_eq!(pool.len(), 1);
    }
}
