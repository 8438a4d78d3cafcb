use std::fmt::Write as _;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants::{GENESIS_PREVIOUS_HASH, GENESIS_TIMESTAMP};

/// A single value transfer. `sender` and `signature` are absent only on the
/// reward row the protocol itself places at the head of a block's data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub sender: Option<String>,
    pub receiver: String,
    pub amount: i64,
    #[serde(default)]
    pub signature: Option<String>,
}

impl Transaction {
    /// The unsigned transfer crediting a miner for a block.
    pub fn reward(receiver: &str, amount: i64) -> Self {
        Self {
            sender: None,
            receiver: receiver.to_string(),
            amount,
            signature: None,
        }
    }

    pub fn is_reward(&self) -> bool {
        self.sender.is_none()
    }
}

/// One link of the chain. The stored `hash` covers every other field, so any
/// change to the serialized form must go back through [`Block::calculate_hash`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    /// Unix milliseconds at assembly time.
    pub timestamp: u64,
    pub previous_hash: String,
    pub data: Vec<Transaction>,
    pub nonce: u64,
    pub hash: String,
}

impl Block {
    /// Unmined candidate extending `prev`. The hash is filled in so the
    /// block is well formed before the nonce search starts.
    pub fn next(prev: &Block, data: Vec<Transaction>) -> Self {
        let mut block = Self {
            index: prev.index + 1,
            timestamp: unix_millis(),
            previous_hash: prev.hash.clone(),
            data,
            nonce: 0,
            hash: String::new(),
        };
        block.hash = block.calculate_hash();
        block
    }

    /// The fixed record every chain starts from. Validation walks from
    /// index 1 upward, so genesis carries no proof of work.
    pub fn genesis() -> Self {
        let mut block = Self {
            index: 0,
            timestamp: GENESIS_TIMESTAMP,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            data: Vec::new(),
            nonce: 0,
            hash: String::new(),
        };
        block.hash = block.calculate_hash();
        block
    }

    /// Everything of the hashing preimage up to the nonce. Transfers render
    /// as `sender|receiver|amount` joined by commas, an absent sender as the
    /// literal `null`. The miner reuses this across a whole nonce search.
    pub(crate) fn preimage_prefix(&self) -> String {
        let mut txs = String::new();
        for (i, tx) in self.data.iter().enumerate() {
            if i > 0 {
                txs.push(',');
            }
            let _ = write!(
                txs,
                "{}|{}|{}",
                tx.sender.as_deref().unwrap_or("null"),
                tx.receiver,
                tx.amount
            );
        }
        format!(
            "{} {} {} {} ",
            self.index, self.timestamp, self.previous_hash, txs
        )
    }

    /// SHA-256 of the preimage, hex encoded.
    pub fn calculate_hash(&self) -> String {
        let preimage = format!("{}{}", self.preimage_prefix(), self.nonce);
        let mut hasher = Sha256::new();
        hasher.update(preimage.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Whether the stored hash has at least `difficulty` leading zero hex
    /// characters.
    pub fn meets_difficulty(&self, difficulty: usize) -> bool {
        self.hash.len() >= difficulty && self.hash.bytes().take(difficulty).all(|b| b == b'0')
    }
}

pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(sender: &str, receiver: &str, amount: i64) -> Transaction {
        Transaction {
            sender: Some(sender.to_string()),
            receiver: receiver.to_string(),
            amount,
            signature: Some("sig".to_string()),
        }
    }

    #[test]
    fn genesis_is_deterministic() {
        let a = Block::genesis();
        let b = Block::genesis();
        assert_eq!(a, b);
        assert_eq!(a.hash, a.calculate_hash());
        assert_eq!(a.previous_hash, "0");
    }

    #[test]
    fn hash_changes_with_nonce() {
        let mut block = Block::next(&Block::genesis(), vec![transfer("alice", "bob", 5)]);
        let before = block.calculate_hash();
        block.nonce += 1;
        assert_ne!(before, block.calculate_hash());
    }

    #[test]
    fn hash_covers_transaction_data() {
        let mut block = Block::next(&Block::genesis(), vec![transfer("alice", "bob", 5)]);
        assert_eq!(block.hash, block.calculate_hash());
        block.data[0].amount = 500;
        assert_ne!(block.hash, block.calculate_hash());
    }

    #[test]
    fn reward_row_hashes_with_null_sender() {
        let with_reward = Block::next(&Block::genesis(), vec![Transaction::reward("miner", 50)]);
        let with_named = Block::next(
            &Block::genesis(),
            vec![transfer("null", "miner", 50)],
        );
        // both render the sender as the literal `null`
        let mut renamed = with_named.clone();
        renamed.timestamp = with_reward.timestamp;
        assert_eq!(with_reward.calculate_hash(), renamed.calculate_hash());
    }

    #[test]
    fn meets_difficulty_counts_leading_zeros() {
        let mut block = Block::genesis();
        block.hash = "000abc".to_string();
        assert!(block.meets_difficulty(0));
        assert!(block.meets_difficulty(3));
        assert!(!block.meets_difficulty(4));
    }

    #[test]
    fn wire_format_is_camel_case() {
        let value = serde_json::to_value(Block::genesis()).unwrap();
        assert!(value.get("previousHash").is_some());
        assert!(value.get("previous_hash").is_none());
    }

    #[test]
    fn reward_row_round_trips_with_null_fields() {
        let json = r#"{"sender":null,"receiver":"miner","amount":50,"signature":null}"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert!(tx.is_reward());
        assert_eq!(tx, Transaction::reward("miner", 50));
    }

    #[test]
    fn omitted_optional_fields_deserialize_as_absent() {
        let json = r#"{"receiver":"miner","amount":50}"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert!(tx.sender.is_none());
        assert!(tx.signature.is_none());
    }
}
