use std::fmt::Write as _;

use sha2::{Digest, Sha256};
use tokio::sync::oneshot;
use tracing::info;

use crate::block::Block;

/// Proof-of-work search. The preimage prefix is fixed for the whole round,
/// so each attempt hashes the prefix plus the nonce digits and tests the
/// raw digest; nothing allocates once the nonce buffer has warmed up.
/// Starts from whatever nonce the candidate carries and stops at the first
/// satisfying value, so the result is the lowest nonce from that point.
pub fn mine(mut block: Block, difficulty: usize) -> Block {
    let prefix = block.preimage_prefix();
    let mut nonce = String::new();
    loop {
        nonce.clear();
        let _ = write!(nonce, "{}", block.nonce);
        let mut hasher = Sha256::new();
        hasher.update(prefix.as_bytes());
        hasher.update(nonce.as_bytes());
        let digest = hasher.finalize();
        if count_leading_zero_hex(&digest) >= difficulty {
            block.hash = hex::encode(digest);
            info!(
                "mined block {} with nonce {} ({})",
                block.index, block.nonce, block.hash
            );
            return block;
        }
        block.nonce = block.nonce.wrapping_add(1);
    }
}

/// Leading zero hex characters of a raw digest, high nibble first.
pub fn count_leading_zero_hex(digest: &[u8]) -> usize {
    let mut total = 0;
    for byte in digest {
        if byte >> 4 != 0 {
            break;
        }
        total += 1;
        if byte & 0x0f != 0 {
            break;
        }
        total += 1;
    }
    total
}

/// Run the search on a dedicated thread and hand the result back exactly
/// once. The search holds no chain or pool state and cannot be cancelled;
/// a stale result is thrown out by validation when it lands.
pub fn spawn(block: Block, difficulty: usize) -> oneshot::Receiver<Block> {
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let mined = mine(block, difficulty);
        // receiver may be gone if the node is shutting down
        let _ = tx.send(mined);
    });
    rx
}
