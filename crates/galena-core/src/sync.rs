//! Peer reconciliation: fan out a chain request to every peer, keep the
//! longest answer that verifies, ignore everything else.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::block::Block;
use crate::chain::Chain;

/// Ask every peer for its chain concurrently and fold the answers into the
/// best replacement candidate. A peer that errors, answers garbage or
/// outlasts `per_peer_timeout` counts as absent rather than failing the
/// round. Returns the longest valid chain strictly longer than `local`, or
/// `None` when no peer offers one.
pub async fn reconcile<F, Fut>(
    local: &Chain,
    peers: &[String],
    per_peer_timeout: Duration,
    fetch: F,
) -> Option<Chain>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Option<Vec<Block>>> + Send + 'static,
{
    let mut requests = JoinSet::new();
    for peer in peers {
        let request = fetch(peer.clone());
        requests.spawn(async move { timeout(per_peer_timeout, request).await.ok().flatten() });
    }

    let mut best: Option<Chain> = None;
    let mut best_len = local.len();
    while let Some(joined) = requests.join_next().await {
        let Ok(Some(blocks)) = joined else { continue };
        if blocks.len() <= best_len {
            debug!(
                "ignoring peer chain of length {} (have {})",
                blocks.len(),
                best_len
            );
            continue;
        }
        let candidate = Chain::from_blocks(blocks, local.params().clone());
        match candidate.verify() {
            Ok(()) => {
                best_len = candidate.len();
                best = Some(candidate);
            }
            Err(violation) => {
                debug!("ignoring invalid peer chain: {violation}");
            }
        }
    }

    if let Some(chain) = &best {
        info!(
            "reconciled to peer chain of length {} (local was {})",
            chain.len(),
            local.len()
        );
    }
    best
}
