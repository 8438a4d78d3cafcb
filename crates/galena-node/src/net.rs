//! Peer-facing plumbing: mining completion, block broadcast, chain fetch
//! and the ledger event loop.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use galena_core::constants::SYNC_TIMEOUT_SECS;
use galena_core::{miner, sync, Block, LedgerEvent};

use crate::api::{AppState, PushBlock};

/// Drive the nonce search off the request path. Completion feeds back into
/// the ledger, and from there out to the peers through the event loop.
pub fn spawn_mining(state: AppState, candidate: Block, difficulty: usize) {
    let rx = miner::spawn(candidate, difficulty);
    tokio::spawn(async move {
        let Ok(mined) = rx.await else {
            warn!("miner dropped without a result");
            return;
        };
        let outcome = {
            let mut ledger = state.ledger.lock().await;
            ledger.accept_mined(mined)
        };
        if let Err(violation) = outcome {
            debug!("mined block discarded: {violation}");
        }
    });
}

/// Ledger event loop: broadcast freshly mined blocks, reconcile on demand.
/// Broadcasts run on their own task so an unresponsive peer never holds up
/// the next event; reconciliations stay serialized on the loop because
/// they mutate the ledger.
pub async fn run_events(state: AppState, mut events: UnboundedReceiver<LedgerEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            LedgerEvent::NewBlock(block) => {
                let state = state.clone();
                tokio::spawn(async move {
                    broadcast_block(&state, block, None).await;
                });
            }
            LedgerEvent::SyncRequested => sync_chain(&state).await,
        }
    }
}

/// POST a block to every peer, skipping `skip` (the node it came from).
/// All pushes go out concurrently, so the whole round is bounded by the
/// slowest peer rather than the sum. Push failures are logged and
/// forgotten; reconciliation covers whatever a dead peer missed.
pub async fn broadcast_block(state: &AppState, block: Block, skip: Option<&str>) {
    let push = PushBlock {
        origin: state.public_url.clone(),
        block,
    };
    let mut pushes = JoinSet::new();
    for peer in state.peers.iter() {
        if Some(peer.as_str()) == skip {
            continue;
        }
        let client = state.client.clone();
        let push = push.clone();
        let peer = peer.clone();
        pushes.spawn(async move {
            let outcome = client
                .post(format!("{peer}/block"))
                .timeout(Duration::from_secs(SYNC_TIMEOUT_SECS))
                .json(&push)
                .send()
                .await;
            match outcome {
                Ok(_) => debug!("pushed block {} to {peer}", push.block.index),
                Err(err) => warn!("failed to push block to {peer}: {err}"),
            }
        });
    }
    while pushes.join_next().await.is_some() {}
}

/// Fan a chain request out to every configured peer and adopt the longest
/// valid answer. Runs at startup and whenever the ledger asks for it.
pub async fn sync_chain(state: &AppState) {
    if state.peers.is_empty() {
        return;
    }
    let snapshot = {
        let ledger = state.ledger.lock().await;
        ledger.chain().clone()
    };
    let client = state.client.clone();
    let fetch = move |peer: String| {
        let client = client.clone();
        async move { fetch_chain(client, peer).await }
    };
    let adopted = sync::reconcile(
        &snapshot,
        &state.peers,
        Duration::from_secs(SYNC_TIMEOUT_SECS),
        fetch,
    )
    .await;
    if let Some(chain) = adopted {
        let mut ledger = state.ledger.lock().await;
        ledger.adopt(chain);
    }
}

async fn fetch_chain(client: reqwest::Client, peer: String) -> Option<Vec<Block>> {
    let response = match client.get(format!("{peer}/chain")).send().await {
        Ok(response) => response,
        Err(err) => {
            debug!("no chain from {peer}: {err}");
            return None;
        }
    };
    match response.json::<Vec<Block>>().await {
        Ok(blocks) => Some(blocks),
        Err(err) => {
            debug!("bad chain payload from {peer}: {err}");
            None
        }
    }
}
