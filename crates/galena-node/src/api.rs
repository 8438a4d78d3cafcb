//! HTTP surface of the node.
//!
//! Transaction submission is fire-and-forget: the caller gets a 200 once
//! the required fields are present, and anything the pool later drops is
//! only visible in the logs.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::debug;

use galena_core::{Block, Ledger, Transaction};

use crate::net;

/// Shared handle every handler and background task clones.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Mutex<Ledger>>,
    pub peers: Arc<Vec<String>>,
    pub public_url: String,
    pub client: reqwest::Client,
}

impl AppState {
    pub fn new(ledger: Ledger, peers: Vec<String>, public_url: String) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(ledger)),
            peers: Arc::new(peers),
            public_url,
            client: reqwest::Client::new(),
        }
    }
}

/// A block push between peers. `origin` is the advertised URL of the node
/// that mined or relayed the block, so receivers can skip it when relaying
/// onward.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PushBlock {
    pub origin: String,
    pub block: Block,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/transaction", post(submit_transaction))
        .route("/balance/{address}", get(get_balance))
        .route("/chain", get(get_chain))
        .route("/block", post(receive_block))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn submit_transaction(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    // sender and signature are optional in the data model (reward rows),
    // but a submitter has to provide a sender; receiver and amount are
    // required by deserialization
    let tx = serde_json::from_value::<Transaction>(body)
        .ok()
        .filter(|tx| tx.sender.is_some());
    let Some(tx) = tx else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "missing required fields" })),
        );
    };
    let (candidate, difficulty) = {
        let mut ledger = state.ledger.lock().await;
        let difficulty = ledger.config().difficulty;
        (ledger.submit(vec![tx]), difficulty)
    };
    if let Some(candidate) = candidate {
        net::spawn_mining(state.clone(), candidate, difficulty);
    }
    (StatusCode::OK, Json(json!({ "message": "successful" })))
}

async fn get_balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Json<Value> {
    let ledger = state.ledger.lock().await;
    let balance = ledger.balance_of(&address);
    Json(json!({ "address": address, "balance": balance }))
}

async fn get_chain(State(state): State<AppState>) -> Json<Vec<Block>> {
    let ledger = state.ledger.lock().await;
    Json(ledger.snapshot())
}

/// Peer push. A block that appends cleanly is relayed to every peer except
/// its origin; one that knocks the chain out of sync raises the resync
/// signal inside the ledger. Either way the pusher gets a 200.
async fn receive_block(
    State(state): State<AppState>,
    Json(push): Json<PushBlock>,
) -> StatusCode {
    debug!("block {} pushed from {}", push.block.index, push.origin);
    let outcome = {
        let mut ledger = state.ledger.lock().await;
        ledger.accept_remote(push.block.clone())
    };
    if outcome.is_ok() {
        tokio::spawn(async move {
            net::broadcast_block(&state, push.block, Some(&push.origin)).await;
        });
    }
    StatusCode::OK
}
