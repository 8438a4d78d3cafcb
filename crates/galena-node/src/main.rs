//! galena-node: HTTP transport around the galena ledger core.
//!
//! One ledger behind one mutex; request handlers, the miner completion
//! task and the event loop all funnel through it.

mod api;
mod net;

use std::net::SocketAddr;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use galena_core::{constants, crypto, Ledger, LedgerConfig};

use crate::api::AppState;

#[derive(Parser, Debug)]
#[command(name = "galena-node")]
#[command(about = "Proof-of-work ledger node")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:3000")]
    listen: String,

    /// Base URL peers reach this node at; defaults to http://<listen>
    #[arg(long)]
    public_url: Option<String>,

    /// Peer base URL, repeatable
    #[arg(long = "peer")]
    peers: Vec<String>,

    /// Address credited by block rewards; generated fresh when omitted
    #[arg(long)]
    address: Option<String>,

    /// Leading zero hex characters required of every block hash
    #[arg(long, default_value_t = constants::DIFFICULTY)]
    difficulty: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let address = match args.address {
        Some(address) => address,
        None => {
            let keypair = crypto::generate_keypair();
            info!("generated ephemeral reward address {}", keypair.address);
            keypair.address
        }
    };

    let mut config = LedgerConfig::new(address);
    config.difficulty = args.difficulty;

    let public_url = args
        .public_url
        .unwrap_or_else(|| format!("http://{}", args.listen));

    let (ledger, events) = Ledger::new(config);
    let state = AppState::new(ledger, args.peers, public_url);

    // catch up with peers before taking requests
    net::sync_chain(&state).await;

    tokio::spawn(net::run_events(state.clone(), events));

    let addr: SocketAddr = args.listen.parse()?;
    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("galena-node listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {err}");
    }
    info!("shutting down");
}
