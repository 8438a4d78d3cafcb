//! galena-cli: operator tooling for a running galena node.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use galena_core::crypto::{self, Keypair};
use galena_core::{Block, Transaction};

#[derive(Parser, Debug)]
#[command(name = "galena-cli")]
#[command(about = "CLI client for a galena ledger node")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a keypair and write it under a directory
    Keygen {
        /// Directory receiving secret.key and address.pub
        #[arg(long, default_value = "./keys")]
        out: PathBuf,
    },
    /// Sign a transfer and submit it to a node
    Send {
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        node: String,
        /// Directory holding secret.key and address.pub
        #[arg(long, default_value = "./keys")]
        keys: PathBuf,
        /// Receiver address (hex-encoded public key)
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: i64,
    },
    /// Query an address balance
    Balance {
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        node: String,
        /// Address to query; defaults to the one under --keys
        #[arg(long)]
        address: Option<String>,
        #[arg(long, default_value = "./keys")]
        keys: PathBuf,
    },
    /// Print a summary of the node's chain
    Chain {
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        node: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Keygen { out } => keygen(&out),
        Command::Send {
            node,
            keys,
            to,
            amount,
        } => send(&node, &keys, &to, amount).await,
        Command::Balance {
            node,
            address,
            keys,
        } => balance(&node, address, &keys).await,
        Command::Chain { node } => chain(&node).await,
    }
}

fn keygen(out: &Path) -> Result<()> {
    fs::create_dir_all(out)?;
    let keypair = crypto::generate_keypair();
    fs::write(out.join("secret.key"), &keypair.secret_hex)?;
    fs::write(out.join("address.pub"), &keypair.address)?;
    println!("address: {}", keypair.address);
    println!("keys written to {}", out.display());
    Ok(())
}

fn load_keypair(dir: &Path) -> Result<Keypair> {
    let secret_hex = fs::read_to_string(dir.join("secret.key"))
        .with_context(|| format!("no secret key under {}", dir.display()))?;
    let address = fs::read_to_string(dir.join("address.pub"))
        .with_context(|| format!("no address file under {}", dir.display()))?;
    Ok(Keypair {
        secret_hex: secret_hex.trim().to_string(),
        address: address.trim().to_string(),
    })
}

async fn send(node: &str, keys: &Path, to: &str, amount: i64) -> Result<()> {
    let keypair = load_keypair(keys)?;
    let message = crypto::transfer_message(&keypair.address, to, amount);
    let signature = crypto::sign_transfer(&keypair.secret_hex, &message)?;
    let tx = Transaction {
        sender: Some(keypair.address),
        receiver: to.to_string(),
        amount,
        signature: Some(signature),
    };
    let client = reqwest::Client::new();
    let res = client
        .post(format!("{node}/transaction"))
        .json(&tx)
        .send()
        .await?;
    println!("status: {}", res.status());
    println!("{}", res.text().await?);
    Ok(())
}

async fn balance(node: &str, address: Option<String>, keys: &Path) -> Result<()> {
    let address = match address {
        Some(address) => address,
        None => load_keypair(keys)?.address,
    };
    let client = reqwest::Client::new();
    let body: serde_json::Value = client
        .get(format!("{node}/balance/{address}"))
        .send()
        .await?
        .json()
        .await?;
    println!("{body}");
    Ok(())
}

async fn chain(node: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let blocks: Vec<Block> = client
        .get(format!("{node}/chain"))
        .send()
        .await?
        .json()
        .await?;
    println!("height: {}", blocks.len());
    for block in &blocks {
        println!(
            "#{} {} ({} transactions, nonce {})",
            block.index,
            block.hash,
            block.data.len(),
            block.nonce
        );
    }
    Ok(())
}
