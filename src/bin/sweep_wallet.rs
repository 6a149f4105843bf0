//! Sweep wallet: move the SOL balance of your own keypair to the configured destination.
//!
//! Reads the same environment as the server, plus the owner's key:
//!   SWEEP_OWNER_KEY     Base58 secret key of the wallet being swept
//!   SWEEP_DESTINATION   Address that receives the funds
//!
//! The transaction is planned, signed locally with the owner's key and
//! broadcast with endpoint failover. The receipt is printed as JSON.
//!
//! Usage:
//!   cargo run --bin sweep_wallet

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use dotenvy::dotenv;
use secrecy::SecretString;
use tracing_subscriber::EnvFilter;

use solana_sweep_service::app::{SweepConfig, SweepFlow};
use solana_sweep_service::domain::LAMPORTS_PER_SOL;
use solana_sweep_service::infra::KeypairSigner;

fn print_separator(title: &str) {
    println!("{}", "=".repeat(70));
    println!("  {}", title);
    println!("{}", "=".repeat(70));
}

fn load_owner_key() -> Result<SecretString> {
    let key = env::var("SWEEP_OWNER_KEY").context("SWEEP_OWNER_KEY environment variable is not set")?;
    if key.trim().is_empty() {
        bail!("SWEEP_OWNER_KEY environment variable is empty");
    }
    Ok(SecretString::from(key))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let config = SweepConfig::from_env().context("Failed to load configuration")?;
    let signer = KeypairSigner::from_base58(&load_owner_key()?)
        .context("Failed to parse SWEEP_OWNER_KEY as Base58")?;

    print_separator("SWEEP WALLET");
    println!("  Owner:       {}", signer.pubkey());
    println!("  Destination: {}", config.destination);

    let connector = config.connector();
    let price_oracle = Arc::new(config.price_oracle()?);
    let planner = Arc::new(config.planner(Arc::clone(&connector), price_oracle));
    let broadcaster = Arc::new(config.broadcaster(connector));
    let flow = SweepFlow::new(planner, broadcaster);

    let receipt = flow.execute(&signer).await?;

    print_separator("CONFIRMED");
    println!(
        "  Swept:       {:.9} SOL (~${:.2})",
        receipt.plan.transfer_amount_lamports as f64 / LAMPORTS_PER_SOL as f64,
        receipt.plan.transfer_value_usd()
    );
    println!("  Signature:   {}", receipt.result.signature);
    println!("  Endpoint:    {}", receipt.result.endpoint);
    println!();
    println!("{}", serde_json::to_string_pretty(&receipt)?);

    Ok(())
}
