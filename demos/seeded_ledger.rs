//! Seeded ledger walkthrough
//!
//! Boots the two demo accounts, opens a third, and drives a few requests
//! through the gateway. Run with `RUST_LOG=debug` to see settlement events.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use bank_ledger::gateway::{CreateAccountRequest, CreateTransferRequest, Gateway};
use bank_ledger::{telemetry, Ledger, LedgerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let config = match std::env::args().nth(1) {
        Some(path) => LedgerConfig::load(Path::new(&path))?,
        None => LedgerConfig::demo(),
    };

    // Without its seed accounts the ledger cannot serve anything
    let ledger = Ledger::in_memory(&config)
        .await
        .context("failed to bootstrap ledger")?;
    let gateway = Gateway::new(Arc::new(ledger));

    println!("🏦 Bank Ledger - Seeded Example\n");

    let accounts = gateway.list_accounts().await?;
    println!("GET /accounts\n{}\n", serde_json::to_string_pretty(&accounts)?);

    let carla = gateway
        .create_account(CreateAccountRequest {
            name: "Carla Mendes".to_string(),
            tax_id: 12312312312,
            secret: "carla-secret".to_string(),
            balance: 0,
        })
        .await?;
    println!("POST /accounts\n{}\n", serde_json::to_string_pretty(&carla)?);

    let Some(origin) = accounts.first() else {
        anyhow::bail!("no seed accounts configured");
    };

    for amount in [2_500, 10_000_000] {
        let response = gateway
            .create_transfer(CreateTransferRequest {
                origin_account_id: origin.id.clone(),
                destination_account_id: carla.id.clone(),
                amount,
                idempotency_key: None,
            })
            .await?;
        println!("POST /transfers\n{}\n", serde_json::to_string_pretty(&response)?);
    }

    let balance = gateway.get_balance(&carla.id).await?;
    println!(
        "GET /accounts/{}/balance\n{}\n",
        carla.id,
        serde_json::to_string_pretty(&balance)?
    );

    let report = gateway.ledger().verify_integrity().await?;
    println!("✓ Integrity: {:?}", report);

    Ok(())
}
