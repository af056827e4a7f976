//! Sync command - fetch account history from Binance into SQLite
//!
//! Runs the three endpoint drivers in a fixed order so logs are
//! reproducible. A failed driver does not stop the others (its windows are
//! simply retried on the next run), but an authentication failure aborts
//! immediately since every endpoint would reject the same credentials.

use anyhow::{bail, Result};
use chrono::Utc;
use tracing::{error, info};

use binance_ledger::binance::{ApiError, BinanceClient};
use binance_ledger::config::{self, SyncInterval};
use binance_ledger::store::HistoryStore;
use binance_ledger::sync::{
    sync_convert_trades, sync_deposits, sync_fiat_withdrawals, SyncTotals,
};

fn is_auth_failure(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<ApiError>(), Some(e) if e.is_auth())
}

pub fn run(from_date: Option<String>) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;

    let now = Utc::now();
    let interval = SyncInterval::from_cli(from_date.as_deref(), now)?;
    let client = BinanceClient::from_env()?;
    let mut store = HistoryStore::open(config::DB_PATH)?;

    info!(
        "Syncing account history from {} to {}",
        interval.start, interval.end
    );

    println!("\n{}", "=".repeat(60));
    println!("SYNCING BINANCE ACCOUNT HISTORY");
    println!("{}", "=".repeat(60));
    println!("  From:     {}", interval.start.format("%Y-%m-%d"));
    println!("  To:       {}", interval.end.format("%Y-%m-%d %H:%M UTC"));
    println!("  Database: {}", config::DB_PATH);
    println!("{}\n", "=".repeat(60));

    let mut totals = SyncTotals::default();
    let mut failures = 0;

    print!("  Syncing deposits... ");
    match rt.block_on(sync_deposits(
        &client,
        &mut store,
        interval.start,
        interval.end,
    )) {
        Ok(written) => {
            println!("✓ {} records", written);
            totals.deposits = written;
        }
        Err(e) if is_auth_failure(&e) => return Err(e),
        Err(e) => {
            println!("✗ Error: {:#}", e);
            error!("deposit sync failed: {:#}", e);
            failures += 1;
        }
    }

    print!("  Syncing fiat withdrawals... ");
    match rt.block_on(sync_fiat_withdrawals(
        &client,
        &mut store,
        interval.start,
        interval.end,
    )) {
        Ok(written) => {
            println!("✓ {} records", written);
            totals.fiat_withdrawals = written;
        }
        Err(e) if is_auth_failure(&e) => return Err(e),
        Err(e) => {
            println!("✗ Error: {:#}", e);
            error!("fiat withdrawal sync failed: {:#}", e);
            failures += 1;
        }
    }

    print!("  Syncing convert trades... ");
    match rt.block_on(sync_convert_trades(
        &client,
        &mut store,
        interval.start,
        interval.end,
    )) {
        Ok(written) => {
            println!("✓ {} records", written);
            totals.convert_trades = written;
        }
        Err(e) if is_auth_failure(&e) => return Err(e),
        Err(e) => {
            println!("✗ Error: {:#}", e);
            error!("convert trade sync failed: {:#}", e);
            failures += 1;
        }
    }

    println!("\n{}", "=".repeat(60));
    println!("SYNC COMPLETE");
    println!("{}", "=".repeat(60));
    println!(
        "  Written this run: {} deposits, {} fiat withdrawals, {} convert trades",
        totals.deposits, totals.fiat_withdrawals, totals.convert_trades
    );
    println!("  Total deposits:         {}", store.deposit_count()?);
    println!("  Total fiat withdrawals: {}", store.fiat_withdrawal_count()?);
    println!("  Total convert trades:   {}", store.convert_trade_count()?);
    println!("{}", "=".repeat(60));

    if failures > 0 {
        bail!(
            "{} of 3 endpoints failed; rerun with the same --from-date to resume",
            failures
        );
    }

    Ok(())
}
