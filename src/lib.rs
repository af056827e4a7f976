//! Binance Account-History Ledger
//!
//! Retrieves a user's historical deposits, fiat withdrawals, and convert
//! trades from the Binance REST API and persists them incrementally into a
//! local SQLite database. Storage writes are idempotent upserts keyed by
//! each record's natural unique id, so repeated runs over the same or
//! overlapping time ranges extend the stored history rather than
//! duplicating it.
//!
//! The interesting part is the fetch loop: the history endpoints cap the
//! span of one query, so requested intervals are split into calendar-month
//! windows, and a rate-limited request is retried after sleeping until the
//! *server's* clock rolls over to the next minute (the documented
//! `Retry-After` header is unreliable on these endpoints, while the
//! request-weight window empirically resets on server minute boundaries).
//!
//! # Example
//! ```no_run
//! use binance_ledger::{store::HistoryStore, sync, BinanceClient};
//! use chrono::{TimeZone, Utc};
//!
//! fn main() -> anyhow::Result<()> {
//!     let rt = tokio::runtime::Runtime::new()?;
//!     let client = BinanceClient::from_env()?;
//!     let mut store = HistoryStore::open("binance_history.db")?;
//!
//!     let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
//!     let written = rt.block_on(sync::sync_deposits(&client, &mut store, start, Utc::now()))?;
//!     println!("wrote {} deposits", written);
//!     Ok(())
//! }
//! ```

pub mod binance;
pub mod common;
pub mod config;
pub mod store;
pub mod sync;

pub use binance::{AccountHistoryApi, ApiError, BinanceClient};
pub use store::HistoryStore;
pub use sync::SyncTotals;
