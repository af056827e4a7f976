//! Binance account-history API client
//!
//! SIGNED access to the three read-only history endpoints this tool
//! consumes (deposits, fiat withdrawal orders, convert trades) plus the
//! unsigned server-time endpoint the rate-limit retry loop depends on.
//!
//! # Environment Variables
//!
//! ```no_run
//! use binance_ledger::binance::BinanceClient;
//!
//! // Expects BINANCE_API_KEY and BINANCE_API_SECRET
//! let client = BinanceClient::from_env().expect("Missing credentials");
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod types;

pub use auth::Credentials;
pub use client::{
    AccountHistoryApi, BinanceClient, API_BASE_URL, CONVERT_PAGE_LIMIT, DEPOSIT_PAGE_LIMIT,
    FIAT_PAGE_ROWS,
};
pub use error::ApiError;
pub use types::{ConvertTrade, ConvertTradePage, Deposit, FiatOrderPage, FiatWithdrawal};
