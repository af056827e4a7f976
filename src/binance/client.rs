//! Binance SAPI client for account-history endpoints
//!
//! All three history endpoints are SIGNED: the query string carries a
//! `timestamp` and `recvWindow` and is signed with HMAC-SHA256, with the
//! API key sent in the `X-MBX-APIKEY` header.
//!
//! # Example
//! ```no_run
//! use binance_ledger::binance::{AccountHistoryApi, BinanceClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = BinanceClient::from_env()?;
//!     let deposits = client
//!         .deposit_history(1672531200000, 1675209600000, 0)
//!         .await?;
//!     println!("Fetched {} deposits", deposits.len());
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::auth::Credentials;
use super::error::{classify_response, ApiError};
use super::types::{ConvertTradePage, Deposit, FiatOrderPage};
use crate::common::ServerClock;

/// Base URL for the Binance REST API
pub const API_BASE_URL: &str = "https://api.binance.com";

/// Maximum deposits per request (endpoint limit)
pub const DEPOSIT_PAGE_LIMIT: u32 = 1000;

/// Maximum fiat order rows per page (endpoint limit)
pub const FIAT_PAGE_ROWS: u32 = 500;

/// Maximum convert trades per request (endpoint limit)
pub const CONVERT_PAGE_LIMIT: u32 = 1000;

/// Signature validity window sent with every signed request (ms)
const RECV_WINDOW_MS: u64 = 5_000;

/// Read-only account-history surface of the exchange API.
///
/// The endpoint drivers are generic over this trait so the pipeline can be
/// exercised against a scripted fake; `BinanceClient` is the live
/// implementation.
#[async_trait]
pub trait AccountHistoryApi: ServerClock {
    /// Deposits with `insert_time` inside `[start_ms, end_ms]`, paged by
    /// `offset` in steps of [`DEPOSIT_PAGE_LIMIT`].
    async fn deposit_history(
        &self,
        start_ms: i64,
        end_ms: i64,
        offset: u32,
    ) -> Result<Vec<Deposit>, ApiError>;

    /// Fiat withdrawal orders with `create_time` inside `[start_ms, end_ms]`,
    /// in numbered pages of [`FIAT_PAGE_ROWS`] rows (pages start at 1).
    async fn fiat_withdraw_history(
        &self,
        start_ms: i64,
        end_ms: i64,
        page: u32,
    ) -> Result<FiatOrderPage, ApiError>;

    /// Convert trades with `create_time` inside `[start_ms, end_ms]`. The
    /// returned page's `more_flag` signals that the window holds more than
    /// [`CONVERT_PAGE_LIMIT`] trades.
    async fn convert_trade_history(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<ConvertTradePage, ApiError>;
}

/// Binance API client
#[derive(Debug, Clone)]
pub struct BinanceClient {
    credentials: Credentials,
    http: Client,
}

impl BinanceClient {
    /// Create a new client with API credentials
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self::with_credentials(Credentials::new(api_key, api_secret))
    }

    /// Create a new client from an existing credentials container
    pub fn with_credentials(credentials: Credentials) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        BinanceClient { credentials, http }
    }

    /// Create a client from environment variables
    ///
    /// Expects `BINANCE_API_KEY` and `BINANCE_API_SECRET`. Missing
    /// credentials are an authentication failure, not a config error: the
    /// run cannot do anything useful without them.
    pub fn from_env() -> Result<Self, ApiError> {
        let credentials = Credentials::from_env().map_err(|_| {
            ApiError::Auth("BINANCE_API_KEY / BINANCE_API_SECRET not set in environment".into())
        })?;
        Ok(Self::with_credentials(credentials))
    }

    /// Execute a SIGNED GET request and deserialize the response body
    async fn signed_get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let mut query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(&format!(
            "timestamp={}&recvWindow={}",
            Utc::now().timestamp_millis(),
            RECV_WINDOW_MS
        ));

        let signature = self.credentials.sign(&query);
        let url = format!("{}{}?{}&signature={}", API_BASE_URL, path, query, signature);

        debug!("GET {}{}", API_BASE_URL, path);

        let response = self
            .http
            .get(&url)
            .header("X-MBX-APIKEY", self.credentials.api_key())
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(classify_response(status, &text));
        }

        serde_json::from_str(&text).map_err(|e| ApiError::Parse(format!("{}: {}", path, e)))
    }
}

#[async_trait]
impl ServerClock for BinanceClient {
    /// Get the server's current time from the unsigned `/api/v3/time`
    /// endpoint. Queried fresh on every rate-limit failure; never cached.
    async fn server_time(&self) -> Result<DateTime<Utc>, ApiError> {
        #[derive(serde::Deserialize)]
        struct TimeResponse {
            #[serde(rename = "serverTime")]
            server_time: i64,
        }

        let url = format!("{}/api/v3/time", API_BASE_URL);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(classify_response(status, &text));
        }

        let time: TimeResponse = serde_json::from_str(&text)
            .map_err(|e| ApiError::Parse(format!("/api/v3/time: {}", e)))?;
        DateTime::from_timestamp_millis(time.server_time)
            .ok_or_else(|| ApiError::Parse(format!("invalid server time {}", time.server_time)))
    }
}

#[async_trait]
impl AccountHistoryApi for BinanceClient {
    async fn deposit_history(
        &self,
        start_ms: i64,
        end_ms: i64,
        offset: u32,
    ) -> Result<Vec<Deposit>, ApiError> {
        self.signed_get(
            "/sapi/v1/capital/deposit/hisrec",
            &[
                ("startTime", start_ms.to_string()),
                ("endTime", end_ms.to_string()),
                ("offset", offset.to_string()),
                ("limit", DEPOSIT_PAGE_LIMIT.to_string()),
            ],
        )
        .await
    }

    async fn fiat_withdraw_history(
        &self,
        start_ms: i64,
        end_ms: i64,
        page: u32,
    ) -> Result<FiatOrderPage, ApiError> {
        // transactionType 1 = withdraw on the shared fiat orders endpoint
        self.signed_get(
            "/sapi/v1/fiat/orders",
            &[
                ("transactionType", "1".to_string()),
                ("beginTime", start_ms.to_string()),
                ("endTime", end_ms.to_string()),
                ("page", page.to_string()),
                ("rows", FIAT_PAGE_ROWS.to_string()),
            ],
        )
        .await
    }

    async fn convert_trade_history(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<ConvertTradePage, ApiError> {
        self.signed_get(
            "/sapi/v1/convert/tradeFlow",
            &[
                ("startTime", start_ms.to_string()),
                ("endTime", end_ms.to_string()),
                ("limit", CONVERT_PAGE_LIMIT.to_string()),
            ],
        )
        .await
    }
}
