//! Authentication utilities for the Binance API
//!
//! Implements HMAC-SHA256 query-string signing as per the official
//! Binance API documentation (SIGNED endpoint security).

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Generate an HMAC-SHA256 signature for a SIGNED request.
///
/// The signature is computed over the full query string (everything after
/// the `?`, excluding the `signature` parameter itself) using the API
/// secret as the key.
///
/// # Example
///
/// ```
/// use binance_ledger::binance::auth::sign_query;
///
/// let secret = "your-api-secret";
/// let query = "startTime=1672531200000&endTime=1675209600000&timestamp=1675209600000";
/// let signature = sign_query(query, secret);
/// ```
pub fn sign_query(query: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(query.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// API credentials container
#[derive(Debug, Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl Credentials {
    /// Create new credentials from API key and secret
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Create credentials from environment variables
    ///
    /// Looks for `BINANCE_API_KEY` and `BINANCE_API_SECRET`
    pub fn from_env() -> Result<Self, std::env::VarError> {
        let api_key = std::env::var("BINANCE_API_KEY")?;
        let api_secret = std::env::var("BINANCE_API_SECRET")?;
        Ok(Self::new(api_key, api_secret))
    }

    /// Get the API key
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Get the API secret
    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }

    /// Sign a request query string
    pub fn sign(&self, query: &str) -> String {
        sign_query(query, &self.api_secret)
    }
}
