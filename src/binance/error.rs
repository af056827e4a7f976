//! Binance API error taxonomy
//!
//! Rate-limit failures are the only recoverable class; the retry loop in
//! `common::retry` consumes them. Everything else propagates to the caller.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Binance error code for "too many requests"
const CODE_TOO_MANY_REQUESTS: i64 = -1003;

/// Binance error codes for credential/signature problems
const AUTH_CODES: [i64; 4] = [-1002, -1022, -2014, -2015];

#[derive(Error, Debug)]
pub enum ApiError {
    /// Request was rejected by the exchange's rate limiter. Recoverable:
    /// handled inside the fetch loop by waiting for the server minute
    /// rollover, never surfaced to callers.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Bad or missing API credentials. Fatal for the whole run.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Transport-level failure (connection error, timeout).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Any other API rejection, carrying the exchange's error code.
    #[error("exchange error {code}: {message}")]
    Exchange { code: i64, message: String },

    /// Response body did not match the expected schema.
    #[error("invalid API response: {0}")]
    Parse(String),
}

impl ApiError {
    /// Whether this failure should be retried after a rate-limit wait
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ApiError::RateLimited(_))
    }

    /// Whether this failure means the credentials are unusable
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth(_))
    }
}

/// Error body shape returned by Binance on non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: i64,
    #[serde(default)]
    msg: String,
}

/// Classify a non-success HTTP response into the error taxonomy.
///
/// Binance signals rate limiting with HTTP 429 (and 418 once a client has
/// been auto-banned for ignoring 429s) or error code -1003; credential
/// problems come back as 401/403 or one of the -1002/-1022/-2014/-2015
/// codes. Anything else is a plain exchange rejection.
pub(crate) fn classify_response(status: StatusCode, body: &str) -> ApiError {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
    let code = parsed.as_ref().map(|b| b.code);
    let message = match &parsed {
        Some(b) if !b.msg.is_empty() => b.msg.clone(),
        _ => body.chars().take(200).collect(),
    };

    if status == StatusCode::TOO_MANY_REQUESTS
        || status.as_u16() == 418
        || code == Some(CODE_TOO_MANY_REQUESTS)
    {
        ApiError::RateLimited(format!("{}: {}", status, message))
    } else if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || code.is_some_and(|c| AUTH_CODES.contains(&c))
    {
        ApiError::Auth(format!("{}: {}", status, message))
    } else {
        ApiError::Exchange {
            code: code.unwrap_or_else(|| i64::from(status.as_u16())),
            message,
        }
    }
}
