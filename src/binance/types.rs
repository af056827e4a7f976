//! Binance account-history response types
//!
//! Field sets follow the three history endpoints: deposits
//! (`/sapi/v1/capital/deposit/hisrec`), fiat orders (`/sapi/v1/fiat/orders`)
//! and convert trades (`/sapi/v1/convert/tradeFlow`). Monetary amounts
//! arrive as decimal strings and are parsed to `f64` on deserialization.

use serde::{Deserialize, Deserializer};

/// Accept either a JSON number or a decimal string for an amount field.
/// Binance documents strings but has been seen returning bare numbers on
/// some fiat fields.
pub(crate) fn de_f64_str<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(f64),
        Str(String),
    }

    match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Num(n) => Ok(n),
        NumOrStr::Str(s) => s.trim().parse::<f64>().map_err(|e| {
            serde::de::Error::custom(format!("invalid decimal string {:?}: {}", s, e))
        }),
    }
}

/// One on-chain deposit, immutable once recorded by the exchange.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deposit {
    pub id: String,
    #[serde(deserialize_with = "de_f64_str")]
    pub amount: f64,
    pub coin: String,
    pub network: String,
    pub status: i64,
    pub address: String,
    #[serde(default)]
    pub address_tag: String,
    pub tx_id: String,
    /// Epoch milliseconds
    pub insert_time: i64,
    pub transfer_type: i64,
    #[serde(default)]
    pub confirm_times: String,
    #[serde(default)]
    pub unlock_confirm: i64,
    #[serde(default)]
    pub wallet_type: i64,
}

/// One fiat withdrawal order from the shared fiat orders endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiatWithdrawal {
    pub order_no: String,
    pub fiat_currency: String,
    #[serde(deserialize_with = "de_f64_str")]
    pub indicated_amount: f64,
    #[serde(deserialize_with = "de_f64_str")]
    pub amount: f64,
    #[serde(deserialize_with = "de_f64_str")]
    pub total_fee: f64,
    pub method: String,
    pub status: String,
    /// Epoch milliseconds
    pub create_time: i64,
    /// Epoch milliseconds; absent on some historical orders
    #[serde(default)]
    pub update_time: Option<i64>,
}

/// Envelope returned by `/sapi/v1/fiat/orders`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiatOrderPage {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Vec<FiatWithdrawal>,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub success: bool,
}

/// One completed (or attempted) convert trade
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertTrade {
    pub quote_id: String,
    pub order_id: i64,
    pub order_status: String,
    pub from_asset: String,
    #[serde(deserialize_with = "de_f64_str")]
    pub from_amount: f64,
    pub to_asset: String,
    #[serde(deserialize_with = "de_f64_str")]
    pub to_amount: f64,
    #[serde(deserialize_with = "de_f64_str")]
    pub ratio: f64,
    #[serde(deserialize_with = "de_f64_str")]
    pub inverse_ratio: f64,
    /// Epoch milliseconds
    pub create_time: i64,
    #[serde(default)]
    pub order_type: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
}

/// Envelope returned by `/sapi/v1/convert/tradeFlow`. When `more_flag` is
/// set the window holds more trades than the page limit and the caller
/// must advance its start past the newest `create_time` received.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertTradePage {
    #[serde(default)]
    pub list: Vec<ConvertTrade>,
    #[serde(default)]
    pub more_flag: bool,
}
