//! Run configuration
//!
//! The only operator-facing knob is the first month to fetch; credentials
//! come from the environment (see `binance::auth::Credentials`) and the
//! database path is fixed by convention so downstream SQL consumers always
//! know where to look.

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};

/// Conventional database path, relative to the working directory
pub const DB_PATH: &str = "binance_history.db";

/// The fetch interval for one run: `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SyncInterval {
    /// Build the interval from the optional `--from-date` argument.
    ///
    /// `from_date` is a `YYYY-MM` month; absent, it defaults to January of
    /// the current year. The interval always ends at `now`.
    pub fn from_cli(from_date: Option<&str>, now: DateTime<Utc>) -> Result<Self> {
        let month = match from_date {
            Some(s) => s.trim().to_string(),
            None => format!("{}-01", now.year()),
        };

        Ok(Self {
            start: parse_month(&month)?,
            end: now,
        })
    }
}

/// Parse a `YYYY-MM` month into the UTC midnight starting that month
pub fn parse_month(s: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d")
        .with_context(|| format!("invalid from-date {:?}, expected YYYY-MM", s))?;
    Ok(DateTime::from_naive_utc_and_offset(
        date.and_time(NaiveTime::MIN),
        Utc,
    ))
}
