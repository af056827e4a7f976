//! Endpoint drivers: windowed fetch with streaming persistence
//!
//! Each driver splits the requested interval into month windows, fetches
//! every window through the rate-limit retry loop, pages until the window
//! is exhausted, and upserts each batch before issuing the next request —
//! so partial progress always survives a later failure, and a rerun with
//! the same interval simply resumes.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::binance::{AccountHistoryApi, DEPOSIT_PAGE_LIMIT, FIAT_PAGE_ROWS};
use crate::common::{month_windows, with_rate_limit_retry};
use crate::store::HistoryStore;

/// Window step for the deposit endpoint (the API caps a query at 90 days)
pub const DEPOSIT_WINDOW_MONTHS: u32 = 1;

/// Window step for the fiat orders endpoint
pub const FIAT_WINDOW_MONTHS: u32 = 1;

/// Window step for the convert endpoint (the API caps a query at 30 days,
/// so a single calendar month is the largest safe step)
pub const CONVERT_WINDOW_MONTHS: u32 = 1;

/// Records written per endpoint during one run
#[derive(Debug, Default, Clone, Copy)]
pub struct SyncTotals {
    pub deposits: usize,
    pub fiat_withdrawals: usize,
    pub convert_trades: usize,
}

/// Fetch and persist all deposits in `[start, end]`.
///
/// Returns the number of records written.
pub async fn sync_deposits<A: AccountHistoryApi>(
    api: &A,
    store: &mut HistoryStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<usize> {
    let mut written = 0;

    for (window_start, window_end) in month_windows(start, end, DEPOSIT_WINDOW_MONTHS) {
        let start_ms = window_start.timestamp_millis();
        let end_ms = window_end.timestamp_millis();
        let mut offset = 0u32;

        loop {
            let batch = with_rate_limit_retry(api, || {
                api.deposit_history(start_ms, end_ms, offset)
            })
            .await
            .with_context(|| {
                format!("deposit history failed for window {} .. {}", window_start, window_end)
            })?;

            let full_page = batch.len() as u32 == DEPOSIT_PAGE_LIMIT;
            if !batch.is_empty() {
                written += store.upsert_deposits(&batch)?;
            }
            if !full_page {
                break;
            }
            offset += DEPOSIT_PAGE_LIMIT;
        }

        debug!("deposits window {} .. {} done", window_start, window_end);
    }

    Ok(written)
}

/// Fetch and persist all fiat withdrawal orders in `[start, end]`.
pub async fn sync_fiat_withdrawals<A: AccountHistoryApi>(
    api: &A,
    store: &mut HistoryStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<usize> {
    let mut written = 0;

    for (window_start, window_end) in month_windows(start, end, FIAT_WINDOW_MONTHS) {
        let start_ms = window_start.timestamp_millis();
        let end_ms = window_end.timestamp_millis();
        let mut page = 1u32;

        loop {
            let response = with_rate_limit_retry(api, || {
                api.fiat_withdraw_history(start_ms, end_ms, page)
            })
            .await
            .with_context(|| {
                format!(
                    "fiat withdrawal history failed for window {} .. {}",
                    window_start, window_end
                )
            })?;

            let rows = response.data.len();
            if rows > 0 {
                written += store.upsert_fiat_withdrawals(&response.data)?;
            }
            if (rows as u32) < FIAT_PAGE_ROWS {
                break;
            }
            page += 1;
        }

        debug!(
            "fiat withdrawals window {} .. {} done",
            window_start, window_end
        );
    }

    Ok(written)
}

/// Fetch and persist all convert trades in `[start, end]`.
///
/// The convert endpoint has no offset or page parameter; when a response
/// sets `more_flag` the window start is advanced past the newest
/// `create_time` received and the window is queried again.
pub async fn sync_convert_trades<A: AccountHistoryApi>(
    api: &A,
    store: &mut HistoryStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<usize> {
    let mut written = 0;

    for (window_start, window_end) in month_windows(start, end, CONVERT_WINDOW_MONTHS) {
        let end_ms = window_end.timestamp_millis();
        let mut cursor_ms = window_start.timestamp_millis();

        loop {
            let page = with_rate_limit_retry(api, || {
                api.convert_trade_history(cursor_ms, end_ms)
            })
            .await
            .with_context(|| {
                format!(
                    "convert trade history failed for window {} .. {}",
                    window_start, window_end
                )
            })?;

            if !page.list.is_empty() {
                written += store.upsert_convert_trades(&page.list)?;
            }
            if !page.more_flag {
                break;
            }

            // Advance past the newest trade received; a page that cannot
            // move the cursor would otherwise loop forever.
            match page.list.iter().map(|t| t.create_time).max() {
                Some(newest) if newest + 1 > cursor_ms => cursor_ms = newest + 1,
                _ => break,
            }
        }

        debug!(
            "convert trades window {} .. {} done",
            window_start, window_end
        );
    }

    Ok(written)
}
