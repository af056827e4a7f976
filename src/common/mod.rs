//! Common machinery shared by the sync pipeline
//!
//! - Month-stepped time windows for bounded history queries
//! - Rate-limit-aware fetch loop keyed to the server's minute rollover

pub mod retry;
pub mod windows;

pub use retry::{until_next_minute, with_rate_limit_retry, ServerClock};
pub use windows::{month_windows, MonthWindows};
