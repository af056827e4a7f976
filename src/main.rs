//! binance-ledger - main entry point
//!
//! Fetches deposit, fiat-withdrawal, and convert-trade history from the
//! Binance API and persists it incrementally into a local SQLite database.
//! Rerunning with the same or an overlapping `--from-date` extends the
//! stored history instead of duplicating it.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "binance-ledger")]
#[command(about = "Incrementally export Binance deposits, fiat withdrawals, and convert trades to SQLite", long_about = None)]
#[command(version)]
struct Cli {
    /// First month to fetch, as YYYY-MM (defaults to January of the current year)
    #[arg(short = 'd', long)]
    from_date: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) -> Result<()> {
    // Create logs directory
    std::fs::create_dir_all("logs")?;

    // Create log file with naming pattern: sync_{date}.log
    let log_filename = format!(
        "sync_{}.log",
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Set log level - filter out noisy external crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    // File appender
    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    // Console layer
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    // File layer - same format but without ANSI colors
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Logging initialized");
    info!("Log file: {}", log_path.display());

    Ok(())
}

fn main() -> Result<()> {
    // Load BINANCE_API_KEY / BINANCE_API_SECRET from a .env file if present
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    commands::sync::run(cli.from_date)
}
