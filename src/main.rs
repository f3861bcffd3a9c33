//! Launch trader - tradability checks and position management for new Solana tokens
//!
//! # WARNING
//! - This bot trades with real money. Only use funds you can afford to lose.
//! - Most newly launched tokens go to zero (rug pulls, abandonment).
//! - A passing risk report is not a guarantee.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use launch_trader::cli::commands;
use launch_trader::config::Config;

/// Launch trader - tradability pipeline and position lifecycle manager
#[derive(Parser)]
#[command(name = "launch-trader")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the trading loop against a discovery feed
    Start {
        /// JSON file holding an array of candidate tokens
        #[arg(long, env = "LAUNCH_TRADER_FEED")]
        feed: PathBuf,

        /// Seconds between feed polls
        #[arg(long, default_value = "5")]
        poll_secs: u64,
    },

    /// Run the tradability pipeline for one mint
    Check {
        /// Token mint address
        mint: String,

        /// Discovery source label, for the trust list
        #[arg(long)]
        source: Option<String>,
    },

    /// Show the risk assessment for one mint
    Risk {
        /// Token mint address
        mint: String,
    },

    /// Show current positions and P&L
    Status,

    /// Show per-mint trade states
    States,

    /// Manually sell an open position
    Sell {
        /// Token mint address
        mint: String,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration (secrets masked)
    Config,

    /// Check system health (RPC, wallet, swap venues)
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    if matches!(cli.command, Commands::Start { .. } | Commands::Sell { .. }) {
        if let Err(e) = startup_checks(&config) {
            error!("Startup checks failed: {:#}", e);
            std::process::exit(1);
        }
    }

    let result = match cli.command {
        Commands::Start { feed, poll_secs } => {
            commands::start(&config, &feed, Duration::from_secs(poll_secs.max(1))).await
        }
        Commands::Check { mint, source } => commands::check(&config, &mint, source).await,
        Commands::Risk { mint } => commands::risk(&config, &mint).await,
        Commands::Status => commands::status(&config).await,
        Commands::States => commands::states(&config).await,
        Commands::Sell { mint, force } => commands::sell(&config, &mint, force).await,
        Commands::Config => commands::show_config(&config),
        Commands::Health => commands::health(&config).await,
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("launch_trader=info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .init();
    }
}

/// Perform startup safety checks before anything can move funds
fn startup_checks(config: &Config) -> Result<()> {
    info!("Performing startup checks...");
    let keypair_path = &config.wallet.keypair_path;

    let metadata = std::fs::metadata(keypair_path)
        .map_err(|e| anyhow::anyhow!("Cannot read keypair file {}: {}", keypair_path, e))?;

    // Check keypair permissions (Unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = metadata.permissions().mode();

        // Readable by group or others (not 600)
        if mode & 0o077 != 0 {
            return Err(anyhow::anyhow!(
                "Keypair file {} has insecure permissions {:o}. \
                 Run 'chmod 600 {}' to fix. \
                 Refusing to run with world-readable keypairs.",
                keypair_path,
                mode & 0o777,
                keypair_path
            ));
        }
        info!("Keypair permissions OK");
    }
    #[cfg(not(unix))]
    let _ = metadata;

    warn!(
        "Safety limits active: buy={}SOL, max_open_positions={}, daily_loss_limit={}SOL",
        config.trading.buy_amount_sol,
        config.orchestrator.max_open_positions,
        config.safety.daily_loss_limit_sol
    );

    info!("Startup checks passed");
    Ok(())
}
