//! CLI command implementations

use anyhow::{Context, Result};
use dialoguer::Confirm;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::signature::Signer;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::activity::ActivityLog;
use crate::candidate::{short_mint, CandidateToken};
use crate::config::Config;
use crate::feed::CandidateFeed;
use crate::filter::TokenFilter;
use crate::orchestrator::{
    Approval, ApprovalGate, Eligibility, GateSettings, LiveOrchestrator, OrchestratorSettings,
    TradeState, TradeStateStore,
};
use crate::position::{
    ExitAction, ExitMonitor, ExitSettings, JsonPositionStore, PositionStore, QuotePriceSource,
};
use crate::pump::{BondingCurveSource, RpcBondingCurveSource};
use crate::risk::{RiskAssessor, RugCheckClient};
use crate::tradability::{build_pipeline, TradabilityPipeline, Verdict};
use crate::trading::signer::load_keypair;
use crate::trading::{
    build_venues, KeypairSigner, QuoteRequest, RpcSettlement, SwapVenue, TradeExecutor,
    TradingParams, USDC_MINT,
};
use crate::wallet::{HoldingsReader, RpcHoldings, RpcWallet, WalletProvider};

fn rpc_client(config: &Config) -> Arc<RpcClient> {
    Arc::new(RpcClient::new_with_timeout(
        config.rpc.endpoint.clone(),
        Duration::from_millis(config.rpc.timeout_ms),
    ))
}

fn pending_window(config: &Config) -> Duration {
    Duration::from_secs(config.orchestrator.pending_retry_secs)
}

/// Read-only services: no keypair needed
struct Market {
    curves: Arc<dyn BondingCurveSource>,
    venues: Vec<Arc<dyn SwapVenue>>,
}

impl Market {
    fn connect(config: &Config, rpc: Arc<RpcClient>) -> Self {
        let curves: Arc<dyn BondingCurveSource> = Arc::new(RpcBondingCurveSource::new(rpc));
        let venues = build_venues(config, curves.clone());
        Self { curves, venues }
    }

    fn pipeline(&self, config: &Config, activity: ActivityLog) -> TradabilityPipeline {
        build_pipeline(config, self.curves.clone(), self.venues.clone(), activity)
    }
}

fn risk_assessor(config: &Config, activity: ActivityLog) -> RiskAssessor {
    let source = Arc::new(RugCheckClient::new(
        &config.endpoints.rugcheck_url,
        Duration::from_millis(config.risk.timeout_ms),
    ));
    RiskAssessor::new(source, &config.risk, activity)
}

/// Everything needed to move funds
struct Trading {
    market: Market,
    wallet: Arc<dyn WalletProvider>,
    holdings: Arc<dyn HoldingsReader>,
    executor: Arc<TradeExecutor>,
    positions: Arc<dyn PositionStore>,
    trade_states: Arc<TradeStateStore>,
    params: TradingParams,
}

impl Trading {
    async fn connect(config: &Config, activity: ActivityLog) -> Result<Self> {
        let rpc = rpc_client(config);
        let market = Market::connect(config, rpc.clone());

        let keypair = Arc::new(
            load_keypair(&config.wallet.keypair_path)
                .with_context(|| format!("Cannot load keypair {}", config.wallet.keypair_path))?,
        );
        let owner = keypair.pubkey();
        info!("Trading wallet: {}", owner);

        let signer = Arc::new(KeypairSigner::new(keypair, rpc.clone()));
        let executor = Arc::new(TradeExecutor::new(
            market.venues.clone(),
            signer,
            Arc::new(RpcSettlement::new(rpc.clone())),
            activity,
        ));

        let positions: Arc<dyn PositionStore> =
            Arc::new(JsonPositionStore::open(config.persistence.positions_path()).await?);
        let trade_states = Arc::new(
            TradeStateStore::open(config.persistence.trade_state_path(), pending_window(config))
                .await?,
        );

        Ok(Self {
            market,
            wallet: Arc::new(RpcWallet::new(rpc.clone(), owner)),
            holdings: Arc::new(RpcHoldings::new(rpc, owner)),
            executor,
            positions,
            trade_states,
            params: TradingParams::from_settings(&config.trading, &config.risk, &config.exit_monitor),
        })
    }

    fn exit_monitor(&self, config: &Config, activity: ActivityLog) -> ExitMonitor {
        let settings = ExitSettings::from_config(&config.exit_monitor);
        let prices = Arc::new(QuotePriceSource::new(
            self.market.venues.clone(),
            self.params.exit_slippage_bps(),
            Duration::from_millis(config.tradability.backend_timeout_ms),
        ));
        let holdings = settings.verify_holdings.then(|| self.holdings.clone());
        ExitMonitor::new(
            self.positions.clone(),
            prices,
            holdings,
            self.executor.clone(),
            self.trade_states.clone(),
            self.params.clone(),
            settings,
            activity,
        )
    }

    fn orchestrator(&self, config: &Config, activity: ActivityLog) -> LiveOrchestrator {
        LiveOrchestrator::new(
            self.executor.clone(),
            self.market.venues.clone(),
            self.wallet.clone(),
            self.positions.clone(),
            self.trade_states.clone(),
            self.params.clone(),
            GateSettings::from_config(config),
            OrchestratorSettings::from_config(config),
            activity,
        )
    }
}

/// Run discovery → approval → orchestrator, with the exit monitor alongside,
/// until Ctrl-C
pub async fn start(config: &Config, feed_path: &Path, poll: Duration) -> Result<()> {
    info!("Starting launch trader...");
    info!(
        "Buy amount: {} SOL, Slippage: {}%, TP {}%, SL {}%",
        config.trading.buy_amount_sol,
        config.trading.slippage_pct,
        config.exit_monitor.take_profit_pct,
        config.exit_monitor.stop_loss_pct
    );

    let activity = ActivityLog::tracing();
    let trading = Trading::connect(config, activity.clone()).await?;

    let gate = ApprovalGate::new(
        TokenFilter::new(&config.filters)?,
        Arc::new(trading.market.pipeline(config, activity.clone())),
        Arc::new(risk_assessor(config, activity.clone())),
        activity.clone(),
    );
    let orchestrator = Arc::new(trading.orchestrator(config, activity.clone()));

    let cancel = CancellationToken::new();
    let mut tasks = Vec::new();
    tasks.push(tokio::spawn(orchestrator.clone().run(cancel.clone())));

    if config.exit_monitor.enabled {
        let monitor = Arc::new(trading.exit_monitor(config, activity.clone()));
        tasks.push(tokio::spawn(monitor.run(cancel.clone())));
    } else {
        warn!("Exit monitor disabled - positions will not be closed automatically");
    }

    info!("Watching discovery feed {}", feed_path.display());
    tasks.push(tokio::spawn(poll_feed(
        CandidateFeed::new(feed_path),
        gate,
        orchestrator,
        trading.trade_states.clone(),
        poll,
        cancel.clone(),
    )));

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");
    cancel.cancel();
    for task in futures::future::join_all(tasks).await {
        if let Err(e) = task {
            error!("Task ended abnormally: {}", e);
        }
    }
    info!("Stopped");
    Ok(())
}

async fn poll_feed(
    mut feed: CandidateFeed,
    gate: ApprovalGate,
    orchestrator: Arc<LiveOrchestrator>,
    trade_states: Arc<TradeStateStore>,
    every: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        let candidates = match feed.poll().await {
            Ok(c) => c,
            Err(e) => {
                warn!("Could not read feed: {}", e);
                continue;
            }
        };

        let mut approved = Vec::new();
        for candidate in candidates {
            if cancel.is_cancelled() {
                break;
            }
            let mint = candidate.address.clone();
            match trade_states.eligibility(&mint).await {
                Eligibility::Eligible => {}
                Eligibility::RetryLater { .. } => continue,
                Eligibility::Blocked(_) => {
                    feed.settle(&mint);
                    continue;
                }
            }

            match gate.review(candidate).await {
                Approval::Approved(token) => approved.push(*token),
                // Pool not ready yet, look again next poll
                Approval::Rejected { waiting: true, .. } => {}
                Approval::Rejected { .. } => feed.settle(&mint),
            }
        }

        if !approved.is_empty() {
            orchestrator.queue_tokens(approved).await;
        }
    }
    info!("Feed poller stopped");
}

/// Run the tradability pipeline once and print the verdict
pub async fn check(config: &Config, mint: &str, source: Option<String>) -> Result<()> {
    let market = Market::connect(config, rpc_client(config));
    let pipeline = market.pipeline(config, ActivityLog::disabled());

    let mut candidate = CandidateToken::new(mint, "");
    if let Some(source) = source {
        candidate.source = source;
    }
    let started = Instant::now();
    let verdict = pipeline.check(&candidate).await;

    println!("\n=== TRADABILITY: {} ===\n", short_mint(mint));
    match &verdict {
        Verdict::Tradable {
            stage,
            verification,
            pool_address,
            liquidity_sol,
            pair,
            reason,
        } => {
            println!("Verdict:      TRADABLE");
            println!("Stage:        {}", stage);
            println!("Verification: {:?}", verification);
            if let Some(pool) = pool_address {
                println!("Pool:         {}", pool);
            }
            if let Some(liquidity) = liquidity_sol {
                println!("Liquidity:    {:.2} SOL", liquidity);
            }
            if let Some(pair) = pair {
                println!("Indexed pair: {:?}", pair);
            }
            println!("Reason:       {}", reason);
        }
        Verdict::Discarded { waiting, reason } => {
            println!("Verdict:      {}", if *waiting { "WAITING" } else { "DISCARDED" });
            println!("Reason:       {}", reason);
        }
    }
    println!("Took:         {}ms", started.elapsed().as_millis());
    Ok(())
}

/// Fetch and score the safety report for a mint
pub async fn risk(config: &Config, mint: &str) -> Result<()> {
    let assessment = risk_assessor(config, ActivityLog::disabled()).assess(mint).await;

    println!("\n=== RISK: {} ===\n", short_mint(mint));
    println!("Result:          {}", if assessment.passed { "PASS" } else { "FAIL" });
    println!("Score:           {}", assessment.overall_score);
    println!("Verified:        {}", assessment.verified);
    println!("Rug pull:        {}", assessment.is_rug_pull);
    println!("Honeypot:        {}", assessment.is_honeypot);
    println!("Mint authority:  {}", assessment.has_mint_authority);
    println!("Freeze authority:{}", assessment.has_freeze_authority);
    if let Some(holders) = assessment.holder_count {
        println!("Holders:         {}", holders);
    }
    if let Some(pct) = assessment.top_holder_percent {
        println!("Top holder:      {:.1}%", pct);
    }
    for reason in &assessment.reasons {
        println!("  - {}", reason);
    }
    Ok(())
}

/// Show current positions and P&L
pub async fn status(config: &Config) -> Result<()> {
    let store = JsonPositionStore::open(config.persistence.positions_path()).await?;
    let positions = store.fetch_positions().await?;
    let stats = store.daily_stats().await?;
    let open: Vec<_> = positions.iter().filter(|p| p.is_open()).collect();

    let total_value: f64 = open.iter().map(|p| p.current_value_sol).sum();
    let total_pnl: f64 = open.iter().map(|p| p.pnl_sol).sum();
    let total_cost: f64 = open.iter().map(|p| p.entry_value_sol).sum();
    let total_pct = if total_cost > 0.0 { total_pnl / total_cost * 100.0 } else { 0.0 };

    println!("\n=== LAUNCH TRADER STATUS ===\n");
    println!("Open positions: {}", open.len());
    println!("Total Value: {:.4} SOL", total_value);
    println!("Total P&L: {:.4} SOL ({:.2}%)", total_pnl, total_pct);
    println!("\nDaily Stats ({}):", stats.date);
    println!("  Trades: {}", stats.total_trades);
    println!("  Wins: {}", stats.winning_trades);
    println!("  Losses: {}", stats.losing_trades);
    println!("  Net P&L: {:.4} SOL", stats.net_pnl_sol);
    println!(
        "  Daily Loss Used: {:.4} / {} SOL",
        stats.total_loss_sol, config.safety.daily_loss_limit_sol
    );

    println!("\n=== OPEN POSITIONS ===\n");
    if open.is_empty() {
        println!("No open positions.");
    }
    for p in &open {
        println!(
            "{:<10} {:<10} entry {:.10} now {:.10} P&L {:+.2}% ({:+.4} SOL) TP {}% SL {}%",
            p.symbol,
            short_mint(&p.mint),
            p.entry_price,
            p.current_price,
            p.pnl_pct,
            p.pnl_sol,
            p.take_profit_pct,
            p.stop_loss_pct
        );
    }

    let closed: Vec<_> = positions.iter().filter(|p| !p.is_open()).collect();
    if !closed.is_empty() {
        println!("\n=== CLOSED ({}) ===\n", closed.len());
        for p in closed.iter().rev().take(10) {
            println!(
                "{:<10} {:<10} {:<24} P&L {:+.2}% ({:+.4} SOL)",
                p.symbol,
                short_mint(&p.mint),
                p.exit_reason.map(|r| r.to_string()).unwrap_or_default(),
                p.pnl_pct,
                p.pnl_sol
            );
        }
    }
    Ok(())
}

/// List durable per-mint trade states
pub async fn states(config: &Config) -> Result<()> {
    let store =
        TradeStateStore::open(config.persistence.trade_state_path(), pending_window(config)).await?;
    let all = store.all().await;

    println!("\n=== TRADE STATES ({}) ===\n", all.len());
    for (mint, state) in all {
        let detail = match &state {
            TradeState::Untraded => String::new(),
            TradeState::Pending { reason, since } => format!("{} since {}", reason, since),
            TradeState::Traded { tx_hash, at, .. } => format!("{} at {}", tx_hash, at),
            TradeState::Rejected { reason, at } => format!("{} at {}", reason, at),
        };
        println!("{:<46} {:<9} {}", mint, state.name(), detail);
    }
    Ok(())
}

/// Close an open position at market
pub async fn sell(config: &Config, mint: &str, force: bool) -> Result<()> {
    info!("Sell command: token={}", mint);
    solana_sdk::pubkey::Pubkey::try_from(mint)
        .map_err(|e| anyhow::anyhow!("Invalid token address: {}", e))?;

    let activity = ActivityLog::tracing();
    let trading = Trading::connect(config, activity.clone()).await?;
    let position = trading
        .positions
        .open_positions()
        .await?
        .into_iter()
        .find(|p| p.mint == mint)
        .ok_or_else(|| anyhow::anyhow!("No open position for {}", mint))?;

    if config.safety.require_sell_confirmation && !force {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Sell all {} ({:.4} SOL in, P&L {:+.2}%)? This cannot be undone.",
                position.symbol, position.entry_value_sol, position.pnl_pct
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            info!("Sell cancelled by user");
            return Ok(());
        }
    }

    let monitor = trading.exit_monitor(config, activity);
    match monitor.close_manual(mint).await? {
        ExitAction::Sold { signature, .. } => {
            println!("\nSell transaction confirmed!");
            println!("Signature: {}", signature);
            println!("View on Solscan: https://solscan.io/tx/{}", signature);
        }
        ExitAction::SellFailed { error, .. } => {
            anyhow::bail!("Sell transaction failed: {}", error);
        }
        other => println!("Position not sold: {:?}", other),
    }
    Ok(())
}

pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}

/// Check RPC, wallet and venue reachability
pub async fn health(config: &Config) -> Result<()> {
    println!("\n=== SYSTEM HEALTH CHECK ===\n");

    let mut all_healthy = true;
    let rpc = rpc_client(config);

    print!("RPC Endpoint... ");
    let started = Instant::now();
    match rpc.get_slot().await {
        Ok(slot) => println!("OK ({}ms, slot {})", started.elapsed().as_millis(), slot),
        Err(e) => {
            println!("FAILED: {}", e);
            all_healthy = false;
        }
    }

    print!("Keypair... ");
    match load_keypair(&config.wallet.keypair_path) {
        Ok(keypair) => {
            let wallet = RpcWallet::new(rpc.clone(), keypair.pubkey());
            match wallet.snapshot().await {
                Ok(s) if s.is_connected => {
                    println!("OK ({} on {}, {:.4} SOL)", s.address, s.network, s.balance_sol)
                }
                Ok(s) => {
                    println!("DISCONNECTED ({})", s.address);
                    all_healthy = false;
                }
                Err(e) => {
                    println!("FAILED: {}", e);
                    all_healthy = false;
                }
            }
        }
        Err(e) => {
            println!("FAILED: {}", e);
            all_healthy = false;
        }
    }

    let market = Market::connect(config, rpc);
    let probe = QuoteRequest::buy(USDC_MINT, 10_000_000, 100);
    for venue in &market.venues {
        print!("Venue {}... ", venue.id());
        let started = Instant::now();
        match venue.quote(&probe).await {
            Ok(_) => println!("OK ({}ms)", started.elapsed().as_millis()),
            Err(e) => {
                println!("FAILED: {}", e.short_reason());
                all_healthy = false;
            }
        }
    }

    println!();
    if all_healthy {
        println!("All systems healthy!");
    } else {
        println!("Some systems are unhealthy. Check the errors above.");
    }

    Ok(())
}
