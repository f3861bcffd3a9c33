//! Position exit monitor
//!
//! Every poll interval, for each open position:
//! 1. optionally confirm the wallet still holds the token
//! 2. refresh the price, keeping the last known one on failure
//! 3. compare P&L against the position's take-profit / stop-loss
//! 4. sell through the executor when triggered
//!
//! A sell that keeps failing on a token that has lost nearly everything is
//! written off as a dead token instead of retrying forever.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::price_feed::PriceSource;
use super::store::{pnl_pct, ExitReason, Position, PositionClose, PositionStore};
use crate::activity::{ActivityCategory, ActivityEntry, ActivityLevel, ActivityLog};
use crate::config::ExitMonitorConfig;
use crate::error::{Error, Result};
use crate::orchestrator::trade_state::TradeStateStore;
use crate::trading::{ExitOutcome, TradeExecutor, TradingParams};
use crate::wallet::HoldingsReader;

#[derive(Debug, Clone, PartialEq)]
pub struct ExitSettings {
    pub poll_interval: Duration,
    /// Loss percent at or beyond which an unsellable token is written off
    pub dead_token_loss_pct: f64,
    /// Failed sells tolerated before a written-off close
    pub max_sell_attempts: u32,
    pub verify_holdings: bool,
}

impl ExitSettings {
    pub fn from_config(config: &ExitMonitorConfig) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.poll_interval_secs.max(1)),
            dead_token_loss_pct: config.dead_token_loss_pct,
            max_sell_attempts: config.max_sell_attempts.max(1),
            verify_holdings: config.verify_holdings,
        }
    }
}

/// What the P&L rules say to do
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExitDecision {
    Hold,
    Sell(ExitReason),
}

pub fn decide(position: &Position) -> ExitDecision {
    let pnl = pnl_pct(position.entry_price, position.current_price);
    if pnl >= position.take_profit_pct {
        ExitDecision::Sell(ExitReason::TakeProfit)
    } else if pnl <= -position.stop_loss_pct {
        ExitDecision::Sell(ExitReason::StopLoss)
    } else {
        ExitDecision::Hold
    }
}

/// Result of checking one position
#[derive(Debug, Clone, PartialEq)]
pub enum ExitAction {
    Held { pnl_pct: f64, price_stale: bool },
    ClosedExternally,
    Sold { reason: ExitReason, signature: String },
    SellFailed { reason: ExitReason, error: String, failures: u32 },
    ForceClosed { pnl_pct: f64 },
}

pub struct ExitMonitor {
    store: Arc<dyn PositionStore>,
    prices: Arc<dyn PriceSource>,
    holdings: Option<Arc<dyn HoldingsReader>>,
    executor: Arc<TradeExecutor>,
    trade_states: Arc<TradeStateStore>,
    params: TradingParams,
    settings: ExitSettings,
    /// Failed sells per position id
    sell_failures: DashMap<String, u32>,
    activity: ActivityLog,
}

impl ExitMonitor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn PositionStore>,
        prices: Arc<dyn PriceSource>,
        holdings: Option<Arc<dyn HoldingsReader>>,
        executor: Arc<TradeExecutor>,
        trade_states: Arc<TradeStateStore>,
        params: TradingParams,
        settings: ExitSettings,
        activity: ActivityLog,
    ) -> Self {
        Self {
            store,
            prices,
            holdings,
            executor,
            trade_states,
            params,
            settings,
            sell_failures: DashMap::new(),
            activity,
        }
    }

    /// Poll until cancelled
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(
            interval_secs = self.settings.poll_interval.as_secs(),
            "Exit monitor started"
        );
        let mut interval = tokio::time::interval(self.settings.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        warn!("Exit monitor tick failed: {}", e);
                    }
                }
            }
        }
        info!("Exit monitor stopped");
    }

    /// Check every open position once
    pub async fn tick(&self) -> Result<Vec<(String, ExitAction)>> {
        let open = self.store.open_positions().await?;
        let mut actions = Vec::with_capacity(open.len());

        for position in open {
            let id = position.id.clone();
            match self.check_position(position).await {
                Ok(action) => actions.push((id, action)),
                Err(e) => warn!(position = %id, "Position check failed: {}", e),
            }
        }
        Ok(actions)
    }

    pub async fn check_position(&self, position: Position) -> Result<ExitAction> {
        let _guard = self.trade_states.lock_mint(&position.mint).await;

        let mut sell_amount = position.entry_amount;
        if self.settings.verify_holdings {
            if let Some(holdings) = &self.holdings {
                match holdings.token_balance(&position.mint).await {
                    Ok(0) => return self.close_external(&position).await,
                    Ok(balance) => sell_amount = balance.min(position.entry_amount),
                    Err(e) => debug!(mint = %position.mint, "Holdings check skipped: {}", e),
                }
            }
        }

        let (position, price_stale) = match self.prices.price(&position).await {
            Ok(price) => (self.store.update_price(&position.id, price).await?, false),
            Err(e) => {
                debug!(mint = %position.mint, "Price unavailable, keeping last: {}", e);
                (position, true)
            }
        };

        match decide(&position) {
            ExitDecision::Hold => Ok(ExitAction::Held {
                pnl_pct: position.pnl_pct,
                price_stale,
            }),
            ExitDecision::Sell(reason) => self.sell(&position, reason, sell_amount).await,
        }
    }

    /// Sell the whole holding of an open position by mint, exit reason `manual`
    pub async fn close_manual(&self, mint: &str) -> Result<ExitAction> {
        let position = self
            .store
            .open_positions()
            .await?
            .into_iter()
            .find(|p| p.mint == mint)
            .ok_or_else(|| Error::PositionNotFound(mint.to_string()))?;

        let _guard = self.trade_states.lock_mint(mint).await;
        self.sell(&position, ExitReason::Manual, position.entry_amount).await
    }

    async fn sell(&self, position: &Position, reason: ExitReason, amount: u64) -> Result<ExitAction> {
        info!(
            mint = %position.mint,
            reason = %reason,
            pnl_pct = position.pnl_pct,
            "Exit triggered"
        );

        let outcome = self
            .executor
            .exit_position(&position.mint, amount, position.token_decimals, &self.params)
            .await;
        let no_route = outcome.is_no_route();

        match outcome {
            ExitOutcome::Sold(fill) => {
                self.sell_failures.remove(&position.id);
                let closed = self
                    .store
                    .close_position(
                        &position.id,
                        PositionClose {
                            reason,
                            exit_price: fill.exit_price,
                            exit_tx: Some(fill.signature.clone()),
                            sol_received: Some(fill.sol_received),
                        },
                    )
                    .await?;
                self.publish(
                    ActivityLevel::Success,
                    &closed,
                    format!(
                        "Sold ({}) for {:.4} SOL, P&L {:.1}%",
                        reason, fill.sol_received, closed.pnl_pct
                    ),
                );
                Ok(ExitAction::Sold {
                    reason,
                    signature: fill.signature,
                })
            }
            ExitOutcome::Failed { error, .. } => {
                let failures = {
                    let mut entry = self.sell_failures.entry(position.id.clone()).or_insert(0);
                    *entry += 1;
                    *entry
                };
                let catastrophic = position.pnl_pct <= -self.settings.dead_token_loss_pct;

                if catastrophic && (no_route || failures >= self.settings.max_sell_attempts) {
                    return self.force_close(position).await;
                }

                self.publish(
                    ActivityLevel::Warning,
                    position,
                    format!("Sell ({}) failed, retrying next tick: {}", reason, error.short_reason()),
                );
                Ok(ExitAction::SellFailed {
                    reason,
                    error: error.short_reason(),
                    failures,
                })
            }
        }
    }

    async fn close_external(&self, position: &Position) -> Result<ExitAction> {
        let closed = self
            .store
            .close_position(
                &position.id,
                PositionClose {
                    reason: ExitReason::SoldExternally,
                    exit_price: position.current_price,
                    exit_tx: None,
                    sol_received: None,
                },
            )
            .await?;
        self.publish(
            ActivityLevel::Info,
            &closed,
            "Token no longer held, closed as sold externally".to_string(),
        );
        Ok(ExitAction::ClosedExternally)
    }

    async fn force_close(&self, position: &Position) -> Result<ExitAction> {
        self.sell_failures.remove(&position.id);
        let closed = self
            .store
            .close_position(
                &position.id,
                PositionClose::without_tx(ExitReason::ForceClosedDeadToken, position.current_price, 0.0),
            )
            .await?;
        self.publish(
            ActivityLevel::Error,
            &closed,
            format!("Unsellable at {:.1}%, force-closed as dead token", position.pnl_pct),
        );
        Ok(ExitAction::ForceClosed {
            pnl_pct: position.pnl_pct,
        })
    }

    fn publish(&self, level: ActivityLevel, position: &Position, message: String) {
        self.activity.publish(
            ActivityEntry::new(level, ActivityCategory::Exit, message)
                .token(position.symbol.clone(), position.mint.clone())
                .details(serde_json::json!({
                    "positionId": position.id,
                    "entryPrice": position.entry_price,
                    "currentPrice": position.current_price,
                    "pnlPct": position.pnl_pct,
                })),
        );
    }
}
