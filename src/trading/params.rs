//! Per-trade parameter snapshot
//!
//! Built once per trade attempt from the user settings and never mutated
//! while the trade is in flight.

use std::time::Duration;

use crate::config::{ExitMonitorConfig, PriorityLevel, RiskConfig, TradingConfig};
use crate::risk::RiskFilters;

const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TradingParams {
    pub buy_amount_sol: f64,
    /// Fraction, 0.15 for 15%
    pub slippage: f64,
    /// Fraction used for exits
    pub exit_slippage: f64,
    pub priority: PriorityLevel,
    pub priority_fee_lamports: u64,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub take_profit_pct: f64,
    pub stop_loss_pct: f64,
    pub risk: RiskFilters,
}

impl TradingParams {
    pub fn from_settings(
        trading: &TradingConfig,
        risk: &RiskConfig,
        exit: &ExitMonitorConfig,
    ) -> Self {
        Self {
            buy_amount_sol: trading.buy_amount_sol,
            slippage: trading.slippage_pct / 100.0,
            exit_slippage: trading.exit_slippage_pct / 100.0,
            priority: trading.priority,
            priority_fee_lamports: trading.priority.fee_lamports(),
            max_retries: trading.max_retries.max(1),
            retry_delay: Duration::from_millis(trading.retry_delay_ms),
            take_profit_pct: exit.take_profit_pct,
            stop_loss_pct: exit.stop_loss_pct,
            risk: RiskFilters::from_config(risk),
        }
    }

    pub fn buy_lamports(&self) -> u64 {
        sol_to_lamports(self.buy_amount_sol)
    }

    pub fn slippage_bps(&self) -> u16 {
        fraction_to_bps(self.slippage)
    }

    pub fn exit_slippage_bps(&self) -> u16 {
        fraction_to_bps(self.exit_slippage)
    }
}

pub fn sol_to_lamports(sol: f64) -> u64 {
    (sol * LAMPORTS_PER_SOL).round().max(0.0) as u64
}

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL
}

fn fraction_to_bps(fraction: f64) -> u16 {
    (fraction * 10_000.0).round().clamp(1.0, 10_000.0) as u16
}
