//! Prerequisite gate checked before any queue processing

use tracing::debug;

use crate::config::Config;
use crate::position::PositionStore;
use crate::wallet::WalletProvider;

#[derive(Debug, Clone, PartialEq)]
pub struct GateSettings {
    pub expected_network: String,
    pub fee_buffer_sol: f64,
    pub max_open_positions: usize,
    pub daily_loss_limit_sol: f64,
}

impl GateSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            expected_network: config.orchestrator.expected_network.clone(),
            fee_buffer_sol: config.orchestrator.fee_buffer_sol,
            max_open_positions: config.orchestrator.max_open_positions,
            daily_loss_limit_sol: config.safety.daily_loss_limit_sol,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateStatus {
    Ready { balance_sol: f64 },
    /// The wallet is the blocker: prompt instead of erroring
    ConnectWallet,
    WrongNetwork { expected: String, actual: String },
    InsufficientBalance { available: f64, required: f64 },
    MaxPositions { open: usize, max: usize },
    DailyLossLimit { lost: f64, limit: f64 },
}

impl GateStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, GateStatus::Ready { .. })
    }

    /// Corrective action for the user
    pub fn prompt(&self) -> String {
        match self {
            GateStatus::Ready { balance_sol } => format!("ready ({:.4} SOL)", balance_sol),
            GateStatus::ConnectWallet => "connect a wallet to start trading".to_string(),
            GateStatus::WrongNetwork { expected, actual } => {
                format!("switch wallet to {} (currently {})", expected, actual)
            }
            GateStatus::InsufficientBalance { available, required } => format!(
                "top up wallet: {:.4} SOL available, {:.4} SOL required",
                available, required
            ),
            GateStatus::MaxPositions { open, max } => {
                format!("{} of {} positions open, waiting for exits", open, max)
            }
            GateStatus::DailyLossLimit { lost, limit } => format!(
                "daily loss limit reached: lost {:.4} SOL of {:.4} SOL",
                lost, limit
            ),
        }
    }
}

/// Wallet connected, right network, enough SOL for the trade plus fees,
/// room for another position and inside the daily loss limit
pub async fn check_prerequisites(
    wallet: &dyn WalletProvider,
    positions: &dyn PositionStore,
    buy_amount_sol: f64,
    settings: &GateSettings,
) -> GateStatus {
    let snapshot = match wallet.snapshot().await {
        Ok(s) if s.is_connected => s,
        Ok(_) => return GateStatus::ConnectWallet,
        Err(e) => {
            debug!("Wallet snapshot failed: {}", e);
            return GateStatus::ConnectWallet;
        }
    };

    if normalize_network(&snapshot.network) != normalize_network(&settings.expected_network) {
        return GateStatus::WrongNetwork {
            expected: settings.expected_network.clone(),
            actual: snapshot.network,
        };
    }

    let required = buy_amount_sol + settings.fee_buffer_sol;
    if snapshot.balance_sol < required {
        return GateStatus::InsufficientBalance {
            available: snapshot.balance_sol,
            required,
        };
    }

    if settings.max_open_positions > 0 {
        match positions.open_positions().await {
            Ok(open) if open.len() >= settings.max_open_positions => {
                return GateStatus::MaxPositions {
                    open: open.len(),
                    max: settings.max_open_positions,
                }
            }
            Ok(_) => {}
            Err(e) => debug!("Position count unavailable: {}", e),
        }
    }

    if settings.daily_loss_limit_sol > 0.0 {
        if let Ok(stats) = positions.daily_stats().await {
            if stats.total_loss_sol >= settings.daily_loss_limit_sol {
                return GateStatus::DailyLossLimit {
                    lost: stats.total_loss_sol,
                    limit: settings.daily_loss_limit_sol,
                };
            }
        }
    }

    GateStatus::Ready {
        balance_sol: snapshot.balance_sol,
    }
}

fn normalize_network(network: &str) -> String {
    let lower = network.trim().to_ascii_lowercase();
    match lower.as_str() {
        "mainnet" | "mainnet-beta" => "mainnet-beta".to_string(),
        _ => lower,
    }
}
