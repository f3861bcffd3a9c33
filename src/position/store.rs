//! Position store
//!
//! Open and closed positions with P&L, persisted as a JSON file.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Open,
    Closed,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    Manual,
    SoldExternally,
    ForceClosedDeadToken,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExitReason::TakeProfit => "take_profit",
            ExitReason::StopLoss => "stop_loss",
            ExitReason::Manual => "manual",
            ExitReason::SoldExternally => "sold_externally",
            ExitReason::ForceClosedDeadToken => "force_closed_dead_token",
        };
        write!(f, "{}", s)
    }
}

/// A single position in a token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: String,
    pub mint: String,
    pub symbol: String,
    pub name: String,
    pub chain: String,
    /// SOL per whole token
    pub entry_price: f64,
    /// Base units held
    pub entry_amount: u64,
    pub token_decimals: u8,
    /// SOL spent on entry
    pub entry_value_sol: f64,
    pub entry_tx: String,
    pub current_price: f64,
    pub current_value_sol: f64,
    pub pnl_pct: f64,
    pub pnl_sol: f64,
    pub take_profit_pct: f64,
    pub stop_loss_pct: f64,
    pub status: PositionStatus,
    #[serde(default)]
    pub exit_reason: Option<ExitReason>,
    #[serde(default)]
    pub exit_price: Option<f64>,
    #[serde(default)]
    pub exit_tx: Option<String>,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Position {
    /// Whole tokens held
    pub fn token_units(&self) -> f64 {
        self.entry_amount as f64 / 10f64.powi(self.token_decimals as i32)
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Apply a new market price and recompute P&L
    pub fn reprice(&mut self, price: f64) {
        self.current_price = price;
        self.current_value_sol = self.token_units() * price;
        self.pnl_pct = pnl_pct(self.entry_price, price);
        self.pnl_sol = self.current_value_sol - self.entry_value_sol;
        self.updated_at = Utc::now();
    }
}

/// Profit/loss percent of `current` relative to `entry`
pub fn pnl_pct(entry: f64, current: f64) -> f64 {
    if entry <= 0.0 {
        return 0.0;
    }
    (current - entry) / entry * 100.0
}

/// Everything needed to open a position after a buy fills
#[derive(Debug, Clone, PartialEq)]
pub struct NewPosition {
    pub mint: String,
    pub symbol: String,
    pub name: String,
    pub chain: String,
    pub entry_price: f64,
    pub entry_amount: u64,
    pub token_decimals: u8,
    pub entry_value_sol: f64,
    pub entry_tx: String,
    pub take_profit_pct: f64,
    pub stop_loss_pct: f64,
}

/// How a position is being closed
#[derive(Debug, Clone, PartialEq)]
pub struct PositionClose {
    pub reason: ExitReason,
    pub exit_price: f64,
    pub exit_tx: Option<String>,
    /// Realised proceeds; `None` values the exit at `exit_price`
    pub sol_received: Option<f64>,
}

impl PositionClose {
    /// Closure with no transaction, e.g. sold elsewhere or written off
    pub fn without_tx(reason: ExitReason, exit_price: f64, sol_received: f64) -> Self {
        Self {
            reason,
            exit_price,
            exit_tx: None,
            sol_received: Some(sol_received),
        }
    }
}

/// Daily trading statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub date: String,
    pub total_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    pub total_profit_sol: f64,
    pub total_loss_sol: f64,
    pub net_pnl_sol: f64,
}

impl DailyStats {
    pub fn new() -> Self {
        Self {
            date: today(),
            ..Default::default()
        }
    }

    pub fn record_trade(&mut self, pnl_sol: f64) {
        self.total_trades += 1;
        if pnl_sol >= 0.0 {
            self.winning_trades += 1;
            self.total_profit_sol += pnl_sol;
        } else {
            self.losing_trades += 1;
            self.total_loss_sol += pnl_sol.abs();
        }
        self.net_pnl_sol = self.total_profit_sol - self.total_loss_sol;
    }

    pub fn win_rate(&self) -> f64 {
        if self.total_trades == 0 {
            return 0.0;
        }
        (self.winning_trades as f64 / self.total_trades as f64) * 100.0
    }

    /// Start over when the UTC day has changed
    fn roll_over(&mut self) {
        let today = today();
        if self.date != today {
            *self = DailyStats {
                date: today,
                ..Default::default()
            };
        }
    }
}

fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

#[async_trait]
pub trait PositionStore: Send + Sync {
    async fn create_position(&self, new: NewPosition) -> Result<Position>;

    async fn fetch_positions(&self) -> Result<Vec<Position>>;

    async fn update_price(&self, id: &str, price: f64) -> Result<Position>;

    /// Close exactly once; closing a closed position is an error
    async fn close_position(&self, id: &str, close: PositionClose) -> Result<Position>;

    async fn daily_stats(&self) -> Result<DailyStats>;

    async fn open_positions(&self) -> Result<Vec<Position>> {
        Ok(self
            .fetch_positions()
            .await?
            .into_iter()
            .filter(Position::is_open)
            .collect())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreFile {
    positions: Vec<Position>,
    #[serde(default)]
    daily_stats: Option<DailyStats>,
}

/// JSON-file position store
pub struct JsonPositionStore {
    positions: Arc<RwLock<HashMap<String, Position>>>,
    daily_stats: Arc<RwLock<DailyStats>>,
    path: Option<PathBuf>,
}

impl JsonPositionStore {
    /// Store that never touches disk
    pub fn in_memory() -> Self {
        Self {
            positions: Arc::new(RwLock::new(HashMap::new())),
            daily_stats: Arc::new(RwLock::new(DailyStats::new())),
            path: None,
        }
    }

    /// Open the store at `path`, loading it if it exists
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let store = Self {
            path: Some(path.clone()),
            ..Self::in_memory()
        };

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            let data = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::PositionPersistence(e.to_string()))?;
            let file: StoreFile =
                serde_json::from_str(&data).map_err(|e| Error::PositionPersistence(e.to_string()))?;

            let mut positions = store.positions.write().await;
            for position in file.positions {
                positions.insert(position.id.clone(), position);
            }
            if let Some(mut stats) = file.daily_stats {
                stats.roll_over();
                *store.daily_stats.write().await = stats;
            }
            info!("Loaded {} positions from {}", positions.len(), path.display());
        }

        Ok(store)
    }

    async fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let file = {
            let positions = self.positions.read().await;
            let mut list: Vec<Position> = positions.values().cloned().collect();
            list.sort_by(|a, b| a.opened_at.cmp(&b.opened_at));
            StoreFile {
                positions: list,
                daily_stats: Some(self.daily_stats.read().await.clone()),
            }
        };
        let data =
            serde_json::to_string_pretty(&file).map_err(|e| Error::PositionPersistence(e.to_string()))?;

        write_atomic(path, data)
            .await
            .map_err(|e| Error::PositionPersistence(e.to_string()))?;
        debug!("Saved {} positions to {}", file.positions.len(), path.display());
        Ok(())
    }
}

#[async_trait]
impl PositionStore for JsonPositionStore {
    async fn create_position(&self, new: NewPosition) -> Result<Position> {
        let now = Utc::now();
        let mut position = Position {
            id: uuid::Uuid::new_v4().to_string(),
            mint: new.mint,
            symbol: new.symbol,
            name: new.name,
            chain: new.chain,
            entry_price: new.entry_price,
            entry_amount: new.entry_amount,
            token_decimals: new.token_decimals,
            entry_value_sol: new.entry_value_sol,
            entry_tx: new.entry_tx,
            current_price: new.entry_price,
            current_value_sol: new.entry_value_sol,
            pnl_pct: 0.0,
            pnl_sol: 0.0,
            take_profit_pct: new.take_profit_pct,
            stop_loss_pct: new.stop_loss_pct,
            status: PositionStatus::Open,
            exit_reason: None,
            exit_price: None,
            exit_tx: None,
            opened_at: now,
            updated_at: now,
            closed_at: None,
        };
        position.reprice(new.entry_price);

        self.positions
            .write()
            .await
            .insert(position.id.clone(), position.clone());
        info!(mint = %position.mint, id = %position.id, "Opened position in {}", position.symbol);

        self.save().await?;
        Ok(position)
    }

    async fn fetch_positions(&self) -> Result<Vec<Position>> {
        let positions = self.positions.read().await;
        let mut list: Vec<Position> = positions.values().cloned().collect();
        list.sort_by(|a, b| a.opened_at.cmp(&b.opened_at));
        Ok(list)
    }

    async fn update_price(&self, id: &str, price: f64) -> Result<Position> {
        let updated = {
            let mut positions = self.positions.write().await;
            let position = positions
                .get_mut(id)
                .ok_or_else(|| Error::PositionNotFound(id.to_string()))?;
            if !position.is_open() {
                return Err(Error::PositionClosed(id.to_string()));
            }
            position.reprice(price);
            position.clone()
        };

        self.save().await?;
        Ok(updated)
    }

    async fn close_position(&self, id: &str, close: PositionClose) -> Result<Position> {
        let closed = {
            let mut positions = self.positions.write().await;
            let position = positions
                .get_mut(id)
                .ok_or_else(|| Error::PositionNotFound(id.to_string()))?;
            if position.status == PositionStatus::Closed {
                return Err(Error::PositionClosed(id.to_string()));
            }

            position.reprice(close.exit_price);
            if let Some(received) = close.sol_received {
                position.current_value_sol = received;
                position.pnl_sol = received - position.entry_value_sol;
            }
            position.status = PositionStatus::Closed;
            position.exit_reason = Some(close.reason);
            position.exit_price = Some(close.exit_price);
            position.exit_tx = close.exit_tx;
            position.closed_at = Some(Utc::now());
            position.clone()
        };

        {
            let mut stats = self.daily_stats.write().await;
            stats.roll_over();
            stats.record_trade(closed.pnl_sol);
        }
        info!(
            mint = %closed.mint,
            reason = %closed.exit_reason.map(|r| r.to_string()).unwrap_or_default(),
            "Closed position with P&L: {:.4} SOL ({:.1}%)",
            closed.pnl_sol,
            closed.pnl_pct
        );

        self.save().await?;
        Ok(closed)
    }

    async fn daily_stats(&self) -> Result<DailyStats> {
        let mut stats = self.daily_stats.write().await;
        stats.roll_over();
        Ok(stats.clone())
    }
}

/// Write to a sibling temp file and rename over the target
pub(crate) async fn write_atomic(path: &Path, data: String) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, data).await?;
    tokio::fs::rename(&tmp, path).await
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// 1000 whole tokens (6 decimals) bought at `entry_price` SOL each
    pub fn new_position(mint: &str, entry_price: f64) -> NewPosition {
        NewPosition {
            mint: mint.to_string(),
            symbol: "TEST".to_string(),
            name: "Test Token".to_string(),
            chain: "solana".to_string(),
            entry_price,
            entry_amount: 1_000_000_000,
            token_decimals: 6,
            entry_value_sol: entry_price * 1000.0,
            entry_tx: "entrySig".to_string(),
            take_profit_pct: 50.0,
            stop_loss_pct: 30.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::new_position;
    use super::*;

    #[test]
    fn test_position_pnl() {
        let mut position = Position {
            id: "p1".into(),
            mint: "MintX".into(),
            symbol: "TEST".into(),
            name: "Test".into(),
            chain: "solana".into(),
            entry_price: 0.00001,
            entry_amount: 1_000_000_000,
            token_decimals: 6,
            entry_value_sol: 0.01,
            entry_tx: "sig".into(),
            current_price: 0.0,
            current_value_sol: 0.0,
            pnl_pct: 0.0,
            pnl_sol: 0.0,
            take_profit_pct: 50.0,
            stop_loss_pct: 30.0,
            status: PositionStatus::Open,
            exit_reason: None,
            exit_price: None,
            exit_tx: None,
            opened_at: Utc::now(),
            updated_at: Utc::now(),
            closed_at: None,
        };

        position.reprice(0.000015);
        assert!((position.current_value_sol - 0.015).abs() < 1e-9);
        assert!((position.pnl_sol - 0.005).abs() < 1e-9);
        assert!((position.pnl_pct - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_pnl_pct() {
        assert!((pnl_pct(1.0, 1.10) - 10.0).abs() < 1e-9);
        assert!(pnl_pct(1.0, 0.15) < -84.0);
        assert_eq!(pnl_pct(0.0, 1.0), 0.0);
    }

    #[test]
    fn test_daily_stats() {
        let mut stats = DailyStats::new();

        stats.record_trade(0.01);
        stats.record_trade(-0.005);
        stats.record_trade(0.02);

        assert_eq!(stats.total_trades, 3);
        assert_eq!(stats.winning_trades, 2);
        assert_eq!(stats.losing_trades, 1);
        assert!((stats.win_rate() - 66.67).abs() < 0.1);
    }

    #[tokio::test]
    async fn test_close_exactly_once() {
        let store = JsonPositionStore::in_memory();
        let position = store.create_position(new_position("MintX", 0.001)).await.unwrap();
        assert!(position.is_open());

        let closed = store
            .close_position(
                &position.id,
                PositionClose {
                    reason: ExitReason::TakeProfit,
                    exit_price: 0.002,
                    exit_tx: Some("exitSig".into()),
                    sol_received: Some(1.9),
                },
            )
            .await
            .unwrap();
        assert_eq!(closed.status, PositionStatus::Closed);
        assert_eq!(closed.exit_reason, Some(ExitReason::TakeProfit));
        assert!((closed.pnl_sol - 0.9).abs() < 1e-9);

        let again = store
            .close_position(&position.id, PositionClose::without_tx(ExitReason::Manual, 0.0, 0.0))
            .await;
        assert!(matches!(again, Err(Error::PositionClosed(_))));
        assert!(store.open_positions().await.unwrap().is_empty());

        let stats = store.daily_stats().await.unwrap();
        assert_eq!(stats.winning_trades, 1);
    }

    #[tokio::test]
    async fn test_update_price_unknown_position() {
        let store = JsonPositionStore::in_memory();
        let result = store.update_price("missing", 1.0).await;
        assert!(matches!(result, Err(Error::PositionNotFound(_))));
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("positions.json");

        let id = {
            let store = JsonPositionStore::open(&path).await.unwrap();
            let position = store.create_position(new_position("MintX", 0.001)).await.unwrap();
            store
                .close_position(&position.id, PositionClose::without_tx(ExitReason::SoldExternally, 0.0005, 0.5))
                .await
                .unwrap();
            store.create_position(new_position("MintY", 0.002)).await.unwrap().id
        };

        let store = JsonPositionStore::open(&path).await.unwrap();
        let all = store.fetch_positions().await.unwrap();
        assert_eq!(all.len(), 2);
        let open = store.open_positions().await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, id);

        let stats = store.daily_stats().await.unwrap();
        assert_eq!(stats.losing_trades, 1);
        assert!((stats.total_loss_sol - 0.5).abs() < 1e-9);
    }
}
