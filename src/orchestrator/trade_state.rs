//! Durable per-mint trade state
//!
//! The guard against buying the same mint twice, across restarts. States
//! only move forward:
//!
//! ```text
//! UNTRADED -> PENDING | TRADED | REJECTED
//! PENDING  -> PENDING | TRADED | REJECTED
//! TRADED, REJECTED: terminal
//! ```
//!
//! Every transition is a single-key upsert followed by a rewrite of the
//! file. The per-mint locks serialize buy and sell paths on one mint.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::position::store::write_atomic;

/// Pending because no venue could route the token yet
pub const PENDING_NO_ROUTE: &str = "no_route";
/// Pending because the scanner flagged the token as too new
pub const PENDING_AWAITING_INDEXING: &str = "awaiting_indexing";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeState {
    Untraded,
    #[serde(rename_all = "camelCase")]
    Pending { reason: String, since: DateTime<Utc> },
    #[serde(rename_all = "camelCase")]
    Traded {
        tx_hash: String,
        position_id: String,
        at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    Rejected { reason: String, at: DateTime<Utc> },
}

impl TradeState {
    pub fn name(&self) -> &'static str {
        match self {
            TradeState::Untraded => "UNTRADED",
            TradeState::Pending { .. } => "PENDING",
            TradeState::Traded { .. } => "TRADED",
            TradeState::Rejected { .. } => "REJECTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TradeState::Traded { .. } | TradeState::Rejected { .. })
    }

    fn can_become(&self, next: &TradeState) -> bool {
        match (self, next) {
            (_, TradeState::Untraded) => false,
            (TradeState::Untraded, _) | (TradeState::Pending { .. }, _) => true,
            _ => false,
        }
    }
}

/// Whether a mint may be queued for a buy right now
#[derive(Debug, Clone, PartialEq)]
pub enum Eligibility {
    Eligible,
    /// Pending and still inside the retry window
    RetryLater { reason: String, remaining: Duration },
    Blocked(TradeState),
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}

pub struct TradeStateStore {
    states: Mutex<HashMap<String, TradeState>>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    pending_window: Duration,
    path: Option<PathBuf>,
}

impl TradeStateStore {
    pub fn in_memory(pending_window: Duration) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            locks: DashMap::new(),
            pending_window,
            path: None,
        }
    }

    pub async fn open(path: impl AsRef<Path>, pending_window: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut states = HashMap::new();

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            let data = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::TradeState(e.to_string()))?;
            states = serde_json::from_str(&data).map_err(|e| Error::TradeState(e.to_string()))?;
            info!("Loaded {} trade states from {}", states.len(), path.display());
        }

        Ok(Self {
            states: Mutex::new(states),
            locks: DashMap::new(),
            pending_window,
            path: Some(path),
        })
    }

    pub async fn get(&self, mint: &str) -> TradeState {
        self.states
            .lock()
            .await
            .get(mint)
            .cloned()
            .unwrap_or(TradeState::Untraded)
    }

    pub async fn eligibility(&self, mint: &str) -> Eligibility {
        match self.get(mint).await {
            TradeState::Untraded => Eligibility::Eligible,
            TradeState::Pending { reason, since } => {
                let elapsed = (Utc::now() - since).to_std().unwrap_or_default();
                if elapsed >= self.pending_window {
                    Eligibility::Eligible
                } else {
                    Eligibility::RetryLater {
                        reason,
                        remaining: self.pending_window - elapsed,
                    }
                }
            }
            terminal => Eligibility::Blocked(terminal),
        }
    }

    pub async fn mark_pending(&self, mint: &str, reason: &str) -> Result<()> {
        self.transition(
            mint,
            TradeState::Pending {
                reason: reason.to_string(),
                since: Utc::now(),
            },
        )
        .await
    }

    pub async fn mark_traded(&self, mint: &str, tx_hash: &str, position_id: &str) -> Result<()> {
        self.transition(
            mint,
            TradeState::Traded {
                tx_hash: tx_hash.to_string(),
                position_id: position_id.to_string(),
                at: Utc::now(),
            },
        )
        .await
    }

    pub async fn mark_rejected(&self, mint: &str, reason: &str) -> Result<()> {
        self.transition(
            mint,
            TradeState::Rejected {
                reason: reason.to_string(),
                at: Utc::now(),
            },
        )
        .await
    }

    /// All known states, sorted by mint
    pub async fn all(&self) -> Vec<(String, TradeState)> {
        let states = self.states.lock().await;
        let mut list: Vec<(String, TradeState)> =
            states.iter().map(|(m, s)| (m.clone(), s.clone())).collect();
        list.sort_by(|a, b| a.0.cmp(&b.0));
        list
    }

    /// Serialize work on one mint
    pub async fn lock_mint(&self, mint: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(mint.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    async fn transition(&self, mint: &str, next: TradeState) -> Result<()> {
        let mut states = self.states.lock().await;
        let current = states.get(mint).cloned().unwrap_or(TradeState::Untraded);
        if !current.can_become(&next) {
            return Err(Error::IllegalTransition {
                mint: mint.to_string(),
                from: current.name().to_string(),
                to: next.name().to_string(),
            });
        }

        debug!(mint = %mint, from = current.name(), to = next.name(), "Trade state");
        states.insert(mint.to_string(), next);

        if let Some(path) = &self.path {
            let data = serde_json::to_string_pretty(&*states)
                .map_err(|e| Error::TradeState(e.to_string()))?;
            write_atomic(path, data)
                .await
                .map_err(|e| Error::TradeState(e.to_string()))?;
        }
        Ok(())
    }
}
