//! Bonding curve lookups
//!
//! Answers one question for the tradability pipeline: is this mint still
//! trading on the pump.fun curve, or has it graduated to an AMM?

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use super::accounts::BondingCurve;
use super::program::{derive_bonding_curve, PUMP_PROGRAM_ID};
use crate::error::{Error, Result};

/// Where a mint stands relative to its bonding curve
#[derive(Debug, Clone, PartialEq)]
pub enum CurveStatus {
    /// Still on the curve
    Bonding { progress_pct: f64, price_sol: f64 },
    /// Curve completed and migrated
    Graduated,
    /// No curve account: not a pump.fun launch
    NotFound,
}

#[async_trait]
pub trait BondingCurveSource: Send + Sync {
    /// Fetch and decode the curve account, `None` if it does not exist
    async fn fetch_curve(&self, mint: &str) -> Result<Option<BondingCurve>>;

    async fn curve_status(&self, mint: &str) -> Result<CurveStatus> {
        match self.fetch_curve(mint).await? {
            None => Ok(CurveStatus::NotFound),
            Some(curve) if curve.complete => Ok(CurveStatus::Graduated),
            Some(curve) => Ok(CurveStatus::Bonding {
                progress_pct: curve.progress_pct(),
                price_sol: curve.price_sol().unwrap_or(0.0),
            }),
        }
    }
}

/// Reads the curve account straight from RPC
pub struct RpcBondingCurveSource {
    rpc: Arc<RpcClient>,
}

impl RpcBondingCurveSource {
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl BondingCurveSource for RpcBondingCurveSource {
    async fn fetch_curve(&self, mint: &str) -> Result<Option<BondingCurve>> {
        let mint = Pubkey::from_str(mint).map_err(|e| Error::InvalidAddress(e.to_string()))?;
        let curve_address = derive_bonding_curve(&mint);

        let response = self
            .rpc
            .get_account_with_commitment(&curve_address, CommitmentConfig::confirmed())
            .await?;

        let Some(account) = response.value else {
            debug!(mint = %mint, "No bonding curve account");
            return Ok(None);
        };

        if account.owner != *PUMP_PROGRAM_ID {
            return Ok(None);
        }

        BondingCurve::try_from_slice(&account.data).map(Some)
    }
}
