//! Risk assessment
//!
//! Independent of tradability: a token can be perfectly swappable and
//! still be a rug. The assessor turns a safety report into a pass/fail
//! decision against the configured filters.

pub mod assessor;
pub mod rugcheck;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use assessor::{RiskAssessment, RiskAssessor};
pub use rugcheck::RugCheckClient;

use crate::config::RiskConfig;
use crate::error::Result;

/// Filters applied to a safety report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFilters {
    pub check_rug_pull: bool,
    pub check_honeypot: bool,
    pub check_mint_authority: bool,
    pub check_freeze_authority: bool,
    /// Zero disables the holder-count check
    pub min_holders: u32,
    /// Largest single holder share allowed, percent
    pub max_ownership_pct: f64,
    pub max_risk_score: u32,
}

impl RiskFilters {
    pub fn from_config(config: &RiskConfig) -> Self {
        Self {
            check_rug_pull: config.check_rug_pull,
            check_honeypot: config.check_honeypot,
            check_mint_authority: config.check_mint_authority,
            check_freeze_authority: config.check_freeze_authority,
            min_holders: config.min_holders,
            max_ownership_pct: config.max_ownership_pct,
            max_risk_score: config.max_risk_score,
        }
    }
}

impl Default for RiskFilters {
    fn default() -> Self {
        Self::from_config(&RiskConfig::default())
    }
}

/// Normalized safety report, whatever service produced it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SafetyReport {
    /// 0 (safe) to 100 (certain scam)
    pub score: u32,
    pub rugged: bool,
    pub honeypot: bool,
    pub mint_authority: bool,
    pub freeze_authority: bool,
    pub holder_count: Option<u32>,
    pub top_holder_pct: Option<f64>,
    pub risk_names: Vec<String>,
}

#[async_trait]
pub trait SafetyReportSource: Send + Sync {
    async fn report(&self, mint: &str) -> Result<SafetyReport>;
}
