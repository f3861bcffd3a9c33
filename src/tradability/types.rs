//! Tradability outcomes
//!
//! Every check returns a sum type with one variant per status, each carrying
//! only the fields that are valid for it.

use serde::{Deserialize, Serialize};

use crate::candidate::TokenStage;

/// A liquidity pool for a mint, as reported by the AMM registry.
/// Amounts are in whole-token (UI) units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolRecord {
    pub address: String,
    pub mint_a: String,
    pub mint_b: String,
    pub amount_a: f64,
    pub amount_b: f64,
    /// Unix seconds; zero means open since creation
    pub open_time: i64,
    /// Registry status code, `None` when the registry does not report one
    pub status: Option<u8>,
    pub lp_supply: f64,
    pub tvl_usd: Option<f64>,
}

/// Why a pool (or the whole lookup) did not come back tradable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PoolRejection {
    NoPools,
    /// Neither side is SOL or USDC
    InvalidBaseMint,
    /// Pool does not contain the candidate mint
    MintNotInPool,
    StatusNotEnabled { status: u8 },
    NotOpenYet { open_time: i64 },
    EmptyVault,
    LiquidityShortfall { liquidity_sol: f64, required_sol: f64 },
    NoLpSupply,
    StillBonding,
    /// Registry unreachable or erroring
    Infrastructure { detail: String },
}

impl PoolRejection {
    /// Higher is more useful to report when no pool passes
    pub fn rank(&self) -> u8 {
        match self {
            PoolRejection::Infrastructure { .. } => 0,
            PoolRejection::NoPools => 1,
            PoolRejection::InvalidBaseMint | PoolRejection::MintNotInPool => 2,
            PoolRejection::NoLpSupply => 3,
            PoolRejection::StatusNotEnabled { .. } => 4,
            PoolRejection::EmptyVault => 5,
            PoolRejection::NotOpenYet { .. } => 6,
            PoolRejection::StillBonding => 7,
            PoolRejection::LiquidityShortfall { .. } => 8,
        }
    }

    /// Deferred rejections may pass on a later check
    pub fn is_deferred(&self) -> bool {
        matches!(
            self,
            PoolRejection::StatusNotEnabled { .. }
                | PoolRejection::NotOpenYet { .. }
                | PoolRejection::EmptyVault
        )
    }
}

impl std::fmt::Display for PoolRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolRejection::NoPools => write!(f, "no pool found"),
            PoolRejection::InvalidBaseMint => write!(f, "pool not paired with SOL or USDC"),
            PoolRejection::MintNotInPool => write!(f, "pool does not contain the token"),
            PoolRejection::StatusNotEnabled { status } => {
                write!(f, "pool status {} is not swap-enabled", status)
            }
            PoolRejection::NotOpenYet { open_time } => write!(f, "pool opens at {}", open_time),
            PoolRejection::EmptyVault => write!(f, "pool vault is empty"),
            PoolRejection::LiquidityShortfall {
                liquidity_sol,
                required_sol,
            } => write!(
                f,
                "liquidity {:.2} SOL below minimum {:.2} SOL",
                liquidity_sol, required_sol
            ),
            PoolRejection::NoLpSupply => write!(f, "pool has no LP supply"),
            PoolRejection::StillBonding => write!(f, "token is still on the bonding curve"),
            PoolRejection::Infrastructure { detail } => {
                write!(f, "registry unavailable: {}", detail)
            }
        }
    }
}

/// Pool validator result
#[derive(Debug, Clone, PartialEq)]
pub enum PoolCheck {
    Tradable {
        pool: PoolRecord,
        liquidity_sol: f64,
    },
    Waiting {
        pool_address: String,
        reason: PoolRejection,
    },
    Discarded {
        pool_address: Option<String>,
        reason: PoolRejection,
    },
}

impl PoolCheck {
    pub fn from_rejection(pool_address: Option<String>, reason: PoolRejection) -> Self {
        match pool_address {
            Some(pool_address) if reason.is_deferred() => PoolCheck::Waiting {
                pool_address,
                reason,
            },
            pool_address => PoolCheck::Discarded {
                pool_address,
                reason,
            },
        }
    }

    pub fn is_tradable(&self) -> bool {
        matches!(self, PoolCheck::Tradable { .. })
    }

    pub fn is_infrastructure_failure(&self) -> bool {
        matches!(
            self,
            PoolCheck::Discarded {
                reason: PoolRejection::Infrastructure { .. },
                ..
            }
        )
    }

    pub fn reason(&self) -> String {
        match self {
            PoolCheck::Tradable { liquidity_sol, .. } => {
                format!("pool tradable with {:.2} SOL liquidity", liquidity_sol)
            }
            PoolCheck::Waiting { reason, .. } | PoolCheck::Discarded { reason, .. } => {
                reason.to_string()
            }
        }
    }
}

/// Swap-route prover result
#[derive(Debug, Clone, PartialEq)]
pub enum RouteProbe {
    Routable {
        venue: String,
        out_amount: u64,
        price_impact_pct: Option<f64>,
    },
    /// Every backend answered and none has a route
    NoRoute { reason: String },
    /// No backend gave a definitive answer
    Unavailable { reason: String },
}

impl RouteProbe {
    pub fn is_routable(&self) -> bool {
        matches!(self, RouteProbe::Routable { .. })
    }

    pub fn reason(&self) -> String {
        match self {
            RouteProbe::Routable {
                venue, out_amount, ..
            } => format!("{} quotes {} units for the probe", venue, out_amount),
            RouteProbe::NoRoute { reason } => format!("no swap route: {}", reason),
            RouteProbe::Unavailable { reason } => format!("swap route unproven: {}", reason),
        }
    }
}

/// Pair data attached to a proven pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairInfo {
    pub pair_address: String,
    pub dex_id: String,
    pub price_usd: Option<f64>,
    pub volume_24h: Option<f64>,
    pub liquidity_usd: Option<f64>,
}

/// Pair enricher result. Never an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Enrichment {
    Found(PairInfo),
    /// Indexer has no pair yet; `retry_in_secs` is `None` once retries are spent
    NotIndexed {
        attempts: u32,
        retry_in_secs: Option<u64>,
    },
    /// Timed out, rate limited or errored
    Unavailable { reason: String },
    Disabled,
}

impl Enrichment {
    pub fn pair_found(&self) -> bool {
        matches!(self, Enrichment::Found(_))
    }

    pub fn stage(&self) -> TokenStage {
        match self {
            Enrichment::Found(_) => TokenStage::Listed,
            Enrichment::NotIndexed {
                retry_in_secs: Some(_),
                ..
            } => TokenStage::Indexing,
            _ => TokenStage::LpLive,
        }
    }

    pub fn pair(&self) -> Option<&PairInfo> {
        match self {
            Enrichment::Found(pair) => Some(pair),
            _ => None,
        }
    }
}

/// How much of a tradable verdict was actually proven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verification {
    /// Pool checklist and swap route both proven
    Verified,
    /// Tradable on the bonding curve venue
    BondingCurve,
    /// Registry was down; admitted on the trust list
    UnverifiedTrustedSource,
}

/// Final pipeline decision
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Tradable {
        stage: TokenStage,
        verification: Verification,
        pool_address: Option<String>,
        liquidity_sol: Option<f64>,
        pair: Option<PairInfo>,
        reason: String,
    },
    Discarded {
        /// Not a final answer: the pool is not ready yet or a service was
        /// unreachable, so check again later
        waiting: bool,
        reason: String,
    },
}

impl Verdict {
    pub fn is_tradable(&self) -> bool {
        matches!(self, Verdict::Tradable { .. })
    }

    pub fn stage(&self) -> Option<TokenStage> {
        match self {
            Verdict::Tradable { stage, .. } => Some(*stage),
            Verdict::Discarded { .. } => None,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Verdict::Tradable { reason, .. } | Verdict::Discarded { reason, .. } => reason,
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(
            self,
            Verdict::Tradable {
                verification: Verification::Verified | Verification::BondingCurve,
                ..
            }
        )
    }
}

/// Stage-completion events, emitted in order
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    BondingChecked { still_bonding: bool },
    PoolChecked(PoolCheck),
    RouteProbed(RouteProbe),
    Enriched(Enrichment),
    Finished(Verdict),
}
