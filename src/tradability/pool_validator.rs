//! Pool validator
//!
//! Applies a fixed checklist to every pool the registry knows for a mint,
//! in liquidity order, and returns the first pool that passes. The
//! checklist short-circuits on the first failing item:
//!
//! 1. one side is SOL or USDC, the other is the candidate
//! 2. status is swap-enabled (when the registry reports one)
//! 3. pool is open
//! 4. both vaults are non-empty
//! 5. SOL-equivalent liquidity reaches `max(min_liquidity, hard_floor)`
//! 6. LP supply is positive
//! 7. optionally, the mint is not still on its bonding curve

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::registry::AmmRegistry;
use super::types::{PoolCheck, PoolRecord, PoolRejection};
use crate::config::TradabilityConfig;
use crate::pump::{BondingCurveSource, CurveStatus};
use crate::trading::{SOL_MINT, USDC_MINT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseAsset {
    Sol,
    Usdc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorSettings {
    pub min_liquidity_sol: f64,
    pub hard_floor_sol: f64,
    /// USD per SOL, used to express USDC pools in SOL
    pub sol_usd_rate: f64,
    pub swap_enabled_statuses: Vec<u8>,
    pub registry_timeout: Duration,
}

impl ValidatorSettings {
    pub fn from_config(config: &TradabilityConfig) -> Self {
        Self {
            min_liquidity_sol: config.min_liquidity_sol,
            hard_floor_sol: config.hard_floor_sol,
            sol_usd_rate: config.sol_usd_rate,
            swap_enabled_statuses: config.swap_enabled_statuses.clone(),
            registry_timeout: Duration::from_millis(config.registry_timeout_ms),
        }
    }

    pub fn threshold_sol(&self) -> f64 {
        self.min_liquidity_sol.max(self.hard_floor_sol)
    }
}

/// Which side of the pool is the base asset: (asset, base amount, token amount)
pub fn base_side(pool: &PoolRecord, mint: &str) -> Result<(BaseAsset, f64, f64), PoolRejection> {
    let classify = |m: &str| match m {
        SOL_MINT => Some(BaseAsset::Sol),
        USDC_MINT => Some(BaseAsset::Usdc),
        _ => None,
    };

    match (classify(&pool.mint_a), classify(&pool.mint_b)) {
        (Some(asset), _) if pool.mint_b == mint => Ok((asset, pool.amount_a, pool.amount_b)),
        (_, Some(asset)) if pool.mint_a == mint => Ok((asset, pool.amount_b, pool.amount_a)),
        (None, None) => Err(PoolRejection::InvalidBaseMint),
        _ => Err(PoolRejection::MintNotInPool),
    }
}

/// SOL-equivalent liquidity of the base side
pub fn liquidity_sol(asset: BaseAsset, base_amount: f64, sol_usd_rate: f64) -> f64 {
    match asset {
        BaseAsset::Sol => base_amount,
        BaseAsset::Usdc => base_amount / sol_usd_rate,
    }
}

/// Run the checklist against one pool. Returns the SOL liquidity on success.
pub fn evaluate_pool(
    pool: &PoolRecord,
    mint: &str,
    now_unix: i64,
    settings: &ValidatorSettings,
) -> Result<f64, PoolRejection> {
    let (asset, base_amount, token_amount) = base_side(pool, mint)?;

    if let Some(status) = pool.status {
        if !settings.swap_enabled_statuses.contains(&status) {
            return Err(PoolRejection::StatusNotEnabled { status });
        }
    }

    if pool.open_time > now_unix {
        return Err(PoolRejection::NotOpenYet {
            open_time: pool.open_time,
        });
    }

    if base_amount <= 0.0 || token_amount <= 0.0 {
        return Err(PoolRejection::EmptyVault);
    }

    let liquidity = liquidity_sol(asset, base_amount, settings.sol_usd_rate);
    let required = settings.threshold_sol();
    if liquidity < required {
        return Err(PoolRejection::LiquidityShortfall {
            liquidity_sol: liquidity,
            required_sol: required,
        });
    }

    if pool.lp_supply <= 0.0 {
        return Err(PoolRejection::NoLpSupply);
    }

    Ok(liquidity)
}

/// Evaluate pools best-liquidity first; first pass wins, else the most
/// informative failure.
pub fn select_pool(
    mint: &str,
    pools: &[PoolRecord],
    now_unix: i64,
    settings: &ValidatorSettings,
) -> PoolCheck {
    let mut ordered: Vec<(&PoolRecord, f64)> = pools
        .iter()
        .map(|p| {
            let liquidity = base_side(p, mint)
                .map(|(asset, amount, _)| liquidity_sol(asset, amount, settings.sol_usd_rate))
                .unwrap_or(f64::NEG_INFINITY);
            (p, liquidity)
        })
        .collect();
    ordered.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let mut best_failure: Option<(String, PoolRejection)> = None;
    for (pool, _) in ordered {
        match evaluate_pool(pool, mint, now_unix, settings) {
            Ok(liquidity_sol) => {
                return PoolCheck::Tradable {
                    pool: pool.clone(),
                    liquidity_sol,
                }
            }
            Err(reason) => {
                debug!(pool = %pool.address, "Pool rejected: {}", reason);
                let better = best_failure
                    .as_ref()
                    .map_or(true, |(_, current)| reason.rank() > current.rank());
                if better {
                    best_failure = Some((pool.address.clone(), reason));
                }
            }
        }
    }

    match best_failure {
        Some((address, reason)) => PoolCheck::from_rejection(Some(address), reason),
        None => PoolCheck::Discarded {
            pool_address: None,
            reason: PoolRejection::NoPools,
        },
    }
}

pub struct PoolValidator {
    registry: Arc<dyn AmmRegistry>,
    settings: ValidatorSettings,
    curves: Option<Arc<dyn BondingCurveSource>>,
}

impl PoolValidator {
    pub fn new(registry: Arc<dyn AmmRegistry>, settings: ValidatorSettings) -> Self {
        Self {
            registry,
            settings,
            curves: None,
        }
    }

    /// Also reject mints still on the bonding curve
    pub fn with_curve_check(mut self, curves: Arc<dyn BondingCurveSource>) -> Self {
        self.curves = Some(curves);
        self
    }

    pub fn settings(&self) -> &ValidatorSettings {
        &self.settings
    }

    pub async fn validate(&self, mint: &str) -> PoolCheck {
        let lookup = tokio::time::timeout(
            self.settings.registry_timeout,
            self.registry.pools_for_mint(mint),
        )
        .await;

        let pools = match lookup {
            Ok(Ok(pools)) => pools,
            Ok(Err(e)) => {
                warn!(mint = %mint, "AMM registry failed: {}", e);
                return PoolCheck::from_rejection(
                    None,
                    PoolRejection::Infrastructure {
                        detail: e.short_reason(),
                    },
                );
            }
            Err(_) => {
                warn!(mint = %mint, "AMM registry timed out");
                return PoolCheck::from_rejection(
                    None,
                    PoolRejection::Infrastructure {
                        detail: "registry timed out".to_string(),
                    },
                );
            }
        };

        let check = select_pool(mint, &pools, chrono::Utc::now().timestamp(), &self.settings);

        if let (PoolCheck::Tradable { pool, .. }, Some(curves)) = (&check, &self.curves) {
            match curves.curve_status(mint).await {
                Ok(CurveStatus::Bonding { .. }) => {
                    return PoolCheck::from_rejection(
                        Some(pool.address.clone()),
                        PoolRejection::StillBonding,
                    )
                }
                Ok(_) => {}
                Err(e) => debug!(mint = %mint, "Curve check skipped: {}", e),
            }
        }

        check
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::sol_pool;
    use super::*;
    use crate::pump::curve::mock::MockCurveSource;
    use crate::pump::BondingCurve;
    use crate::tradability::registry::mock::MockRegistry;

    const MINT: &str = "MintX";
    const NOW: i64 = 1_700_000_000;

    fn settings() -> ValidatorSettings {
        ValidatorSettings::from_config(&TradabilityConfig::default())
    }

    #[test]
    fn test_liquidity_boundary() {
        let s = settings();
        assert_eq!(s.threshold_sol(), 20.0);
        assert_eq!(evaluate_pool(&sol_pool("P", MINT, 20.0), MINT, NOW, &s), Ok(20.0));
        assert!(matches!(
            evaluate_pool(&sol_pool("P", MINT, 19.99), MINT, NOW, &s),
            Err(PoolRejection::LiquidityShortfall { .. })
        ));
    }

    #[test]
    fn test_hard_floor_applies() {
        let s = ValidatorSettings {
            min_liquidity_sol: 1.0,
            ..settings()
        };
        assert!(evaluate_pool(&sol_pool("P", MINT, 4.9), MINT, NOW, &s).is_err());
        assert!(evaluate_pool(&sol_pool("P", MINT, 5.0), MINT, NOW, &s).is_ok());
    }

    #[test]
    fn test_zero_vault_never_tradable() {
        let s = settings();
        let variants = [
            PoolRecord { amount_a: 0.0, ..sol_pool("P", MINT, 500.0) },
            PoolRecord { amount_b: 0.0, ..sol_pool("P", MINT, 500.0) },
            PoolRecord { amount_a: 0.0, lp_supply: 1e9, status: Some(6), ..sol_pool("P", MINT, 500.0) },
            PoolRecord { amount_a: -1.0, ..sol_pool("P", MINT, 500.0) },
        ];
        for pool in variants {
            assert_eq!(
                evaluate_pool(&pool, MINT, NOW, &s),
                Err(PoolRejection::EmptyVault)
            );
            let check = select_pool(MINT, &[pool], NOW, &s);
            assert!(!check.is_tradable());
            assert!(matches!(check, PoolCheck::Waiting { .. }));
        }
    }

    #[test]
    fn test_checklist_order() {
        let s = settings();
        let foreign = PoolRecord {
            mint_a: "OtherBase".into(),
            ..sol_pool("P", MINT, 50.0)
        };
        assert_eq!(
            evaluate_pool(&foreign, MINT, NOW, &s),
            Err(PoolRejection::InvalidBaseMint)
        );

        let wrong_token = sol_pool("P", "MintY", 50.0);
        assert_eq!(
            evaluate_pool(&wrong_token, MINT, NOW, &s),
            Err(PoolRejection::MintNotInPool)
        );

        let disabled = PoolRecord {
            status: Some(4),
            amount_a: 0.0,
            ..sol_pool("P", MINT, 50.0)
        };
        assert_eq!(
            evaluate_pool(&disabled, MINT, NOW, &s),
            Err(PoolRejection::StatusNotEnabled { status: 4 })
        );

        let future = PoolRecord {
            open_time: NOW + 60,
            ..sol_pool("P", MINT, 50.0)
        };
        assert_eq!(
            evaluate_pool(&future, MINT, NOW, &s),
            Err(PoolRejection::NotOpenYet { open_time: NOW + 60 })
        );

        let shell = PoolRecord {
            lp_supply: 0.0,
            ..sol_pool("P", MINT, 50.0)
        };
        assert_eq!(
            evaluate_pool(&shell, MINT, NOW, &s),
            Err(PoolRejection::NoLpSupply)
        );
    }

    #[test]
    fn test_usdc_pool_uses_configured_rate() {
        let s = ValidatorSettings {
            sol_usd_rate: 100.0,
            ..settings()
        };
        let pool = PoolRecord {
            mint_a: MINT.to_string(),
            mint_b: USDC_MINT.to_string(),
            amount_a: 1_000_000.0,
            amount_b: 2_500.0,
            ..sol_pool("P", MINT, 0.0)
        };
        assert_eq!(evaluate_pool(&pool, MINT, NOW, &s), Ok(25.0));

        let cheaper = ValidatorSettings {
            sol_usd_rate: 200.0,
            ..s
        };
        assert!(evaluate_pool(&pool, MINT, NOW, &cheaper).is_err());
    }

    #[test]
    fn test_best_pool_wins_in_liquidity_order() {
        let s = settings();
        let pools = vec![
            sol_pool("Small", MINT, 25.0),
            sol_pool("Big", MINT, 300.0),
            sol_pool("Dust", MINT, 1.0),
        ];
        match select_pool(MINT, &pools, NOW, &s) {
            PoolCheck::Tradable { pool, liquidity_sol } => {
                assert_eq!(pool.address, "Big");
                assert_eq!(liquidity_sol, 300.0);
            }
            other => panic!("expected tradable, got {:?}", other),
        }
    }

    #[test]
    fn test_most_informative_failure() {
        let s = settings();
        let pools = vec![
            PoolRecord {
                mint_a: "OtherBase".into(),
                ..sol_pool("Foreign", MINT, 0.0)
            },
            sol_pool("Thin", MINT, 3.0),
        ];
        match select_pool(MINT, &pools, NOW, &s) {
            PoolCheck::Discarded {
                pool_address,
                reason: PoolRejection::LiquidityShortfall { .. },
            } => assert_eq!(pool_address.as_deref(), Some("Thin")),
            other => panic!("expected liquidity shortfall, got {:?}", other),
        }

        assert_eq!(
            select_pool(MINT, &[], NOW, &s),
            PoolCheck::Discarded {
                pool_address: None,
                reason: PoolRejection::NoPools
            }
        );
    }

    #[tokio::test]
    async fn test_registry_failure_is_infrastructure() {
        let validator = PoolValidator::new(Arc::new(MockRegistry::down()), settings());
        let check = validator.validate(MINT).await;
        assert!(check.is_infrastructure_failure());
        assert!(check.reason().starts_with("registry unavailable"));
    }

    #[tokio::test]
    async fn test_curve_check_rejects_bonding_mint() {
        let registry = MockRegistry::with_pools(vec![sol_pool("P", MINT, 100.0)]);
        let curve = BondingCurve::new_for_test(30_000_000_000, 1_073_000_000_000_000, 793_100_000_000_000, false);
        let validator = PoolValidator::new(Arc::new(registry), settings())
            .with_curve_check(Arc::new(MockCurveSource::with_curve(MINT, curve)));

        let check = validator.validate(MINT).await;
        assert!(matches!(
            check,
            PoolCheck::Discarded {
                reason: PoolRejection::StillBonding,
                ..
            }
        ));
    }
}
