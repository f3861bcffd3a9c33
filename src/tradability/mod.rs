//! Tradability pipeline
//!
//! Decides whether a freshly discovered token can actually be bought and
//! sold right now:
//! - bonding curve short-circuit for pump.fun launches
//! - AMM pool validation against the on-chain registry
//! - swap-route proof through the quote backends
//! - best-effort pair enrichment from the indexer

pub mod enricher;
pub mod machine;
pub mod pipeline;
pub mod pool_validator;
pub mod registry;
pub mod route_prover;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

pub use enricher::{EnricherSettings, PairEnricher};
pub use pipeline::{apply_verdict, PipelineObserver, TradabilityPipeline, TrustPolicy};
pub use pool_validator::{PoolValidator, ValidatorSettings};
pub use registry::{AmmRegistry, RaydiumRegistry};
pub use route_prover::{ProverSettings, RouteProver};
pub use types::{
    Enrichment, PairInfo, PipelineEvent, PoolCheck, PoolRecord, PoolRejection, RouteProbe, Verdict,
    Verification,
};

use crate::activity::ActivityLog;
use crate::config::Config;
use crate::dexscreener::DexScreenerClient;
use crate::pump::BondingCurveSource;
use crate::trading::SwapVenue;

/// Wire the pipeline against the configured live services.
///
/// `quote_backends` are the venues used for the route probe, in
/// preference order.
pub fn build_pipeline(
    config: &Config,
    curves: Arc<dyn BondingCurveSource>,
    quote_backends: Vec<Arc<dyn SwapVenue>>,
    activity: ActivityLog,
) -> TradabilityPipeline {
    let tradability = &config.tradability;
    let endpoints = &config.endpoints;

    let registry = Arc::new(RaydiumRegistry::new(
        &endpoints.raydium_api_url,
        Duration::from_millis(tradability.registry_timeout_ms),
    ));
    let validator = PoolValidator::new(registry, ValidatorSettings::from_config(tradability))
        .with_curve_check(curves.clone());

    let enrichment = EnricherSettings::from_config(&config.enrichment);
    let indexer = Arc::new(DexScreenerClient::new(
        &endpoints.dexscreener_url,
        config.enrichment.requests_per_minute,
        enrichment.timeout,
    ));

    TradabilityPipeline::new(
        curves,
        validator,
        RouteProver::new(quote_backends, ProverSettings::from_config(tradability)),
        PairEnricher::new(indexer, enrichment),
        TrustPolicy::from_config(tradability),
        Duration::from_millis(tradability.bonding_timeout_ms),
        activity,
    )
}
