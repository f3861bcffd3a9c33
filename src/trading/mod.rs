//! Trading module - swap venues, signing and execution
//!
//! Supports multiple venues:
//! - Jupiter aggregator (primary and keyed fallback)
//! - Raydium trade API
//! - PumpPortal local API for tokens still on the bonding curve

pub mod executor;
pub mod jupiter;
pub mod params;
pub mod pumpportal_api;
pub mod raydium;
pub mod settlement;
pub mod signer;
pub mod venue;

use std::sync::Arc;
use std::time::Duration;

pub use executor::{BuyFill, ExitOutcome, SellFill, SnipeOutcome, TradeExecutor};
pub use jupiter::JupiterVenue;
pub use params::TradingParams;
pub use pumpportal_api::PumpPortalVenue;
pub use raydium::RaydiumVenue;
pub use settlement::{Fill, RpcSettlement, Settlement};
pub use signer::{KeypairSigner, TransactionSigner};
pub use venue::{QuoteRequest, SwapQuote, SwapVenue, UnsignedSwap};

use crate::config::Config;
use crate::pump::BondingCurveSource;

/// Wrapped SOL mint
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";

/// USDC mint
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// Build the configured venues in preference order. The Jupiter entry
/// expands to primary plus fallback.
pub fn build_venues(config: &Config, curves: Arc<dyn BondingCurveSource>) -> Vec<Arc<dyn SwapVenue>> {
    let timeout = Duration::from_millis(config.tradability.backend_timeout_ms);
    let endpoints = &config.endpoints;
    let mut venues: Vec<Arc<dyn SwapVenue>> = Vec::new();

    for name in &config.trading.venues {
        match name.as_str() {
            "jupiter" => {
                venues.push(Arc::new(JupiterVenue::new(
                    "jupiter",
                    &endpoints.jupiter_primary_url,
                    None,
                    timeout,
                )));
                venues.push(Arc::new(JupiterVenue::new(
                    "jupiter-fallback",
                    &endpoints.jupiter_fallback_url,
                    Some(endpoints.jupiter_api_key.clone()),
                    timeout,
                )));
            }
            "raydium" => venues.push(Arc::new(RaydiumVenue::new(
                &endpoints.raydium_trade_url,
                timeout,
            ))),
            "pumpportal" => venues.push(Arc::new(PumpPortalVenue::new(
                &endpoints.pumpportal_url,
                curves.clone(),
                timeout,
            ))),
            other => tracing::warn!("Ignoring unknown venue: {}", other),
        }
    }

    venues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pump::curve::mock::MockCurveSource;

    #[test]
    fn test_build_venues_expands_jupiter() {
        let mut config = Config::default();
        config.trading.venues = vec!["jupiter".into(), "raydium".into(), "pumpportal".into()];
        let venues = build_venues(&config, Arc::new(MockCurveSource::default()));
        let ids: Vec<&str> = venues.iter().map(|v| v.id()).collect();
        assert_eq!(ids, vec!["jupiter", "jupiter-fallback", "raydium", "pumpportal"]);
    }
}
