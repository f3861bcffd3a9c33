//! Price feed for position monitoring
//!
//! Prices a position by asking the swap venues what selling the whole
//! holding would return. That is the price an exit would actually get,
//! which matters more for TP/SL than a mid-market quote.
//!
//! WARNING: TP/SL is best-effort, not guaranteed. At a 20s poll, fast rugs
//! can gap through the stop-loss before detection.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::store::Position;
use crate::error::{Error, Result};
use crate::trading::executor::price_per_token;
use crate::trading::params::lamports_to_sol;
use crate::trading::{QuoteRequest, SwapVenue};

/// Current market price for a held token, SOL per whole token
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn price(&self, position: &Position) -> Result<f64>;
}

/// Prices positions from sell quotes, first venue that answers wins
pub struct QuotePriceSource {
    venues: Vec<Arc<dyn SwapVenue>>,
    slippage_bps: u16,
    timeout: Duration,
}

impl QuotePriceSource {
    pub fn new(venues: Vec<Arc<dyn SwapVenue>>, slippage_bps: u16, timeout: Duration) -> Self {
        Self {
            venues,
            slippage_bps,
            timeout,
        }
    }
}

#[async_trait]
impl PriceSource for QuotePriceSource {
    async fn price(&self, position: &Position) -> Result<f64> {
        let request = QuoteRequest::sell(&position.mint, position.entry_amount, self.slippage_bps);
        let mut last = Error::NoRoute(format!("no venue priced {}", position.mint));

        for venue in &self.venues {
            match tokio::time::timeout(self.timeout, venue.quote(&request)).await {
                Ok(Ok(quote)) if quote.out_amount > 0 => {
                    let sol = lamports_to_sol(quote.out_amount);
                    let price = price_per_token(sol, position.entry_amount, position.token_decimals);
                    debug!(mint = %position.mint, venue = venue.id(), price, "Priced position");
                    return Ok(price);
                }
                Ok(Ok(_)) => last = Error::NoRoute(format!("{}: zero output", venue.id())),
                Ok(Err(e)) => last = e,
                Err(_) => last = Error::Timeout(format!("{} price quote", venue.id())),
            }
        }

        Err(last)
    }
}
