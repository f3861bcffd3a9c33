//! PumpPortal local-trade venue for tokens still on the bonding curve
//!
//! Quotes come from the on-chain curve (constant product). Unsigned
//! transactions come from the PumpPortal local API, which we sign ourselves.
//!
//! API Documentation: https://pumpportal.fun/local-trading-api/trading-api

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::venue::{QuoteRequest, SwapDirection, SwapQuote, SwapVenue, UnsignedSwap};
use crate::error::{Error, Result};
use crate::pump::BondingCurveSource;

const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// Trade action
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
}

/// Pool type for trading
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolType {
    Pump,
    #[serde(rename = "pump-amm")]
    PumpAmm,
    Auto,
}

/// Local trade request (returns unsigned transaction)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalTradeRequest {
    pub action: TradeAction,
    pub mint: String,
    /// SOL for buys, base-unit token amount for sells
    pub amount: String,
    pub denominated_in_sol: String,
    /// Slippage percentage
    pub slippage: u32,
    /// Priority fee in SOL
    pub priority_fee: f64,
    pub public_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolType>,
}

/// JSON error body from the local API
#[derive(Debug, Clone, Deserialize)]
struct LocalTradeError {
    error: Option<String>,
}

pub struct PumpPortalVenue {
    url: String,
    client: Client,
    curves: Arc<dyn BondingCurveSource>,
}

impl PumpPortalVenue {
    pub fn new(url: &str, curves: Arc<dyn BondingCurveSource>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            url: url.to_string(),
            client,
            curves,
        }
    }

    fn local_request(quote: &SwapQuote, user_public_key: &str, priority_fee_lamports: u64) -> LocalTradeRequest {
        let request = &quote.request;
        let slippage = (request.slippage_bps as u32).div_ceil(100).max(1);
        let priority_fee = priority_fee_lamports as f64 / LAMPORTS_PER_SOL;

        match request.direction() {
            SwapDirection::Buy => LocalTradeRequest {
                action: TradeAction::Buy,
                mint: request.output_mint.clone(),
                amount: (request.amount as f64 / LAMPORTS_PER_SOL).to_string(),
                denominated_in_sol: "true".to_string(),
                slippage,
                priority_fee,
                public_key: user_public_key.to_string(),
                pool: Some(PoolType::Pump),
            },
            SwapDirection::Sell => LocalTradeRequest {
                action: TradeAction::Sell,
                mint: request.input_mint.clone(),
                // PumpPortal takes whole tokens
                amount: (request.amount as f64 / 1_000_000.0).to_string(),
                denominated_in_sol: "false".to_string(),
                slippage,
                priority_fee,
                public_key: user_public_key.to_string(),
                pool: Some(PoolType::Pump),
            },
        }
    }
}

#[async_trait]
impl SwapVenue for PumpPortalVenue {
    fn id(&self) -> &str {
        "pumpportal"
    }

    async fn quote(&self, request: &QuoteRequest) -> Result<SwapQuote> {
        let mint = request.token_mint();
        let curve = match self.curves.fetch_curve(mint).await? {
            Some(curve) if !curve.complete => curve,
            Some(_) => return Err(Error::NoRoute("pumpportal: curve complete".to_string())),
            None => return Err(Error::NoRoute("pumpportal: no bonding curve".to_string())),
        };

        let out_amount = match request.direction() {
            SwapDirection::Buy => curve.calculate_buy_tokens(request.amount)?,
            SwapDirection::Sell => curve.calculate_sell_sol(request.amount)?,
        };

        if out_amount == 0 {
            return Err(Error::NoRoute("pumpportal: zero output".to_string()));
        }

        // Impact against the spot price implied by the virtual reserves
        let spot_out = match request.direction() {
            SwapDirection::Buy => {
                request.amount as f64 * curve.virtual_token_reserves as f64
                    / curve.virtual_sol_reserves as f64
            }
            SwapDirection::Sell => {
                request.amount as f64 * curve.virtual_sol_reserves as f64
                    / curve.virtual_token_reserves as f64
            }
        };
        let price_impact_pct = if spot_out > 0.0 {
            Some(((spot_out - out_amount as f64) / spot_out * 100.0).max(0.0))
        } else {
            None
        };

        debug!(venue = "pumpportal", mint, out_amount, "Curve quote");

        Ok(SwapQuote {
            venue: "pumpportal".to_string(),
            request: request.clone(),
            in_amount: request.amount,
            out_amount,
            price_impact_pct,
            raw: serde_json::Value::Null,
        })
    }

    async fn build_swap(
        &self,
        quote: &SwapQuote,
        user_public_key: &str,
        priority_fee_lamports: u64,
    ) -> Result<UnsignedSwap> {
        let request = Self::local_request(quote, user_public_key, priority_fee_lamports);

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::TransactionBuild(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::TransactionBuild(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes);
            let message = serde_json::from_str::<LocalTradeError>(&body)
                .ok()
                .and_then(|e| e.error)
                .unwrap_or_else(|| body.chars().take(120).collect());
            return Err(Error::TransactionBuild(format!("pumpportal: {}", message)));
        }

        // The local API answers with the raw serialized transaction
        let transaction = base64::engine::general_purpose::STANDARD.encode(&bytes);

        Ok(UnsignedSwap {
            venue: "pumpportal".to_string(),
            transaction,
            quote: quote.clone(),
        })
    }
}
