//! Swap venue abstraction
//!
//! A venue can quote a swap and build an unsigned transaction for it.
//! Jupiter (primary and fallback), Raydium and PumpPortal implement it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Which way a swap goes relative to SOL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapDirection {
    Buy,
    Sell,
}

/// Quote request in base units
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRequest {
    pub input_mint: String,
    pub output_mint: String,
    pub amount: u64,
    pub slippage_bps: u16,
}

impl QuoteRequest {
    /// SOL -> token for `lamports`
    pub fn buy(mint: &str, lamports: u64, slippage_bps: u16) -> Self {
        Self {
            input_mint: super::SOL_MINT.to_string(),
            output_mint: mint.to_string(),
            amount: lamports,
            slippage_bps,
        }
    }

    /// token -> SOL for `token_amount` base units
    pub fn sell(mint: &str, token_amount: u64, slippage_bps: u16) -> Self {
        Self {
            input_mint: mint.to_string(),
            output_mint: super::SOL_MINT.to_string(),
            amount: token_amount,
            slippage_bps,
        }
    }

    pub fn direction(&self) -> SwapDirection {
        if self.input_mint == super::SOL_MINT {
            SwapDirection::Buy
        } else {
            SwapDirection::Sell
        }
    }

    /// The non-SOL side
    pub fn token_mint(&self) -> &str {
        match self.direction() {
            SwapDirection::Buy => &self.output_mint,
            SwapDirection::Sell => &self.input_mint,
        }
    }
}

/// A venue's answer to a quote request
#[derive(Debug, Clone)]
pub struct SwapQuote {
    pub venue: String,
    pub request: QuoteRequest,
    pub in_amount: u64,
    pub out_amount: u64,
    pub price_impact_pct: Option<f64>,
    /// Venue-specific payload needed to build the swap
    pub raw: serde_json::Value,
}

/// Unsigned transaction ready for the signer
#[derive(Debug, Clone)]
pub struct UnsignedSwap {
    pub venue: String,
    /// Base64 encoded VersionedTransaction
    pub transaction: String,
    pub quote: SwapQuote,
}

#[async_trait]
pub trait SwapVenue: Send + Sync {
    /// Stable identifier used in config and logs
    fn id(&self) -> &str;

    async fn quote(&self, request: &QuoteRequest) -> Result<SwapQuote>;

    async fn build_swap(
        &self,
        quote: &SwapQuote,
        user_public_key: &str,
        priority_fee_lamports: u64,
    ) -> Result<UnsignedSwap>;
}

/// Map a non-success HTTP response to the error taxonomy
pub fn classify_http(service: &str, status: u16, body: &str) -> Error {
    let lower = body.to_ascii_lowercase();
    match status {
        429 => Error::RateLimited(service.to_string()),
        400 | 404 => Error::NoRoute(format!("{}: {}", service, summarize_body(body))),
        s if s >= 500 => Error::Upstream {
            service: service.to_string(),
            status: s,
        },
        _ if lower.contains("route") || lower.contains("not tradable") => {
            Error::NoRoute(format!("{}: {}", service, summarize_body(body)))
        }
        s => Error::Upstream {
            service: service.to_string(),
            status: s,
        },
    }
}

/// Pull a readable message out of an error body
pub fn summarize_body(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "msg", "message", "errorCode"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }
    body.chars().take(120).collect()
}

/// Parse an amount that venues return as a decimal string
pub fn parse_amount(raw: &serde_json::Value) -> Option<u64> {
    match raw {
        serde_json::Value::String(s) => s.parse().ok(),
        serde_json::Value::Number(n) => n.as_u64(),
        _ => None,
    }
}
