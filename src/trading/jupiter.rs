//! Jupiter aggregator venue
//!
//! `GET {base}/quote` and `POST {base}/swap`. The keyless lite endpoint and
//! the keyed endpoint expose the same API, so two instances act as
//! primary and fallback backends.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::venue::{classify_http, parse_amount, QuoteRequest, SwapQuote, SwapVenue, UnsignedSwap};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct JupiterQuoteParams {
    input_mint: String,
    output_mint: String,
    amount: String,
    slippage_bps: u16,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct JupiterSwapRequest<'a> {
    quote_response: &'a serde_json::Value,
    user_public_key: &'a str,
    wrap_and_unwrap_sol: bool,
    dynamic_compute_unit_limit: bool,
    compute_unit_price_micro_lamports: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JupiterSwapResponse {
    /// Base64 encoded VersionedTransaction
    swap_transaction: Option<String>,
    error: Option<String>,
}

pub struct JupiterVenue {
    id: String,
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl JupiterVenue {
    pub fn new(id: impl Into<String>, base_url: &str, api_key: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            id: id.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            client,
        }
    }

    fn with_key(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("x-api-key", key),
            None => builder,
        }
    }
}

#[async_trait]
impl SwapVenue for JupiterVenue {
    fn id(&self) -> &str {
        &self.id
    }

    async fn quote(&self, request: &QuoteRequest) -> Result<SwapQuote> {
        let params = JupiterQuoteParams {
            input_mint: request.input_mint.clone(),
            output_mint: request.output_mint.clone(),
            amount: request.amount.to_string(),
            slippage_bps: request.slippage_bps,
        };

        let url = format!("{}/quote", self.base_url);
        debug!(venue = %self.id, mint = %request.token_mint(), amount = request.amount, "Requesting quote");

        let response = self
            .with_key(self.client.get(&url).query(&params))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_http(&self.id, status.as_u16(), &body));
        }

        let raw: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| Error::Deserialization(format!("{} quote: {}", self.id, e)))?;

        if let Some(err) = raw.get("error").and_then(|v| v.as_str()) {
            return Err(Error::NoRoute(format!("{}: {}", self.id, err)));
        }

        let out_amount = raw
            .get("outAmount")
            .and_then(parse_amount)
            .ok_or_else(|| Error::Deserialization(format!("{} quote missing outAmount", self.id)))?;
        let in_amount = raw
            .get("inAmount")
            .and_then(parse_amount)
            .unwrap_or(request.amount);
        let price_impact_pct = raw
            .get("priceImpactPct")
            .and_then(|v| match v {
                serde_json::Value::String(s) => s.parse::<f64>().ok(),
                other => other.as_f64(),
            })
            // Jupiter reports a fraction
            .map(|f| f * 100.0);

        Ok(SwapQuote {
            venue: self.id.clone(),
            request: request.clone(),
            in_amount,
            out_amount,
            price_impact_pct,
            raw,
        })
    }

    async fn build_swap(
        &self,
        quote: &SwapQuote,
        user_public_key: &str,
        priority_fee_lamports: u64,
    ) -> Result<UnsignedSwap> {
        let request = JupiterSwapRequest {
            quote_response: &quote.raw,
            user_public_key,
            wrap_and_unwrap_sol: true,
            dynamic_compute_unit_limit: true,
            compute_unit_price_micro_lamports: priority_fee_lamports,
        };

        let url = format!("{}/swap", self.base_url);
        let response = self
            .with_key(self.client.post(&url).json(&request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_http(&self.id, status.as_u16(), &body));
        }

        let parsed: JupiterSwapResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Deserialization(format!("{} swap: {}", self.id, e)))?;

        if let Some(err) = parsed.error {
            return Err(Error::TransactionBuild(err));
        }

        let transaction = parsed
            .swap_transaction
            .ok_or_else(|| Error::TransactionBuild("No swapTransaction in response".to_string()))?;

        Ok(UnsignedSwap {
            venue: self.id.clone(),
            transaction,
            quote: quote.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_params_serialization() {
        let params = JupiterQuoteParams {
            input_mint: "So11111111111111111111111111111111111111112".into(),
            output_mint: "MintX".into(),
            amount: "1000000".into(),
            slippage_bps: 1500,
        };
        let json = serde_json::to_string(&params).unwrap();
        assert!(json.contains("\"inputMint\""));
        assert!(json.contains("\"slippageBps\":1500"));
    }

    #[test]
    fn test_swap_request_serialization() {
        let quote = serde_json::json!({"outAmount": "5"});
        let request = JupiterSwapRequest {
            quote_response: &quote,
            user_public_key: "User111",
            wrap_and_unwrap_sol: true,
            dynamic_compute_unit_limit: true,
            compute_unit_price_micro_lamports: 500_000,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"quoteResponse\":{\"outAmount\":\"5\"}"));
        assert!(json.contains("\"computeUnitPriceMicroLamports\":500000"));
    }

    #[test]
    fn test_empty_api_key_is_ignored() {
        let venue = JupiterVenue::new("jupiter", "https://lite-api.jup.ag/swap/v1/", Some(String::new()), Duration::from_secs(10));
        assert!(venue.api_key.is_none());
        assert_eq!(venue.base_url, "https://lite-api.jup.ag/swap/v1");
    }
}
