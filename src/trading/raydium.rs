//! Raydium trade API venue
//!
//! Quotes via `compute/swap-base-in`, builds via `transaction/swap-base-in`.
//! Raydium answers 200 with `success: false` for most failures, so the body
//! is classified as well as the status.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::venue::{classify_http, parse_amount, QuoteRequest, SwapQuote, SwapVenue, UnsignedSwap};
use super::SOL_MINT;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
struct RaydiumEnvelope<T> {
    success: bool,
    #[serde(default)]
    msg: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct RaydiumSwapRequest<'a> {
    compute_unit_price_micro_lamports: String,
    swap_response: &'a serde_json::Value,
    tx_version: &'static str,
    wallet: &'a str,
    wrap_sol: bool,
    unwrap_sol: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct RaydiumTransaction {
    transaction: String,
}

pub struct RaydiumVenue {
    base_url: String,
    client: Client,
}

impl RaydiumVenue {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn failure(msg: Option<String>) -> Error {
        let msg = msg.unwrap_or_else(|| "unknown failure".to_string());
        let upper = msg.to_ascii_uppercase();
        if upper.contains("ROUTE") || upper.contains("POOL") || upper.contains("LIQUIDITY") {
            Error::NoRoute(format!("raydium: {}", msg))
        } else {
            Error::TransactionBuild(format!("raydium: {}", msg))
        }
    }
}

#[async_trait]
impl SwapVenue for RaydiumVenue {
    fn id(&self) -> &str {
        "raydium"
    }

    async fn quote(&self, request: &QuoteRequest) -> Result<SwapQuote> {
        let url = format!("{}/compute/swap-base-in", self.base_url);
        debug!(venue = "raydium", mint = %request.token_mint(), amount = request.amount, "Requesting quote");

        let amount = request.amount.to_string();
        let slippage = request.slippage_bps.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("inputMint", request.input_mint.as_str()),
                ("outputMint", request.output_mint.as_str()),
                ("amount", amount.as_str()),
                ("slippageBps", slippage.as_str()),
                ("txVersion", "V0"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_http("raydium", status.as_u16(), &body));
        }

        let raw: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| Error::Deserialization(format!("raydium quote: {}", e)))?;
        let envelope: RaydiumEnvelope<serde_json::Value> = serde_json::from_value(raw.clone())
            .map_err(|e| Error::Deserialization(format!("raydium quote: {}", e)))?;

        if !envelope.success {
            return Err(Self::failure(envelope.msg));
        }

        let data = envelope
            .data
            .ok_or_else(|| Error::Deserialization("raydium quote missing data".to_string()))?;
        let out_amount = data
            .get("outputAmount")
            .and_then(parse_amount)
            .ok_or_else(|| Error::Deserialization("raydium quote missing outputAmount".to_string()))?;
        let in_amount = data
            .get("inputAmount")
            .and_then(parse_amount)
            .unwrap_or(request.amount);
        let price_impact_pct = data.get("priceImpactPct").and_then(|v| v.as_f64());

        Ok(SwapQuote {
            venue: "raydium".to_string(),
            request: request.clone(),
            in_amount,
            out_amount,
            price_impact_pct,
            // The swap endpoint wants the whole quote response back
            raw,
        })
    }

    async fn build_swap(
        &self,
        quote: &SwapQuote,
        user_public_key: &str,
        priority_fee_lamports: u64,
    ) -> Result<UnsignedSwap> {
        let request = RaydiumSwapRequest {
            compute_unit_price_micro_lamports: priority_fee_lamports.to_string(),
            swap_response: &quote.raw,
            tx_version: "V0",
            wallet: user_public_key,
            wrap_sol: quote.request.input_mint == SOL_MINT,
            unwrap_sol: quote.request.output_mint == SOL_MINT,
        };

        let url = format!("{}/transaction/swap-base-in", self.base_url);
        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_http("raydium", status.as_u16(), &body));
        }

        let envelope: RaydiumEnvelope<Vec<RaydiumTransaction>> = serde_json::from_str(&body)
            .map_err(|e| Error::Deserialization(format!("raydium swap: {}", e)))?;

        if !envelope.success {
            return Err(Self::failure(envelope.msg));
        }

        let transaction = envelope
            .data
            .and_then(|txs| txs.into_iter().next())
            .map(|tx| tx.transaction)
            .ok_or_else(|| Error::TransactionBuild("raydium returned no transaction".to_string()))?;

        Ok(UnsignedSwap {
            venue: "raydium".to_string(),
            transaction,
            quote: quote.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_classification() {
        assert!(matches!(
            RaydiumVenue::failure(Some("ROUTE_NOT_FOUND".into())),
            Error::NoRoute(_)
        ));
        assert!(matches!(
            RaydiumVenue::failure(Some("REQ_WALLET_ERROR".into())),
            Error::TransactionBuild(_)
        ));
    }

    #[test]
    fn test_swap_request_shape() {
        let quote = serde_json::json!({"success": true});
        let request = RaydiumSwapRequest {
            compute_unit_price_micro_lamports: "100000".into(),
            swap_response: &quote,
            tx_version: "V0",
            wallet: "User111",
            wrap_sol: true,
            unwrap_sol: false,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"swapResponse\""));
        assert!(json.contains("\"txVersion\":\"V0\""));
        assert!(json.contains("\"computeUnitPriceMicroLamports\":\"100000\""));
    }

    #[test]
    fn test_envelope_parse() {
        let body = r#"{"id":"x","success":true,"version":"V1","data":[{"transaction":"AQID"}]}"#;
        let env: RaydiumEnvelope<Vec<RaydiumTransaction>> = serde_json::from_str(body).unwrap();
        assert!(env.success);
        assert_eq!(env.data.unwrap()[0].transaction, "AQID");
    }
}
