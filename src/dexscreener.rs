// DexScreener pair indexer client
//
// Lookups are keyed by pool (pair) address only. A pool that is not yet
// indexed comes back as `Ok(None)`, which is normal for fresh pools.
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Liquidity {
    pub usd: Option<f64>,
    pub base: Option<f64>,
    pub quote: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Volume {
    pub m5: Option<f64>,
    pub h1: Option<f64>,
    pub h6: Option<f64>,
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseToken {
    pub address: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DexPair {
    #[serde(rename = "chainId")]
    pub chain_id: String,
    #[serde(rename = "dexId")]
    pub dex_id: String,
    pub url: Option<String>,
    #[serde(rename = "pairAddress")]
    pub pair_address: String,
    #[serde(rename = "baseToken")]
    pub base_token: BaseToken,
    #[serde(rename = "priceNative")]
    pub price_native: Option<String>,
    #[serde(rename = "priceUsd")]
    pub price_usd: Option<String>,
    pub volume: Option<Volume>,
    pub liquidity: Option<Liquidity>,
    #[serde(rename = "pairCreatedAt")]
    pub pair_created_at: Option<i64>,
}

impl DexPair {
    pub fn price_usd(&self) -> Option<f64> {
        self.price_usd.as_ref().and_then(|p| p.parse().ok())
    }

    pub fn volume_24h(&self) -> Option<f64> {
        self.volume.as_ref().and_then(|v| v.h24)
    }

    pub fn liquidity_usd(&self) -> Option<f64> {
        self.liquidity.as_ref().and_then(|l| l.usd)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairsResponse {
    pub pair: Option<DexPair>,
    pub pairs: Option<Vec<DexPair>>,
}

impl PairsResponse {
    fn into_pair(self, pool: &str) -> Option<DexPair> {
        self.pair.or_else(|| {
            self.pairs
                .unwrap_or_default()
                .into_iter()
                .find(|p| p.pair_address == pool)
        })
    }
}

/// Pair indexer lookup by validated pool address
#[async_trait]
pub trait PairIndexer: Send + Sync {
    async fn get_pair(&self, pool_address: &str) -> Result<Option<DexPair>>;
}

pub struct DexScreenerClient {
    client: reqwest::Client,
    base_url: String,
    limiter: DefaultDirectRateLimiter,
}

impl DexScreenerClient {
    pub fn new(base_url: &str, requests_per_minute: u32, timeout: Duration) -> Self {
        let per_minute = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);

        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
        }
    }
}

#[async_trait]
impl PairIndexer for DexScreenerClient {
    async fn get_pair(&self, pool_address: &str) -> Result<Option<DexPair>> {
        // Over quota counts as a soft failure; the enricher backs off
        if self.limiter.check().is_err() {
            return Err(Error::RateLimited("dexscreener".to_string()));
        }

        let url = format!("{}/latest/dex/pairs/solana/{}", self.base_url, pool_address);
        let resp = self.client.get(&url).send().await?;
        let status = resp.status().as_u16();
        match status {
            429 => return Err(Error::RateLimited("dexscreener".to_string())),
            404 => return Ok(None),
            s if !(200..300).contains(&s) => {
                return Err(Error::Upstream {
                    service: "dexscreener".to_string(),
                    status: s,
                })
            }
            _ => {}
        }

        let data: PairsResponse = resp
            .json()
            .await
            .map_err(|e| Error::Deserialization(format!("dexscreener pairs: {}", e)))?;

        let pair = data.into_pair(pool_address);
        debug!(pool = %pool_address, found = pair.is_some(), "Pair lookup");
        Ok(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_response_shapes() {
        let single = r#"{
            "schemaVersion": "1.0.0",
            "pair": {
                "chainId": "solana", "dexId": "raydium", "pairAddress": "PoolA",
                "baseToken": {"address": "MintX", "symbol": "X"},
                "priceUsd": "0.0123", "volume": {"h24": 5400.5}, "liquidity": {"usd": 18000}
            }
        }"#;
        let pair = serde_json::from_str::<PairsResponse>(single)
            .unwrap()
            .into_pair("PoolA")
            .unwrap();
        assert_eq!(pair.price_usd(), Some(0.0123));
        assert_eq!(pair.volume_24h(), Some(5400.5));
        assert_eq!(pair.liquidity_usd(), Some(18000.0));

        let missing = r#"{"schemaVersion": "1.0.0", "pairs": null, "pair": null}"#;
        assert!(serde_json::from_str::<PairsResponse>(missing)
            .unwrap()
            .into_pair("PoolA")
            .is_none());
    }

    #[test]
    fn test_list_shape_matches_pool() {
        let list = r#"{"pairs": [
            {"chainId": "solana", "dexId": "raydium", "pairAddress": "Other", "baseToken": {"address": "M"}},
            {"chainId": "solana", "dexId": "raydium", "pairAddress": "PoolA", "baseToken": {"address": "M"}}
        ]}"#;
        let pair = serde_json::from_str::<PairsResponse>(list)
            .unwrap()
            .into_pair("PoolA")
            .unwrap();
        assert_eq!(pair.pair_address, "PoolA");
    }

    #[tokio::test]
    async fn test_local_quota_is_enforced() {
        let client = DexScreenerClient::new("http://127.0.0.1:9", 1, Duration::from_millis(50));
        // First call spends the only token (and fails to connect), second is throttled
        let _ = client.get_pair("PoolA").await;
        assert!(matches!(
            client.get_pair("PoolA").await,
            Err(Error::RateLimited(_))
        ));
    }
}
