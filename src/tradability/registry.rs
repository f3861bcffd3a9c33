//! AMM registry
//!
//! Pool lookups by mint against the Raydium v3 API. The registry is the
//! only place a mint (rather than a pool address) is used as a lookup key.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::types::PoolRecord;
use crate::error::{Error, Result};
use crate::trading::venue::classify_http;

#[async_trait]
pub trait AmmRegistry: Send + Sync {
    /// All known pools containing `mint`, in any order
    async fn pools_for_mint(&self, mint: &str) -> Result<Vec<PoolRecord>>;
}

#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    msg: Option<String>,
    data: Option<PoolPage>,
}

#[derive(Debug, Deserialize)]
struct PoolPage {
    #[serde(default)]
    data: Vec<RaydiumPool>,
}

#[derive(Debug, Deserialize)]
struct MintInfo {
    address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RaydiumPool {
    id: String,
    mint_a: MintInfo,
    mint_b: MintInfo,
    #[serde(default)]
    mint_amount_a: f64,
    #[serde(default)]
    mint_amount_b: f64,
    #[serde(default)]
    open_time: serde_json::Value,
    #[serde(default)]
    status: Option<u8>,
    #[serde(default)]
    lp_amount: f64,
    #[serde(default)]
    tvl: Option<f64>,
}

impl From<RaydiumPool> for PoolRecord {
    fn from(pool: RaydiumPool) -> Self {
        // openTime arrives as a string in v3 and a number in older payloads
        let open_time = match &pool.open_time {
            serde_json::Value::String(s) => s.parse().unwrap_or(0),
            serde_json::Value::Number(n) => n.as_i64().unwrap_or(0),
            _ => 0,
        };

        PoolRecord {
            address: pool.id,
            mint_a: pool.mint_a.address,
            mint_b: pool.mint_b.address,
            amount_a: pool.mint_amount_a,
            amount_b: pool.mint_amount_b,
            open_time,
            status: pool.status,
            lp_supply: pool.lp_amount,
            tvl_usd: pool.tvl,
        }
    }
}

pub struct RaydiumRegistry {
    base_url: String,
    client: Client,
}

impl RaydiumRegistry {
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
}

#[async_trait]
impl AmmRegistry for RaydiumRegistry {
    async fn pools_for_mint(&self, mint: &str) -> Result<Vec<PoolRecord>> {
        let url = format!("{}/pools/info/mint", self.base_url);
        debug!(mint = %mint, "Querying AMM registry");

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("mint1", mint),
                ("poolType", "standard"),
                ("poolSortField", "liquidity"),
                ("sortType", "desc"),
                ("pageSize", "20"),
                ("page", "1"),
            ])
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = resp.text().await?;
        if !(200..300).contains(&status) {
            return Err(classify_http("raydium-registry", status, &body));
        }

        let envelope: Envelope = serde_json::from_str(&body)
            .map_err(|e| Error::Deserialization(format!("raydium pools: {}", e)))?;
        if !envelope.success {
            return Err(Error::Upstream {
                service: format!(
                    "raydium-registry ({})",
                    envelope.msg.unwrap_or_else(|| "no message".to_string())
                ),
                status,
            });
        }

        Ok(parse_pools(envelope.data))
    }
}

fn parse_pools(page: Option<PoolPage>) -> Vec<PoolRecord> {
    page.map(|p| p.data.into_iter().map(PoolRecord::from).collect())
        .unwrap_or_default()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_v3_page() {
        let json = r#"{
            "id": "req",
            "success": true,
            "data": {
                "count": 1,
                "data": [{
                    "type": "Standard",
                    "programId": "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8",
                    "id": "PoolA",
                    "mintA": {"address": "So11111111111111111111111111111111111111112", "decimals": 9},
                    "mintB": {"address": "MintX", "decimals": 6},
                    "price": 0.0001,
                    "mintAmountA": 42.5,
                    "mintAmountB": 425000.0,
                    "openTime": "1700000000",
                    "tvl": 12000.5,
                    "lpAmount": 1500.25
                }]
            }
        }"#;
        let envelope: Envelope = serde_json::from_str(json).unwrap();
        assert!(envelope.success);
        let pools = parse_pools(envelope.data);
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].address, "PoolA");
        assert_eq!(pools[0].open_time, 1_700_000_000);
        assert_eq!(pools[0].amount_a, 42.5);
        assert_eq!(pools[0].lp_supply, 1500.25);
        assert_eq!(pools[0].status, None);
    }

    #[test]
    fn test_numeric_open_time() {
        let json = r#"{"id": "P", "mintA": {"address": "A"}, "mintB": {"address": "B"}, "openTime": 5}"#;
        let pool: RaydiumPool = serde_json::from_str(json).unwrap();
        assert_eq!(PoolRecord::from(pool).open_time, 5);
    }
}
