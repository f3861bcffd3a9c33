//! RugCheck safety-report client
//!
//! `GET {base}/v1/tokens/{mint}/report`, normalized into a [`SafetyReport`].

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{SafetyReport, SafetyReportSource};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RugCheckReport {
    #[serde(default)]
    pub token: Option<RugCheckToken>,
    #[serde(default)]
    pub top_holders: Option<Vec<RugCheckHolder>>,
    #[serde(default)]
    pub risks: Option<Vec<RugCheckRisk>>,
    #[serde(default, rename = "score_normalised")]
    pub score_normalised: Option<f64>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub rugged: bool,
    #[serde(default)]
    pub total_holders: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RugCheckToken {
    pub mint_authority: Option<String>,
    pub freeze_authority: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RugCheckHolder {
    #[serde(default)]
    pub pct: f64,
    #[serde(default)]
    pub insider: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RugCheckRisk {
    pub name: String,
    #[serde(default)]
    pub level: String,
}

impl RugCheckReport {
    pub fn into_report(self) -> SafetyReport {
        let risks = self.risks.unwrap_or_default();
        let honeypot = risks.iter().any(|r| {
            let name = r.name.to_ascii_lowercase();
            r.level == "danger" && (name.contains("honeypot") || name.contains("cannot sell"))
        });

        let top_holder_pct = self.top_holders.as_ref().and_then(|holders| {
            holders
                .iter()
                .map(|h| h.pct)
                .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |a| a.max(p))))
        });

        // Normalized score is 0-100; the raw score is unbounded
        let score = self
            .score_normalised
            .or(self.score.map(|s| s.min(100.0)))
            .unwrap_or(0.0)
            .clamp(0.0, 100.0)
            .round() as u32;

        let (mint_authority, freeze_authority) = match &self.token {
            Some(t) => (t.mint_authority.is_some(), t.freeze_authority.is_some()),
            None => (false, false),
        };

        SafetyReport {
            score,
            rugged: self.rugged,
            honeypot,
            mint_authority,
            freeze_authority,
            holder_count: self.total_holders,
            top_holder_pct,
            risk_names: risks.into_iter().map(|r| r.name).collect(),
        }
    }
}

pub struct RugCheckClient {
    base_url: String,
    client: Client,
}

impl RugCheckClient {
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
impl SafetyReportSource for RugCheckClient {
    async fn report(&self, mint: &str) -> Result<SafetyReport> {
        let url = format!("{}/v1/tokens/{}/report", self.base_url, mint);
        debug!(mint = %mint, "Fetching safety report");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status.as_u16() == 429 {
            return Err(Error::RateLimited("rugcheck".to_string()));
        }
        if !status.is_success() {
            return Err(Error::Upstream {
                service: "rugcheck".to_string(),
                status: status.as_u16(),
            });
        }

        let report: RugCheckReport = response
            .json()
            .await
            .map_err(|e| Error::Deserialization(format!("rugcheck report: {}", e)))?;

        Ok(report.into_report())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_normalization() {
        let json = r#"{
            "mint": "MintX",
            "token": {"mintAuthority": null, "freezeAuthority": "Auth111", "supply": 1000, "decimals": 6},
            "topHolders": [{"address": "a", "pct": 12.5, "insider": false}, {"address": "b", "pct": 40.1, "insider": true}],
            "risks": [{"name": "Honeypot detected", "level": "danger", "score": 5000}, {"name": "Low liquidity", "level": "warn"}],
            "score": 12000,
            "score_normalised": 67,
            "rugged": false,
            "totalHolders": 321
        }"#;

        let report: RugCheckReport = serde_json::from_str(json).unwrap();
        let report = report.into_report();
        assert_eq!(report.score, 67);
        assert!(report.honeypot);
        assert!(!report.mint_authority);
        assert!(report.freeze_authority);
        assert_eq!(report.holder_count, Some(321));
        assert_eq!(report.top_holder_pct, Some(40.1));
    }

    #[test]
    fn test_sparse_report() {
        let report: RugCheckReport = serde_json::from_str(r#"{"rugged": true}"#).unwrap();
        let report = report.into_report();
        assert!(report.rugged);
        assert_eq!(report.holder_count, None);
        assert_eq!(report.top_holder_pct, None);
        assert_eq!(report.score, 0);
    }
}
