//! Risk assessor
//!
//! Queries the safety-report service with a timeout and scores the result
//! against [`RiskFilters`]. An unreachable service yields a mid-range
//! unverified assessment; the caller decides whether that is tolerable.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{RiskFilters, SafetyReport, SafetyReportSource};
use crate::activity::{ActivityCategory, ActivityEntry, ActivityLevel, ActivityLog};
use crate::candidate::short_mint;
use crate::config::RiskConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub overall_score: u32,
    pub is_rug_pull: bool,
    pub is_honeypot: bool,
    pub has_mint_authority: bool,
    pub has_freeze_authority: bool,
    pub holder_count: Option<u32>,
    pub top_holder_percent: Option<f64>,
    pub passed: bool,
    pub reasons: Vec<String>,
    /// False when the report could not be fetched
    pub verified: bool,
}

impl RiskAssessment {
    /// Score a report against the filters
    pub fn evaluate(report: &SafetyReport, filters: &RiskFilters) -> Self {
        let mut reasons = Vec::new();

        if report.score > filters.max_risk_score {
            reasons.push(format!(
                "risk score {} exceeds max {}",
                report.score, filters.max_risk_score
            ));
        }
        if filters.check_rug_pull && report.rugged {
            reasons.push("flagged as rug pull".to_string());
        }
        if filters.check_honeypot && report.honeypot {
            reasons.push("honeypot signal".to_string());
        }
        if filters.check_mint_authority && report.mint_authority {
            reasons.push("mint authority not revoked".to_string());
        }
        if filters.check_freeze_authority && report.freeze_authority {
            reasons.push("freeze authority not revoked".to_string());
        }
        if filters.min_holders > 0 {
            match report.holder_count {
                Some(count) if count < filters.min_holders => reasons.push(format!(
                    "{} holders, need {}",
                    count, filters.min_holders
                )),
                Some(_) => {}
                None => debug!("Holder count unknown, skipping min holder check"),
            }
        }
        if let Some(pct) = report.top_holder_pct {
            if pct > filters.max_ownership_pct {
                reasons.push(format!(
                    "top holder owns {:.1}% (max {:.1}%)",
                    pct, filters.max_ownership_pct
                ));
            }
        }

        Self {
            overall_score: report.score,
            is_rug_pull: report.rugged,
            is_honeypot: report.honeypot,
            has_mint_authority: report.mint_authority,
            has_freeze_authority: report.freeze_authority,
            holder_count: report.holder_count,
            top_holder_percent: report.top_holder_pct,
            passed: reasons.is_empty(),
            reasons,
            verified: true,
        }
    }

    /// Conservative assessment used when the report is unavailable
    pub fn unverified(score: u32, filters: &RiskFilters, cause: &str) -> Self {
        let mut reasons = vec![format!("could not verify: {}", cause)];
        if score > filters.max_risk_score {
            reasons.push(format!(
                "risk score {} exceeds max {}",
                score, filters.max_risk_score
            ));
        }

        Self {
            overall_score: score,
            is_rug_pull: false,
            is_honeypot: false,
            has_mint_authority: false,
            has_freeze_authority: false,
            holder_count: None,
            top_holder_percent: None,
            passed: score <= filters.max_risk_score,
            reasons,
            verified: false,
        }
    }

    /// Pass-through used when risk checks are turned off
    pub fn skipped() -> Self {
        Self {
            overall_score: 0,
            is_rug_pull: false,
            is_honeypot: false,
            has_mint_authority: false,
            has_freeze_authority: false,
            holder_count: None,
            top_holder_percent: None,
            passed: true,
            reasons: vec!["risk checks disabled".to_string()],
            verified: false,
        }
    }

    pub fn summary(&self) -> String {
        if self.reasons.is_empty() {
            format!("score {}", self.overall_score)
        } else {
            format!("score {} ({})", self.overall_score, self.reasons.join("; "))
        }
    }
}

pub struct RiskAssessor {
    source: Arc<dyn SafetyReportSource>,
    filters: RiskFilters,
    enabled: bool,
    timeout: Duration,
    unverified_score: u32,
    activity: ActivityLog,
}

impl RiskAssessor {
    pub fn new(source: Arc<dyn SafetyReportSource>, config: &RiskConfig, activity: ActivityLog) -> Self {
        Self {
            source,
            filters: RiskFilters::from_config(config),
            enabled: config.enabled,
            timeout: Duration::from_millis(config.timeout_ms),
            unverified_score: config.unverified_score,
            activity,
        }
    }

    pub fn filters(&self) -> &RiskFilters {
        &self.filters
    }

    /// Assess with the assessor's own filters
    pub async fn assess(&self, mint: &str) -> RiskAssessment {
        self.assess_with(mint, &self.filters).await
    }

    /// Assess against an explicit filter snapshot
    pub async fn assess_with(&self, mint: &str, filters: &RiskFilters) -> RiskAssessment {
        if !self.enabled {
            return RiskAssessment::skipped();
        }

        let assessment = match tokio::time::timeout(self.timeout, self.source.report(mint)).await {
            Ok(Ok(report)) => RiskAssessment::evaluate(&report, filters),
            Ok(Err(e)) => {
                warn!(mint = %mint, "Safety report unavailable: {}", e);
                RiskAssessment::unverified(self.unverified_score, filters, &e.short_reason())
            }
            Err(_) => {
                warn!(mint = %mint, timeout_ms = self.timeout.as_millis() as u64, "Safety report timed out");
                RiskAssessment::unverified(self.unverified_score, filters, "safety report timed out")
            }
        };

        let level = if assessment.passed {
            ActivityLevel::Info
        } else {
            ActivityLevel::Warning
        };
        self.activity.publish(
            ActivityEntry::new(
                level,
                ActivityCategory::Risk,
                format!(
                    "{} risk {}: {}",
                    short_mint(mint),
                    if assessment.passed { "passed" } else { "failed" },
                    assessment.summary()
                ),
            )
            .token("", mint)
            .details(serde_json::json!({
                "score": assessment.overall_score,
                "verified": assessment.verified,
            })),
        );

        assessment
    }
}
