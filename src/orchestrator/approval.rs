//! Approval gate
//!
//! Promotes a discovered candidate to an [`ApprovedToken`] once it passes
//! the name filter, the tradability pipeline and the risk assessor, in that
//! order, cheapest first.

use std::sync::Arc;
use tracing::debug;

use crate::activity::{ActivityCategory, ActivityEntry, ActivityLevel, ActivityLog};
use crate::candidate::{CandidateToken, TokenStage};
use crate::filter::{FilterResult, TokenFilter};
use crate::risk::{RiskAssessment, RiskAssessor};
use crate::tradability::{apply_verdict, TradabilityPipeline, Verdict};

/// A candidate cleared for the orchestrator
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovedToken {
    pub candidate: CandidateToken,
    pub verdict: Verdict,
    pub risk: RiskAssessment,
}

impl ApprovedToken {
    pub fn mint(&self) -> &str {
        &self.candidate.address
    }

    pub fn stage(&self) -> Option<TokenStage> {
        self.verdict.stage()
    }
}

/// Which check turned a candidate away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectedBy {
    Filter,
    Tradability,
    Risk,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Approval {
    Approved(Box<ApprovedToken>),
    Rejected {
        by: RejectedBy,
        /// Pool not ready or a service was down; worth checking again later
        waiting: bool,
        reason: String,
    },
}

impl Approval {
    pub fn is_approved(&self) -> bool {
        matches!(self, Approval::Approved(_))
    }
}

pub struct ApprovalGate {
    filter: TokenFilter,
    pipeline: Arc<TradabilityPipeline>,
    risk: Arc<RiskAssessor>,
    activity: ActivityLog,
}

impl ApprovalGate {
    pub fn new(
        filter: TokenFilter,
        pipeline: Arc<TradabilityPipeline>,
        risk: Arc<RiskAssessor>,
        activity: ActivityLog,
    ) -> Self {
        Self {
            filter,
            pipeline,
            risk,
            activity,
        }
    }

    pub async fn review(&self, mut candidate: CandidateToken) -> Approval {
        if let FilterResult::Filtered(reason) = self.filter.filter(&candidate) {
            return self.reject(&candidate, RejectedBy::Filter, false, reason.to_string());
        }

        let verdict = self.pipeline.check(&candidate).await;
        apply_verdict(&mut candidate, &verdict);
        if let Verdict::Discarded { waiting, reason } = &verdict {
            return self.reject(&candidate, RejectedBy::Tradability, *waiting, reason.clone());
        }

        let risk = self.risk.assess(&candidate.address).await;
        candidate.risk_score = Some(risk.overall_score);
        if !risk.passed {
            return self.reject(&candidate, RejectedBy::Risk, false, risk.summary());
        }

        debug!(mint = %candidate.address, stage = ?verdict.stage(), "Candidate approved");
        self.activity.publish(
            ActivityEntry::new(
                ActivityLevel::Success,
                ActivityCategory::Queue,
                format!(
                    "{} approved ({}, risk {})",
                    candidate.display_symbol(),
                    verdict.stage().map(|s| s.to_string()).unwrap_or_default(),
                    risk.overall_score
                ),
            )
            .token(candidate.display_symbol(), candidate.address.clone()),
        );

        Approval::Approved(Box::new(ApprovedToken {
            candidate,
            verdict,
            risk,
        }))
    }

    /// Review a batch, returning only the approved tokens
    pub async fn review_all(&self, candidates: Vec<CandidateToken>) -> Vec<ApprovedToken> {
        let mut approved = Vec::new();
        for candidate in candidates {
            if let Approval::Approved(token) = self.review(candidate).await {
                approved.push(*token);
            }
        }
        approved
    }

    fn reject(&self, candidate: &CandidateToken, by: RejectedBy, waiting: bool, reason: String) -> Approval {
        let category = match by {
            RejectedBy::Risk => ActivityCategory::Risk,
            RejectedBy::Filter | RejectedBy::Tradability => ActivityCategory::Pipeline,
        };
        self.activity.publish(
            ActivityEntry::new(
                ActivityLevel::Info,
                category,
                format!("{} rejected: {}", candidate.display_symbol(), reason),
            )
            .token(candidate.display_symbol(), candidate.address.clone()),
        );
        Approval::Rejected { by, waiting, reason }
    }
}
