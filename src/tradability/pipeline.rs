//! Tradability pipeline
//!
//! Drives [`machine::transition`](super::machine::transition) by performing
//! the I/O each state calls for: bonding-curve lookup, pool validation,
//! route probe and pair enrichment. Each stage's result is reported to the
//! observer, in order, before the next stage starts.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::enricher::PairEnricher;
use super::machine::{transition, Context, Input, State};
use super::pool_validator::PoolValidator;
use super::route_prover::RouteProver;
use super::types::{PipelineEvent, Verdict, Verification};
use crate::activity::{ActivityCategory, ActivityEntry, ActivityLevel, ActivityLog};
use crate::candidate::{short_mint, CandidateToken};
use crate::config::TradabilityConfig;
use crate::pump::{BondingCurveSource, CurveStatus};

/// Synchronous stage-completion callback
pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, mint: &str, event: &PipelineEvent);
}

/// Which discovery sources may fall back to an unverified verdict when the
/// registry is down
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrustPolicy {
    pub trusted_sources: Vec<String>,
    pub min_liquidity_sol: f64,
}

impl TrustPolicy {
    pub fn from_config(config: &TradabilityConfig) -> Self {
        Self {
            trusted_sources: config.trusted_sources.clone(),
            min_liquidity_sol: config.trusted_source_min_liquidity_sol,
        }
    }

    pub fn admits(&self, candidate: &CandidateToken) -> bool {
        !candidate.source.is_empty()
            && self
                .trusted_sources
                .iter()
                .any(|s| s.eq_ignore_ascii_case(&candidate.source))
            && candidate.liquidity >= self.min_liquidity_sol
    }
}

pub struct TradabilityPipeline {
    curves: Arc<dyn BondingCurveSource>,
    validator: PoolValidator,
    prover: RouteProver,
    enricher: PairEnricher,
    trust: TrustPolicy,
    bonding_timeout: Duration,
    observer: Option<Arc<dyn PipelineObserver>>,
    activity: ActivityLog,
}

impl TradabilityPipeline {
    pub fn new(
        curves: Arc<dyn BondingCurveSource>,
        validator: PoolValidator,
        prover: RouteProver,
        enricher: PairEnricher,
        trust: TrustPolicy,
        bonding_timeout: Duration,
        activity: ActivityLog,
    ) -> Self {
        Self {
            curves,
            validator,
            prover,
            enricher,
            trust,
            bonding_timeout,
            observer: None,
            activity,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Check a bare mint with no discovery context
    pub async fn check_mint(&self, mint: &str) -> Verdict {
        self.check(&CandidateToken::new(mint, "")).await
    }

    pub async fn check(&self, candidate: &CandidateToken) -> Verdict {
        let mint = candidate.address.as_str();
        let ctx = Context {
            trusted: self.trust.admits(candidate),
            candidate_liquidity_sol: candidate.liquidity,
        };

        let mut state = State::Start;
        let verdict = loop {
            debug!(mint = %mint, state = state.name(), "Pipeline step");
            let (input, event) = match &state {
                State::Start => {
                    let curve = self.curve_status(mint).await;
                    let still_bonding = matches!(curve, Ok(CurveStatus::Bonding { .. }));
                    (Input::Curve(curve), PipelineEvent::BondingChecked { still_bonding })
                }
                State::PoolCheck => {
                    let check = self.validator.validate(mint).await;
                    (Input::Pool(check.clone()), PipelineEvent::PoolChecked(check))
                }
                State::SwapCheck { .. } => {
                    let probe = self.prover.prove(mint).await;
                    (Input::Route(probe.clone()), PipelineEvent::RouteProbed(probe))
                }
                State::Enrich { pool, .. } => {
                    // Only ever keyed by the validated pool address
                    let enrichment = self.enricher.enrich(&pool.address).await;
                    (Input::Enriched(enrichment.clone()), PipelineEvent::Enriched(enrichment))
                }
                State::Done(verdict) => break verdict.clone(),
            };

            self.emit(mint, &event);
            state = transition(state, input, &ctx);
        };

        self.emit(mint, &PipelineEvent::Finished(verdict.clone()));
        self.report(candidate, &verdict);
        verdict
    }

    async fn curve_status(&self, mint: &str) -> std::result::Result<CurveStatus, String> {
        match tokio::time::timeout(self.bonding_timeout, self.curves.curve_status(mint)).await {
            Ok(Ok(status)) => Ok(status),
            Ok(Err(e)) => {
                debug!(mint = %mint, "Bonding curve lookup failed: {}", e);
                Err(e.short_reason())
            }
            Err(_) => Err("bonding curve lookup timed out".to_string()),
        }
    }

    fn emit(&self, mint: &str, event: &PipelineEvent) {
        if let Some(observer) = &self.observer {
            observer.on_event(mint, event);
        }
    }

    fn report(&self, candidate: &CandidateToken, verdict: &Verdict) {
        let symbol = candidate.display_symbol();
        let (level, message) = match verdict {
            Verdict::Tradable {
                stage,
                verification: Verification::UnverifiedTrustedSource,
                ..
            } => (
                ActivityLevel::Warning,
                format!("{} TRADABLE ({}) unverified: {}", symbol, stage, verdict.reason()),
            ),
            Verdict::Tradable { stage, .. } => (
                ActivityLevel::Success,
                format!("{} TRADABLE ({}): {}", symbol, stage, verdict.reason()),
            ),
            Verdict::Discarded { .. } => (
                ActivityLevel::Info,
                format!("{} DISCARDED: {}", symbol, verdict.reason()),
            ),
        };

        info!(mint = %short_mint(&candidate.address), "{}", message);
        self.activity.publish(
            ActivityEntry::new(level, ActivityCategory::Pipeline, message)
                .token(symbol, candidate.address.clone()),
        );
    }
}

/// Copy a verdict's outcome onto the candidate
pub fn apply_verdict(candidate: &mut CandidateToken, verdict: &Verdict) {
    let tradable = verdict.is_tradable();
    candidate.is_tradeable = tradable;
    candidate.can_buy = tradable;
    candidate.can_sell = tradable;
    candidate.stage = verdict.stage();
    if let Verdict::Tradable {
        liquidity_sol: Some(liquidity),
        verification: Verification::Verified,
        ..
    } = verdict
    {
        candidate.liquidity = *liquidity;
    }
}


#[cfg(test)]
mod tests {
    use super::testkit::pipeline;
    use super::*;
    use crate::candidate::TokenStage;
    use crate::pump::curve::mock::MockCurveSource;
    use crate::pump::BondingCurve;
    use crate::tradability::enricher::mock::{Behaviour, MockIndexer};
    use crate::tradability::pool_validator::fixtures::sol_pool;
    use crate::tradability::registry::mock::MockRegistry;
    use crate::trading::venue::mock::MockVenue;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    const MINT: &str = "MintX";

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl PipelineObserver for Recorder {
        fn on_event(&self, _mint: &str, event: &PipelineEvent) {
            let name = match event {
                PipelineEvent::BondingChecked { .. } => "bonding",
                PipelineEvent::PoolChecked(_) => "pool",
                PipelineEvent::RouteProbed(_) => "route",
                PipelineEvent::Enriched(_) => "enrich",
                PipelineEvent::Finished(_) => "finished",
            };
            self.events.lock().unwrap().push(name.to_string());
        }
    }

    fn quotes() -> Vec<Arc<dyn crate::trading::venue::SwapVenue>> {
        vec![
            Arc::new(MockVenue::always("jupiter", 1_000)),
            Arc::new(MockVenue::always("jupiter-fallback", 1_000)),
        ]
    }

    #[tokio::test]
    async fn test_events_fire_in_stage_order() {
        let recorder = Arc::new(Recorder::default());
        let pipeline = pipeline(
            Arc::new(MockCurveSource::default()),
            Arc::new(MockRegistry::with_pools(vec![sol_pool("PoolA", MINT, 60.0)])),
            quotes(),
            Arc::new(MockIndexer::new(Behaviour::Found)),
            TrustPolicy::default(),
        )
        .with_observer(recorder.clone());

        let verdict = pipeline.check_mint(MINT).await;
        assert_eq!(verdict.stage(), Some(TokenStage::Listed));
        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec!["bonding", "pool", "route", "enrich", "finished"]
        );
    }

    #[tokio::test]
    async fn test_observer_does_not_change_outcome() {
        let build = || {
            pipeline(
                Arc::new(MockCurveSource::default()),
                Arc::new(MockRegistry::with_pools(vec![sol_pool("PoolA", MINT, 60.0)])),
                quotes(),
                Arc::new(MockIndexer::new(Behaviour::Missing)),
                TrustPolicy::default(),
            )
        };
        let plain = build().check_mint(MINT).await;
        let observed = build()
            .with_observer(Arc::new(Recorder::default()))
            .check_mint(MINT)
            .await;
        assert_eq!(plain, observed);
        assert_eq!(plain.stage(), Some(TokenStage::Indexing));
    }

    #[tokio::test]
    async fn test_bonding_token_skips_pool_checks() {
        let curve = BondingCurve::new_for_test(30_000_000_000, 1_073_000_000_000_000, 793_100_000_000_000, false);
        let registry = Arc::new(MockRegistry::with_pools(vec![]));
        let pipeline = pipeline(
            Arc::new(MockCurveSource::with_curve(MINT, curve)),
            registry.clone(),
            quotes(),
            Arc::new(MockIndexer::new(Behaviour::Found)),
            TrustPolicy::default(),
        );

        let verdict = pipeline.check_mint(MINT).await;
        assert_eq!(verdict.stage(), Some(TokenStage::Bonding));
        assert_eq!(registry.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_indexer_never_queried_for_untradable_pool() {
        let indexer = Arc::new(MockIndexer::new(Behaviour::Found));
        let pipeline = pipeline(
            Arc::new(MockCurveSource::default()),
            Arc::new(MockRegistry::with_pools(vec![sol_pool("Thin", MINT, 2.0)])),
            quotes(),
            indexer.clone(),
            TrustPolicy::default(),
        );

        let verdict = pipeline.check_mint(MINT).await;
        assert!(!verdict.is_tradable());
        assert_eq!(indexer.calls(), 0);
    }

    #[tokio::test]
    async fn test_indexer_keyed_by_pool_not_mint() {
        let indexer = Arc::new(MockIndexer::new(Behaviour::Found));
        let pipeline = pipeline(
            Arc::new(MockCurveSource::default()),
            Arc::new(MockRegistry::with_pools(vec![sol_pool("PoolA", MINT, 60.0)])),
            quotes(),
            indexer.clone(),
            TrustPolicy::default(),
        );

        pipeline.check_mint(MINT).await;
        assert_eq!(*indexer.queried.lock().unwrap(), vec!["PoolA".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_indexer_does_not_block_verdict() {
        let pipeline = pipeline(
            Arc::new(MockCurveSource::default()),
            Arc::new(MockRegistry::with_pools(vec![sol_pool("PoolA", MINT, 60.0)])),
            quotes(),
            Arc::new(MockIndexer::new(Behaviour::Hang)),
            TrustPolicy::default(),
        );

        let started = tokio::time::Instant::now();
        let verdict = pipeline.check_mint(MINT).await;
        assert!(verdict.is_tradable());
        assert_eq!(verdict.stage(), Some(TokenStage::LpLive));
        // Pool and route mocks answer instantly; the only wait is enrichment
        assert!(started.elapsed() <= Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_trust_fallback_when_registry_down() {
        let trust = TrustPolicy {
            trusted_sources: vec!["raydium_new_pools".into()],
            min_liquidity_sol: 50.0,
        };
        let pipeline = pipeline(
            Arc::new(MockCurveSource::default()),
            Arc::new(MockRegistry::down()),
            quotes(),
            Arc::new(MockIndexer::new(Behaviour::Found)),
            trust,
        );

        let mut candidate = CandidateToken::new(MINT, "X");
        candidate.source = "raydium_new_pools".into();
        candidate.liquidity = 75.0;
        let verdict = pipeline.check(&candidate).await;
        assert!(verdict.is_tradable());
        assert!(!verdict.is_verified());

        candidate.liquidity = 10.0;
        let verdict = pipeline.check(&candidate).await;
        assert!(!verdict.is_tradable());
        assert!(verdict.reason().contains("registry unavailable"));
    }

    #[test]
    fn test_apply_verdict() {
        let mut candidate = CandidateToken::new(MINT, "X");
        apply_verdict(
            &mut candidate,
            &Verdict::Tradable {
                stage: TokenStage::LpLive,
                verification: Verification::Verified,
                pool_address: Some("PoolA".into()),
                liquidity_sol: Some(33.0),
                pair: None,
                reason: "ok".into(),
            },
        );
        assert!(candidate.can_buy && candidate.can_sell && candidate.is_tradeable);
        assert_eq!(candidate.stage, Some(TokenStage::LpLive));
        assert_eq!(candidate.liquidity, 33.0);

        apply_verdict(
            &mut candidate,
            &Verdict::Discarded {
                waiting: false,
                reason: "no pool".into(),
            },
        );
        assert!(!candidate.can_buy);
        assert_eq!(candidate.stage, None);
    }
}
