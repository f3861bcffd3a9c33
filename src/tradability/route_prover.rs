//! Swap-route prover
//!
//! Asks the quote backends for a tiny SOL -> token quote. A non-zero output
//! from any backend proves a route. Only a definitive no-route answer counts
//! as a negative; rate limits and server errors are retried and then
//! reported as unproven. A backend that times out is not asked again, the
//! next one is tried at once.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::types::RouteProbe;
use crate::config::TradabilityConfig;
use crate::error::Error;
use crate::trading::params::sol_to_lamports;
use crate::trading::venue::{QuoteRequest, SwapVenue};

#[derive(Debug, Clone, PartialEq)]
pub struct ProverSettings {
    pub probe_lamports: u64,
    pub slippage_bps: u16,
    pub backend_timeout: Duration,
    /// Wall-clock budget for the whole probe
    pub budget: Duration,
    pub attempts_per_backend: u32,
}

impl ProverSettings {
    pub fn from_config(config: &TradabilityConfig) -> Self {
        Self {
            probe_lamports: sol_to_lamports(config.probe_amount_sol),
            slippage_bps: (config.probe_slippage_pct * 100.0).round().clamp(1.0, 10_000.0) as u16,
            backend_timeout: Duration::from_millis(config.backend_timeout_ms),
            budget: Duration::from_millis(config.prover_budget_ms),
            attempts_per_backend: 2,
        }
    }
}

pub struct RouteProver {
    backends: Vec<Arc<dyn SwapVenue>>,
    settings: ProverSettings,
}

enum BackendAnswer {
    Route { out_amount: u64, price_impact_pct: Option<f64> },
    NoRoute(String),
    Transient(String),
}

impl RouteProver {
    pub fn new(backends: Vec<Arc<dyn SwapVenue>>, settings: ProverSettings) -> Self {
        Self { backends, settings }
    }

    pub async fn prove(&self, mint: &str) -> RouteProbe {
        if self.backends.is_empty() {
            return RouteProbe::Unavailable {
                reason: "no quote backends configured".to_string(),
            };
        }

        match tokio::time::timeout(self.settings.budget, self.probe_backends(mint)).await {
            Ok(probe) => probe,
            Err(_) => {
                warn!(mint = %mint, budget_ms = self.settings.budget.as_millis() as u64, "Route probe over budget");
                RouteProbe::Unavailable {
                    reason: "route probe timed out".to_string(),
                }
            }
        }
    }

    async fn probe_backends(&self, mint: &str) -> RouteProbe {
        let request = QuoteRequest::buy(mint, self.settings.probe_lamports, self.settings.slippage_bps);
        let mut no_route: Option<String> = None;
        let mut transient: Vec<String> = Vec::new();

        for backend in &self.backends {
            match self.ask(backend.as_ref(), &request).await {
                BackendAnswer::Route {
                    out_amount,
                    price_impact_pct,
                } => {
                    return RouteProbe::Routable {
                        venue: backend.id().to_string(),
                        out_amount,
                        price_impact_pct,
                    }
                }
                BackendAnswer::NoRoute(reason) => {
                    no_route.get_or_insert(reason);
                }
                BackendAnswer::Transient(reason) => transient.push(reason),
            }
        }

        match no_route {
            Some(reason) => RouteProbe::NoRoute { reason },
            None => RouteProbe::Unavailable {
                reason: transient.join("; "),
            },
        }
    }

    /// One backend, retrying rate limits and server errors with backoff
    async fn ask(&self, backend: &dyn SwapVenue, request: &QuoteRequest) -> BackendAnswer {
        let mut backoff = ExponentialBackoff {
            initial_interval: Duration::from_secs(1),
            current_interval: Duration::from_secs(1),
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_interval: Duration::from_secs(4),
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        };

        let mut last = String::new();
        for attempt in 1..=self.settings.attempts_per_backend.max(1) {
            let quote = tokio::time::timeout(self.settings.backend_timeout, backend.quote(request)).await;
            match quote {
                Ok(Ok(q)) if q.out_amount > 0 => {
                    debug!(venue = backend.id(), out = q.out_amount, "Route proven");
                    return BackendAnswer::Route {
                        out_amount: q.out_amount,
                        price_impact_pct: q.price_impact_pct,
                    };
                }
                Ok(Ok(_)) => {
                    return BackendAnswer::NoRoute(format!("{}: zero output", backend.id()));
                }
                Ok(Err(e)) if e.is_route_class() => {
                    return BackendAnswer::NoRoute(e.short_reason());
                }
                Ok(Err(e)) => {
                    last = e.short_reason();
                    if !e.is_retryable() {
                        break;
                    }
                }
                Err(_) => {
                    last = Error::Timeout(format!("{} quote", backend.id())).to_string();
                    debug!(venue = backend.id(), attempt, "Quote backend timed out");
                    break;
                }
            }

            debug!(venue = backend.id(), attempt, "Quote backend unavailable: {}", last);
            if attempt < self.settings.attempts_per_backend {
                if let Some(delay) = backoff.next_backoff() {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        BackendAnswer::Transient(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trading::venue::mock::MockVenue;

    fn settings() -> ProverSettings {
        ProverSettings::from_config(&TradabilityConfig::default())
    }

    #[test]
    fn test_probe_settings() {
        let s = settings();
        assert_eq!(s.probe_lamports, 1_000_000);
        assert_eq!(s.slippage_bps, 1500);
        assert_eq!(s.backend_timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_primary_route() {
        let primary = Arc::new(MockVenue::always("jupiter", 123_456));
        let prover = RouteProver::new(vec![primary.clone()], settings());
        let probe = prover.prove("MintX").await;
        assert_eq!(
            probe,
            RouteProbe::Routable {
                venue: "jupiter".into(),
                out_amount: 123_456,
                price_impact_pct: Some(0.5),
            }
        );
        let request = primary.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.amount, 1_000_000);
        assert_eq!(request.slippage_bps, 1500);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_errors_fall_back() {
        let primary = Arc::new(MockVenue::new(
            "jupiter",
            vec![Err(Error::Upstream { service: "jupiter".into(), status: 503 })],
        ));
        let fallback = Arc::new(MockVenue::always("jupiter-fallback", 99));
        let prover = RouteProver::new(vec![primary.clone(), fallback], settings());

        let probe = prover.prove("MintX").await;
        assert!(probe.is_routable());
        assert_eq!(primary.quotes(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_retried_then_succeeds() {
        let primary = Arc::new(MockVenue::new(
            "jupiter",
            vec![Err(Error::RateLimited("jupiter".into())), Ok(500)],
        ));
        let prover = RouteProver::new(vec![primary.clone()], settings());
        assert!(prover.prove("MintX").await.is_routable());
        assert_eq!(primary.quotes(), 2);
    }

    #[tokio::test]
    async fn test_definitive_no_route() {
        let prover = RouteProver::new(
            vec![
                Arc::new(MockVenue::no_route("jupiter")),
                Arc::new(MockVenue::no_route("jupiter-fallback")),
            ],
            settings(),
        );
        assert!(matches!(prover.prove("MintX").await, RouteProbe::NoRoute { .. }));
    }

    #[tokio::test]
    async fn test_zero_output_is_no_route() {
        let prover = RouteProver::new(vec![Arc::new(MockVenue::always("jupiter", 0))], settings());
        assert!(matches!(prover.prove("MintX").await, RouteProbe::NoRoute { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_everywhere_is_unproven() {
        let prover = RouteProver::new(
            vec![Arc::new(MockVenue::new(
                "jupiter",
                vec![Err(Error::Upstream { service: "jupiter".into(), status: 502 })],
            ))],
            settings(),
        );
        assert!(matches!(prover.prove("MintX").await, RouteProbe::Unavailable { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_primary_falls_through_to_fallback() {
        let primary = Arc::new(MockVenue::always("jupiter", 1).with_delay(Duration::from_secs(600)));
        let fallback = Arc::new(MockVenue::always("jupiter-fallback", 777));
        let prover = RouteProver::new(vec![primary.clone(), fallback.clone()], settings());

        let started = tokio::time::Instant::now();
        let probe = prover.prove("MintX").await;
        assert_eq!(
            probe,
            RouteProbe::Routable {
                venue: "jupiter-fallback".into(),
                out_amount: 777,
                price_impact_pct: Some(0.5),
            }
        );
        // Timed out once, never retried
        assert_eq!(primary.quotes(), 1);
        assert_eq!(fallback.quotes(), 1);
        assert!(started.elapsed() < Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_caps_hanging_backends() {
        let slow = Arc::new(MockVenue::always("jupiter", 1).with_delay(Duration::from_secs(600)));
        let slow_fallback = Arc::new(MockVenue::always("jupiter-fallback", 1).with_delay(Duration::from_secs(600)));
        let prover = RouteProver::new(vec![slow, slow_fallback], settings());

        let started = tokio::time::Instant::now();
        let probe = prover.prove("MintX").await;
        assert!(matches!(probe, RouteProbe::Unavailable { .. }));
        assert!(started.elapsed() <= Duration::from_secs(15));
    }
}
