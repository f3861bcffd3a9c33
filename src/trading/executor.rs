//! Trade executor
//!
//! Buys (snipe) and sells (exit) through the configured venues. Each
//! attempt walks the venues in order: quote, build, sign and send. Quote or
//! build failures fall through to the next venue inside the same attempt.
//! Attempts are bounded and spaced by exponential backoff between one and
//! four seconds.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::params::{lamports_to_sol, TradingParams};
use super::settlement::Settlement;
use super::signer::TransactionSigner;
use super::venue::{QuoteRequest, SwapVenue, UnsignedSwap};
use crate::activity::{ActivityCategory, ActivityEntry, ActivityLevel, ActivityLog};
use crate::candidate::{short_mint, TokenStage};
use crate::error::{Error, Result};

/// Backoff floor between attempts
pub const RETRY_FLOOR: Duration = Duration::from_secs(1);
/// Backoff cap between attempts
pub const RETRY_CAP: Duration = Duration::from_secs(4);

/// Decimals assumed when settlement cannot tell us
const DEFAULT_TOKEN_DECIMALS: u8 = 6;

/// A completed buy
#[derive(Debug, Clone, PartialEq)]
pub struct BuyFill {
    pub signature: String,
    pub venue: String,
    pub sol_spent: f64,
    /// Base units received
    pub token_amount: u64,
    pub token_decimals: u8,
    /// SOL per whole token
    pub entry_price: f64,
    /// True when the fill could not be read back and the quote was used
    pub estimated: bool,
}

/// A completed sell
#[derive(Debug, Clone, PartialEq)]
pub struct SellFill {
    pub signature: String,
    pub venue: String,
    pub sol_received: f64,
    /// SOL per whole token
    pub exit_price: f64,
    pub estimated: bool,
}

#[derive(Debug)]
pub enum SnipeOutcome {
    Success(BuyFill),
    Failed { error: Error, attempts: u32 },
}

#[derive(Debug)]
pub enum ExitOutcome {
    Sold(SellFill),
    Failed { error: Error, attempts: u32 },
}

impl ExitOutcome {
    /// A sell that failed because no venue has a route
    pub fn is_no_route(&self) -> bool {
        matches!(self, ExitOutcome::Failed { error, .. } if error.is_route_class())
    }
}

pub struct TradeExecutor {
    venues: Vec<Arc<dyn SwapVenue>>,
    signer: Arc<dyn TransactionSigner>,
    settlement: Arc<dyn Settlement>,
    settle_timeout: Duration,
    activity: ActivityLog,
}

impl TradeExecutor {
    pub fn new(
        venues: Vec<Arc<dyn SwapVenue>>,
        signer: Arc<dyn TransactionSigner>,
        settlement: Arc<dyn Settlement>,
        activity: ActivityLog,
    ) -> Self {
        Self {
            venues,
            signer,
            settlement,
            settle_timeout: Duration::from_secs(15),
            activity,
        }
    }

    /// Buy `params.buy_amount_sol` worth of `mint`
    pub async fn snipe(
        &self,
        mint: &str,
        stage: Option<TokenStage>,
        params: &TradingParams,
    ) -> SnipeOutcome {
        let request = QuoteRequest::buy(mint, params.buy_lamports(), params.slippage_bps());
        let venues = self.ordered_venues(stage);

        info!(
            mint = %mint,
            amount_sol = params.buy_amount_sol,
            slippage_bps = request.slippage_bps,
            "Sniping"
        );

        let (request, venues) = (&request, venues.as_slice());
        let (result, attempts) = self
            .with_retries(params, "buy", mint, move || {
                self.attempt(request, venues, params.priority_fee_lamports)
            })
            .await;

        match result {
            Ok((unsigned, signature)) => {
                let fill = self.buy_fill(mint, &unsigned, signature).await;
                self.activity.publish(
                    ActivityEntry::new(
                        ActivityLevel::Success,
                        ActivityCategory::Trade,
                        format!(
                            "Bought via {} for {:.4} SOL{}",
                            fill.venue,
                            fill.sol_spent,
                            if fill.estimated { " (estimated fill)" } else { "" }
                        ),
                    )
                    .token(short_mint(mint), mint)
                    .details(serde_json::json!({
                        "signature": fill.signature,
                        "entryPrice": fill.entry_price,
                        "attempts": attempts,
                    })),
                );
                SnipeOutcome::Success(fill)
            }
            Err(error) => SnipeOutcome::Failed { error, attempts },
        }
    }

    /// Sell `token_amount` base units of `mint` with the wider exit slippage
    pub async fn exit_position(
        &self,
        mint: &str,
        token_amount: u64,
        token_decimals: u8,
        params: &TradingParams,
    ) -> ExitOutcome {
        if token_amount == 0 {
            return ExitOutcome::Failed {
                error: Error::Validation("nothing to sell".to_string()),
                attempts: 0,
            };
        }

        let request = QuoteRequest::sell(mint, token_amount, params.exit_slippage_bps());
        let venues = self.ordered_venues(None);

        info!(
            mint = %mint,
            token_amount,
            slippage_bps = request.slippage_bps,
            "Exiting position"
        );

        let (request, venues) = (&request, venues.as_slice());
        let (result, attempts) = self
            .with_retries(params, "sell", mint, move || {
                self.attempt(request, venues, params.priority_fee_lamports)
            })
            .await;

        match result {
            Ok((unsigned, signature)) => {
                let fill = self
                    .sell_fill(mint, &unsigned, signature, token_amount, token_decimals)
                    .await;
                ExitOutcome::Sold(fill)
            }
            Err(error) => ExitOutcome::Failed { error, attempts },
        }
    }

    /// Bonding tokens go to the curve venue first
    fn ordered_venues(&self, stage: Option<TokenStage>) -> Vec<Arc<dyn SwapVenue>> {
        let mut venues = self.venues.clone();
        if stage == Some(TokenStage::Bonding) {
            venues.sort_by_key(|v| v.id() != "pumpportal");
        }
        venues
    }

    /// Run `op` up to `max_retries` times. Route-class and signing
    /// rejections end the loop immediately.
    async fn with_retries<T, F, Fut>(
        &self,
        params: &TradingParams,
        side: &str,
        mint: &str,
        mut op: F,
    ) -> (Result<T>, u32)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut backoff = retry_backoff(params.retry_delay);
        let max_attempts = params.max_retries.max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            let error = match op().await {
                Ok(value) => return (Ok(value), attempts),
                Err(e) => e,
            };

            let terminal = error.is_route_class() || matches!(error, Error::SigningRejected(_));
            if terminal || attempts >= max_attempts {
                warn!(
                    side,
                    mint = %mint,
                    attempts,
                    "Trade failed: {}",
                    error
                );
                self.activity.publish(
                    ActivityEntry::new(
                        ActivityLevel::Error,
                        ActivityCategory::Trade,
                        format!("{} failed after {} attempt(s): {}", side, attempts, error.short_reason()),
                    )
                    .token(short_mint(mint), mint),
                );
                return (Err(error), attempts);
            }

            let delay = backoff
                .next_backoff()
                .unwrap_or(RETRY_CAP)
                .clamp(RETRY_FLOOR, RETRY_CAP);
            debug!(side, mint = %mint, attempts, ?delay, "Retrying after: {}", error);
            self.activity.publish(
                ActivityEntry::new(
                    ActivityLevel::Warning,
                    ActivityCategory::Trade,
                    format!("{} attempt {} failed, retrying in {:?}: {}", side, attempts, delay, error.short_reason()),
                )
                .token(short_mint(mint), mint),
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// One attempt across all venues
    async fn attempt(
        &self,
        request: &QuoteRequest,
        venues: &[Arc<dyn SwapVenue>],
        priority_fee_lamports: u64,
    ) -> Result<(UnsignedSwap, String)> {
        let wallet = self.signer.public_key();
        let mut last_error: Option<Error> = None;
        let mut all_no_route = true;

        for venue in venues {
            let quote = match venue.quote(request).await {
                Ok(q) if q.out_amount > 0 => q,
                Ok(_) => {
                    last_error = Some(Error::NoRoute(format!("{}: zero output", venue.id())));
                    continue;
                }
                Err(e) => {
                    debug!(venue = venue.id(), "Quote failed, trying next venue: {}", e);
                    all_no_route &= e.is_route_class();
                    last_error = Some(e);
                    continue;
                }
            };

            let unsigned = match venue.build_swap(&quote, &wallet, priority_fee_lamports).await {
                Ok(u) => u,
                Err(e) => {
                    debug!(venue = venue.id(), "Build failed, trying next venue: {}", e);
                    all_no_route &= e.is_route_class();
                    last_error = Some(e);
                    continue;
                }
            };

            // Once submitted there is no falling through
            let signature = self.signer.sign_and_send(&unsigned.transaction).await?;
            if signature.trim().is_empty() {
                return Err(Error::SigningRejected("signer returned no signature".to_string()));
            }

            return Ok((unsigned, signature));
        }

        if all_no_route {
            Err(Error::NoRoute(format!(
                "no venue has a route for {}",
                request.token_mint()
            )))
        } else {
            Err(last_error.unwrap_or_else(|| Error::Config("no swap venues configured".to_string())))
        }
    }

    async fn buy_fill(&self, mint: &str, unsigned: &UnsignedSwap, signature: String) -> BuyFill {
        let sol_spent = lamports_to_sol(unsigned.quote.in_amount);
        let wallet = self.signer.public_key();

        let settled = tokio::time::timeout(
            self.settle_timeout,
            self.settlement.settle(&signature, &wallet, mint),
        )
        .await;

        let (token_amount, token_decimals, estimated) = match settled {
            Ok(Ok(fill)) if fill.token_change > 0 => {
                (fill.token_change as u64, fill.token_decimals, false)
            }
            Ok(Ok(_)) | Ok(Err(_)) | Err(_) => {
                warn!(mint = %mint, %signature, "Fill unavailable, using quoted amount");
                (unsigned.quote.out_amount, DEFAULT_TOKEN_DECIMALS, true)
            }
        };

        BuyFill {
            entry_price: price_per_token(sol_spent, token_amount, token_decimals),
            signature,
            venue: unsigned.venue.clone(),
            sol_spent,
            token_amount,
            token_decimals,
            estimated,
        }
    }

    async fn sell_fill(
        &self,
        mint: &str,
        unsigned: &UnsignedSwap,
        signature: String,
        token_amount: u64,
        token_decimals: u8,
    ) -> SellFill {
        let wallet = self.signer.public_key();
        let settled = tokio::time::timeout(
            self.settle_timeout,
            self.settlement.settle(&signature, &wallet, mint),
        )
        .await;

        let (sol_received, estimated) = match settled {
            Ok(Ok(fill)) if fill.sol_change_lamports > 0 => {
                (lamports_to_sol(fill.sol_change_lamports as u64), false)
            }
            Ok(Ok(_)) | Ok(Err(_)) | Err(_) => {
                warn!(mint = %mint, %signature, "Fill unavailable, using quoted amount");
                (lamports_to_sol(unsigned.quote.out_amount), true)
            }
        };

        SellFill {
            exit_price: price_per_token(sol_received, token_amount, token_decimals),
            signature,
            venue: unsigned.venue.clone(),
            sol_received,
            estimated,
        }
    }
}

fn retry_backoff(initial: Duration) -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: initial.clamp(RETRY_FLOOR, RETRY_CAP),
        current_interval: initial.clamp(RETRY_FLOOR, RETRY_CAP),
        max_interval: RETRY_CAP,
        multiplier: 2.0,
        randomization_factor: 0.0,
        max_elapsed_time: None,
        ..Default::default()
    }
}

/// SOL per whole token
pub fn price_per_token(sol: f64, token_amount: u64, decimals: u8) -> f64 {
    if token_amount == 0 {
        return 0.0;
    }
    sol / (token_amount as f64 / 10f64.powi(decimals as i32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::MemorySink;
    use crate::config::{ExitMonitorConfig, RiskConfig, TradingConfig};
    use crate::trading::settlement::mock::MockSettlement;
    use crate::trading::settlement::Fill;
    use crate::trading::signer::mock::MockSigner;
    use crate::trading::venue::mock::MockVenue;

    fn params() -> TradingParams {
        TradingParams::from_settings(
            &TradingConfig {
                buy_amount_sol: 0.1,
                max_retries: 3,
                ..TradingConfig::default()
            },
            &RiskConfig::default(),
            &ExitMonitorConfig::default(),
        )
    }

    fn executor(
        venues: Vec<Arc<dyn SwapVenue>>,
        signer: Arc<MockSigner>,
        fill: Option<Fill>,
    ) -> TradeExecutor {
        TradeExecutor::new(
            venues,
            signer,
            Arc::new(MockSettlement { fill }),
            ActivityLog::disabled(),
        )
    }

    #[tokio::test]
    async fn test_server_error_falls_through_within_attempt() {
        let primary = Arc::new(MockVenue::new(
            "jupiter",
            vec![Err(Error::Upstream { service: "jupiter".into(), status: 503 })],
        ));
        let fallback = Arc::new(MockVenue::always("jupiter-fallback", 2_000_000_000));
        let signer = Arc::new(MockSigner::ok());
        let exec = executor(vec![primary.clone(), fallback.clone()], signer.clone(), None);

        match exec.snipe("MintX", None, &params()).await {
            SnipeOutcome::Success(fill) => {
                assert_eq!(fill.venue, "jupiter-fallback");
                assert!(fill.estimated);
            }
            other => panic!("expected success, got {:?}", other),
        }
        assert_eq!(signer.calls(), 1);
        assert_eq!(primary.quotes(), 1);
    }

    #[tokio::test]
    async fn test_no_route_everywhere_is_not_retried() {
        let a = Arc::new(MockVenue::no_route("jupiter"));
        let b = Arc::new(MockVenue::no_route("raydium"));
        let signer = Arc::new(MockSigner::ok());
        let exec = executor(vec![a.clone(), b.clone()], signer.clone(), None);

        match exec.snipe("MintX", None, &params()).await {
            SnipeOutcome::Failed { error, attempts } => {
                assert!(error.is_route_class());
                assert_eq!(attempts, 1);
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(signer.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failure_retries_with_floor() {
        let venue = Arc::new(MockVenue::always("jupiter", 1_000_000));
        let signer = Arc::new(MockSigner::scripted(vec![
            Err("blockhash not found".into()),
            Ok("sigOK".into()),
        ]));
        let exec = executor(vec![venue], signer.clone(), None);

        let started = tokio::time::Instant::now();
        match exec.snipe("MintX", None, &params()).await {
            SnipeOutcome::Success(fill) => assert_eq!(fill.signature, "sigOK"),
            other => panic!("expected success, got {:?}", other),
        }
        assert_eq!(signer.calls(), 2);
        assert!(started.elapsed() >= RETRY_FLOOR);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_are_bounded() {
        let venue = Arc::new(MockVenue::always("jupiter", 1_000_000));
        let signer = Arc::new(MockSigner::scripted(vec![
            Err("a".into()),
            Err("b".into()),
            Err("c".into()),
            Ok("never".into()),
        ]));
        let exec = executor(vec![venue], signer.clone(), None);

        match exec.snipe("MintX", None, &params()).await {
            SnipeOutcome::Failed { error, attempts } => {
                assert_eq!(attempts, 3);
                assert!(error.to_string().ends_with(": c"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(signer.calls(), 3);
    }

    #[tokio::test]
    async fn test_realized_price_from_settlement() {
        let venue = Arc::new(MockVenue::always("jupiter", 1_000_000_000));
        let signer = Arc::new(MockSigner::ok());
        let fill = Fill {
            sol_change_lamports: -100_000_000,
            token_change: 500_000_000,
            token_decimals: 6,
            fee_lamports: 5000,
        };
        let exec = executor(vec![venue], signer, Some(fill));

        match exec.snipe("MintX", None, &params()).await {
            SnipeOutcome::Success(fill) => {
                assert!(!fill.estimated);
                assert_eq!(fill.token_amount, 500_000_000);
                // 0.1 SOL for 500 tokens
                assert!((fill.entry_price - 0.0002).abs() < 1e-12);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_exit_uses_wider_slippage() {
        let venue = Arc::new(MockVenue::always("jupiter", 50_000_000));
        let signer = Arc::new(MockSigner::ok());
        let exec = executor(vec![venue.clone()], signer, None);
        let p = params();

        let outcome = exec.exit_position("MintX", 1_000_000, 6, &p).await;
        assert!(matches!(outcome, ExitOutcome::Sold(_)));

        let request = venue.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.slippage_bps, p.exit_slippage_bps());
        assert!(request.slippage_bps > p.slippage_bps());
    }

    #[tokio::test]
    async fn test_exit_no_route() {
        let exec = executor(
            vec![Arc::new(MockVenue::no_route("jupiter"))],
            Arc::new(MockSigner::ok()),
            None,
        );
        let outcome = exec.exit_position("MintX", 1_000, 6, &params()).await;
        assert!(outcome.is_no_route());
    }

    #[tokio::test]
    async fn test_bonding_prefers_curve_venue() {
        let jupiter = Arc::new(MockVenue::always("jupiter", 10));
        let curve = Arc::new(MockVenue::always("pumpportal", 10));
        let sink = Arc::new(MemorySink::new());
        let exec = TradeExecutor::new(
            vec![jupiter.clone(), curve.clone()],
            Arc::new(MockSigner::ok()),
            Arc::new(MockSettlement { fill: None }),
            ActivityLog::new(vec![sink.clone()]),
        );

        match exec.snipe("MintX", Some(TokenStage::Bonding), &params()).await {
            SnipeOutcome::Success(fill) => assert_eq!(fill.venue, "pumpportal"),
            other => panic!("expected success, got {:?}", other),
        }
        assert_eq!(jupiter.quotes(), 0);
        assert!(!sink.entries().is_empty());
    }

    #[test]
    fn test_backoff_bounds() {
        let mut backoff = retry_backoff(Duration::from_millis(100));
        let delays: Vec<Duration> = (0..5)
            .map(|_| backoff.next_backoff().unwrap().clamp(RETRY_FLOOR, RETRY_CAP))
            .collect();
        assert_eq!(delays[0], Duration::from_secs(1));
        assert_eq!(delays[1], Duration::from_secs(2));
        assert!(delays.iter().all(|d| *d >= RETRY_FLOOR && *d <= RETRY_CAP));
    }
}
