//! Live trading orchestrator
//!
//! Turns approved tokens into buys, one at a time.
//!
//! Dedup runs cheapest first and drops silently:
//! 1. this session's executed set
//! 2. mints with an open position in the store
//! 3. the durable trade state
//!
//! Execution is single-flight behind a lock, spaced by a cooldown measured
//! from the start of one attempt to the start of the next. Before buying,
//! at least two venues are asked for a route in parallel.

use futures::future::join_all;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::approval::ApprovedToken;
use super::gate::{check_prerequisites, GateSettings, GateStatus};
use super::trade_state::{Eligibility, TradeStateStore, PENDING_AWAITING_INDEXING, PENDING_NO_ROUTE};
use crate::activity::{ActivityCategory, ActivityEntry, ActivityLevel, ActivityLog};
use crate::candidate::short_mint;
use crate::config::Config;
use crate::error::Result;
use crate::position::{NewPosition, PositionStore};
use crate::trading::{BuyFill, QuoteRequest, SnipeOutcome, SwapVenue, TradeExecutor, TradingParams};
use crate::wallet::WalletProvider;

/// Position id recorded when a buy filled but the store write failed
const UNRECORDED_POSITION: &str = "unrecorded";

#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    /// Minimum gap between the starts of two trade attempts
    pub cooldown: Duration,
    pub route_check_timeout: Duration,
    pub queue_capacity: usize,
    pub tick: Duration,
    pub chain: String,
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        let orchestrator = &config.orchestrator;
        Self {
            cooldown: Duration::from_millis(orchestrator.cooldown_ms),
            route_check_timeout: Duration::from_millis(orchestrator.route_check_timeout_ms),
            queue_capacity: orchestrator.queue_capacity.max(1),
            tick: Duration::from_millis(orchestrator.tick_ms.max(50)),
            chain: "solana".to_string(),
        }
    }
}

/// What happened to one token
#[derive(Debug, Clone, PartialEq)]
pub enum TradeOutcome {
    Traded { position_id: String, signature: String },
    Pending { reason: String },
    Rejected { reason: String },
    /// Dropped by dedup, no attempt made
    Skipped { reason: String },
    /// Prerequisites not met, nothing attempted
    Blocked(GateStatus),
}

#[derive(Default)]
struct QueueState {
    tokens: VecDeque<ApprovedToken>,
    /// Mints queued or being executed
    claimed: HashSet<String>,
}

pub struct LiveOrchestrator {
    executor: Arc<TradeExecutor>,
    route_venues: Vec<Arc<dyn SwapVenue>>,
    wallet: Arc<dyn WalletProvider>,
    positions: Arc<dyn PositionStore>,
    trade_states: Arc<TradeStateStore>,
    params: TradingParams,
    gate: GateSettings,
    settings: OrchestratorSettings,
    queue: Mutex<QueueState>,
    executed: RwLock<HashSet<String>>,
    active_positions: RwLock<HashSet<String>>,
    in_flight: Mutex<()>,
    last_attempt: Mutex<Option<Instant>>,
    balance_sol: RwLock<Option<f64>>,
    activity: ActivityLog,
}

impl LiveOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        executor: Arc<TradeExecutor>,
        route_venues: Vec<Arc<dyn SwapVenue>>,
        wallet: Arc<dyn WalletProvider>,
        positions: Arc<dyn PositionStore>,
        trade_states: Arc<TradeStateStore>,
        params: TradingParams,
        gate: GateSettings,
        settings: OrchestratorSettings,
        activity: ActivityLog,
    ) -> Self {
        if route_venues.len() < 2 {
            warn!(
                venues = route_venues.len(),
                "Route validation has fewer than two independent venues"
            );
        }
        Self {
            executor,
            route_venues,
            wallet,
            positions,
            trade_states,
            params,
            gate,
            settings,
            queue: Mutex::new(QueueState::default()),
            executed: RwLock::new(HashSet::new()),
            active_positions: RwLock::new(HashSet::new()),
            in_flight: Mutex::new(()),
            last_attempt: Mutex::new(None),
            balance_sol: RwLock::new(None),
            activity,
        }
    }

    /// Queue approved tokens, returning how many were accepted
    pub async fn queue_tokens(&self, tokens: Vec<ApprovedToken>) -> usize {
        let mut accepted = 0;
        for token in tokens {
            let mint = token.mint().to_string();
            if let Some(reason) = self.dedup(&mint).await {
                debug!(mint = %mint, "Not queued: {}", reason);
                continue;
            }

            let mut queue = self.queue.lock().await;
            if queue.claimed.contains(&mint) {
                debug!(mint = %mint, "Already queued");
                continue;
            }
            if queue.tokens.len() >= self.settings.queue_capacity {
                warn!(mint = %mint, capacity = self.settings.queue_capacity, "Queue full");
                continue;
            }
            queue.claimed.insert(mint.clone());
            queue.tokens.push_back(token);
            accepted += 1;
        }

        if accepted > 0 {
            self.activity.publish(ActivityEntry::new(
                ActivityLevel::Info,
                ActivityCategory::Queue,
                format!("Queued {} token(s)", accepted),
            ));
        }
        accepted
    }

    /// Trade one token now, ahead of the queue
    pub async fn execute_immediate(&self, token: ApprovedToken) -> TradeOutcome {
        let mint = token.mint().to_string();
        {
            let mut queue = self.queue.lock().await;
            if !queue.claimed.insert(mint.clone()) {
                return TradeOutcome::Skipped {
                    reason: "already queued".to_string(),
                };
            }
        }

        let status = self.check_gate().await;
        let outcome = if status.is_ready() {
            self.execute(&token).await
        } else {
            TradeOutcome::Blocked(status)
        };

        self.queue.lock().await.claimed.remove(&mint);
        outcome
    }

    /// Drop everything queued but not yet started
    pub async fn clear_queue(&self) -> usize {
        let mut queue = self.queue.lock().await;
        let QueueState { tokens, claimed } = &mut *queue;
        let cleared = tokens.len();
        for token in tokens.drain(..) {
            claimed.remove(token.mint());
        }
        info!(cleared, "Queue cleared");
        cleared
    }

    /// Forget this session's executed set. The durable state still guards
    /// traded and rejected mints.
    pub async fn reset_executed_tokens(&self) {
        self.executed.write().await.clear();
        info!("Executed tokens reset");
    }

    pub async fn queue_len(&self) -> usize {
        self.queue.lock().await.tokens.len()
    }

    pub async fn last_balance(&self) -> Option<f64> {
        *self.balance_sol.read().await
    }

    /// Reload the mints that have an open position
    pub async fn sync_active_positions(&self) -> Result<usize> {
        let open: HashSet<String> = self
            .positions
            .open_positions()
            .await?
            .into_iter()
            .map(|p| p.mint)
            .collect();
        let count = open.len();
        *self.active_positions.write().await = open;
        Ok(count)
    }

    /// Work through the queue once. Stops early when prerequisites fail.
    pub async fn process_queue(&self) -> Vec<(String, TradeOutcome)> {
        let mut outcomes = Vec::new();
        if self.queue.lock().await.tokens.is_empty() {
            return outcomes;
        }
        if let Err(e) = self.sync_active_positions().await {
            warn!("Could not sync active positions: {}", e);
        }

        loop {
            if self.queue.lock().await.tokens.is_empty() {
                break;
            }

            let status = self.check_gate().await;
            if !status.is_ready() {
                self.activity.publish(ActivityEntry::new(
                    ActivityLevel::Warning,
                    ActivityCategory::Wallet,
                    status.prompt(),
                ));
                break;
            }

            let Some(token) = self.queue.lock().await.tokens.pop_front() else {
                break;
            };
            let mint = token.mint().to_string();
            let outcome = self.execute(&token).await;
            self.queue.lock().await.claimed.remove(&mint);
            outcomes.push((mint, outcome));
        }

        outcomes
    }

    /// Process the queue every tick until cancelled
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(cooldown_ms = self.settings.cooldown.as_millis() as u64, "Orchestrator started");
        if let Err(e) = self.sync_active_positions().await {
            warn!("Could not sync active positions: {}", e);
        }

        let mut interval = tokio::time::interval(self.settings.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.process_queue().await;
                }
            }
        }
        info!("Orchestrator stopped");
    }

    async fn check_gate(&self) -> GateStatus {
        let status = check_prerequisites(
            self.wallet.as_ref(),
            self.positions.as_ref(),
            self.params.buy_amount_sol,
            &self.gate,
        )
        .await;
        if let GateStatus::Ready { balance_sol } = &status {
            *self.balance_sol.write().await = Some(*balance_sol);
        }
        status
    }

    /// Why a mint must not be bought, checked cheapest first
    async fn dedup(&self, mint: &str) -> Option<String> {
        if self.executed.read().await.contains(mint) {
            return Some("executed this session".to_string());
        }
        if self.active_positions.read().await.contains(mint) {
            return Some("position already open".to_string());
        }
        match self.trade_states.eligibility(mint).await {
            Eligibility::Eligible => None,
            Eligibility::RetryLater { reason, remaining } => Some(format!(
                "pending ({}), retry in {}s",
                reason,
                remaining.as_secs()
            )),
            Eligibility::Blocked(state) => Some(format!("already {}", state.name())),
        }
    }

    async fn execute(&self, token: &ApprovedToken) -> TradeOutcome {
        let _flight = self.in_flight.lock().await;
        let mint = token.mint();
        let _mint_lock = self.trade_states.lock_mint(mint).await;

        // State may have moved while the token sat in the queue
        if let Some(reason) = self.dedup(mint).await {
            debug!(mint = %mint, "Skipped: {}", reason);
            return TradeOutcome::Skipped { reason };
        }

        if token.candidate.awaiting_indexing {
            self.persist_pending(mint, PENDING_AWAITING_INDEXING).await;
            return TradeOutcome::Pending {
                reason: PENDING_AWAITING_INDEXING.to_string(),
            };
        }

        self.wait_for_cooldown().await;
        let params = self.params.clone();
        let symbol = token.candidate.display_symbol();
        info!(mint = %mint, symbol = %symbol, "Trade attempt");

        if !self.validate_route(mint, &params).await {
            self.persist_pending(mint, PENDING_NO_ROUTE).await;
            self.publish(ActivityLevel::Warning, token, format!("{} has no route yet, pending", symbol));
            return TradeOutcome::Pending {
                reason: PENDING_NO_ROUTE.to_string(),
            };
        }

        match self.executor.snipe(mint, token.stage(), &params).await {
            SnipeOutcome::Success(fill) => self.record_fill(token, &params, fill).await,
            SnipeOutcome::Failed { error, attempts } => {
                let reason = error.short_reason();
                if error.is_route_class() {
                    self.persist_pending(mint, &reason).await;
                    self.publish(
                        ActivityLevel::Warning,
                        token,
                        format!("{} buy failed on liquidity, pending: {}", symbol, reason),
                    );
                    TradeOutcome::Pending { reason }
                } else {
                    if let Err(e) = self.trade_states.mark_rejected(mint, &reason).await {
                        error!(mint = %mint, "Could not persist rejection: {}", e);
                    }
                    self.publish(
                        ActivityLevel::Error,
                        token,
                        format!("{} rejected after {} attempt(s): {}", symbol, attempts, reason),
                    );
                    TradeOutcome::Rejected { reason }
                }
            }
        }
    }

    async fn wait_for_cooldown(&self) {
        let mut last = self.last_attempt.lock().await;
        if let Some(started) = *last {
            let ready_at = started + self.settings.cooldown;
            let now = Instant::now();
            if ready_at > now {
                debug!(wait_ms = (ready_at - now).as_millis() as u64, "Cooldown");
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Ask every route venue at once; any non-zero quote is a route
    async fn validate_route(&self, mint: &str, params: &TradingParams) -> bool {
        let request = QuoteRequest::buy(mint, params.buy_lamports(), params.slippage_bps());
        let checks = self.route_venues.iter().map(|venue| {
            let request = &request;
            async move {
                let result = tokio::time::timeout(self.settings.route_check_timeout, venue.quote(request)).await;
                match result {
                    Ok(Ok(quote)) => quote.out_amount > 0,
                    Ok(Err(e)) => {
                        debug!(venue = venue.id(), mint = %mint, "Route check failed: {}", e);
                        false
                    }
                    Err(_) => {
                        debug!(venue = venue.id(), mint = %mint, "Route check timed out");
                        false
                    }
                }
            }
        });
        join_all(checks).await.into_iter().any(|routable| routable)
    }

    async fn record_fill(&self, token: &ApprovedToken, params: &TradingParams, fill: BuyFill) -> TradeOutcome {
        let mint = token.mint();
        let new = NewPosition {
            mint: mint.to_string(),
            symbol: token.candidate.display_symbol(),
            name: token.candidate.name.clone(),
            chain: self.settings.chain.clone(),
            entry_price: fill.entry_price,
            entry_amount: fill.token_amount,
            token_decimals: fill.token_decimals,
            entry_value_sol: fill.sol_spent,
            entry_tx: fill.signature.clone(),
            take_profit_pct: params.take_profit_pct,
            stop_loss_pct: params.stop_loss_pct,
        };

        let position_id = match self.positions.create_position(new).await {
            Ok(position) => position.id,
            Err(e) => {
                error!(mint = %mint, signature = %fill.signature, "Buy filled but position not stored: {}", e);
                UNRECORDED_POSITION.to_string()
            }
        };

        // The durable mark is what stops a second buy after a restart
        if let Err(e) = self.trade_states.mark_traded(mint, &fill.signature, &position_id).await {
            error!(mint = %mint, "Could not persist traded state: {}", e);
        }
        self.executed.write().await.insert(mint.to_string());
        self.active_positions.write().await.insert(mint.to_string());

        match self.wallet.snapshot().await {
            Ok(snapshot) => *self.balance_sol.write().await = Some(snapshot.balance_sol),
            Err(e) => debug!("Balance refresh failed: {}", e),
        }

        info!(mint = %short_mint(mint), signature = %fill.signature, "Position opened");
        TradeOutcome::Traded {
            position_id,
            signature: fill.signature,
        }
    }

    async fn persist_pending(&self, mint: &str, reason: &str) {
        if let Err(e) = self.trade_states.mark_pending(mint, reason).await {
            error!(mint = %mint, "Could not persist pending state: {}", e);
        }
    }

    fn publish(&self, level: ActivityLevel, token: &ApprovedToken, message: String) {
        self.activity.publish(
            ActivityEntry::new(level, ActivityCategory::Trade, message)
                .token(token.candidate.display_symbol(), token.mint().to_string()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExitMonitorConfig, RiskConfig, TradingConfig};
    use crate::error::Error;
    use crate::orchestrator::approval::fixtures::approved;
    use crate::orchestrator::trade_state::TradeState;
    use crate::position::JsonPositionStore;
    use crate::trading::settlement::mock::MockSettlement;
    use crate::trading::signer::mock::MockSigner;
    use crate::trading::venue::mock::MockVenue;
    use crate::trading::{SwapQuote, UnsignedSwap};
    use crate::wallet::mock::MockWallet;
    use async_trait::async_trait;

    /// Records when each mint was first quoted
    struct StampingVenue {
        inner: MockVenue,
        stamps: std::sync::Mutex<Vec<(String, Instant)>>,
    }

    impl StampingVenue {
        fn first_stamp(&self, mint: &str) -> Instant {
            self.stamps
                .lock()
                .unwrap()
                .iter()
                .find(|(m, _)| m == mint)
                .map(|(_, at)| *at)
                .unwrap()
        }
    }

    #[async_trait]
    impl SwapVenue for StampingVenue {
        fn id(&self) -> &str {
            self.inner.id()
        }

        async fn quote(&self, request: &QuoteRequest) -> Result<SwapQuote> {
            self.stamps
                .lock()
                .unwrap()
                .push((request.token_mint().to_string(), Instant::now()));
            self.inner.quote(request).await
        }

        async fn build_swap(&self, quote: &SwapQuote, user: &str, fee: u64) -> Result<UnsignedSwap> {
            self.inner.build_swap(quote, user, fee).await
        }
    }

    struct Harness {
        orchestrator: LiveOrchestrator,
        signer: Arc<MockSigner>,
        trade_states: Arc<TradeStateStore>,
        positions: Arc<JsonPositionStore>,
        wallet: Arc<MockWallet>,
    }

    fn harness(
        venues: Vec<Arc<dyn SwapVenue>>,
        route_venues: Vec<Arc<dyn SwapVenue>>,
        signer: MockSigner,
    ) -> Harness {
        let signer = Arc::new(signer);
        let executor = Arc::new(TradeExecutor::new(
            venues,
            signer.clone(),
            Arc::new(MockSettlement { fill: None }),
            ActivityLog::disabled(),
        ));
        let trade_states = Arc::new(TradeStateStore::in_memory(Duration::from_secs(60)));
        let positions = Arc::new(JsonPositionStore::in_memory());
        let wallet = Arc::new(MockWallet::funded(10.0));
        let params = TradingParams::from_settings(
            &TradingConfig {
                buy_amount_sol: 0.1,
                max_retries: 2,
                ..TradingConfig::default()
            },
            &RiskConfig::default(),
            &ExitMonitorConfig::default(),
        );
        let gate = GateSettings {
            expected_network: "mainnet-beta".into(),
            fee_buffer_sol: 0.01,
            max_open_positions: 10,
            daily_loss_limit_sol: 0.0,
        };
        let settings = OrchestratorSettings {
            cooldown: Duration::from_millis(2000),
            route_check_timeout: Duration::from_secs(10),
            queue_capacity: 16,
            tick: Duration::from_millis(500),
            chain: "solana".into(),
        };

        Harness {
            orchestrator: LiveOrchestrator::new(
                executor,
                route_venues,
                wallet.clone(),
                positions.clone(),
                trade_states.clone(),
                params,
                gate,
                settings,
                ActivityLog::disabled(),
            ),
            signer,
            trade_states,
            positions,
            wallet,
        }
    }

    fn routable() -> Harness {
        let jupiter: Arc<dyn SwapVenue> = Arc::new(MockVenue::always("jupiter", 1_000_000_000));
        let raydium: Arc<dyn SwapVenue> = Arc::new(MockVenue::always("raydium", 1_000_000_000));
        harness(vec![jupiter.clone(), raydium.clone()], vec![jupiter, raydium], MockSigner::ok())
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_twice_executes_once() {
        let h = routable();
        assert_eq!(h.orchestrator.queue_tokens(vec![approved("T1")]).await, 1);
        assert_eq!(h.orchestrator.queue_tokens(vec![approved("T1")]).await, 0);
        assert_eq!(h.orchestrator.queue_len().await, 1);

        let outcomes = h.orchestrator.process_queue().await;
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0].1, TradeOutcome::Traded { .. }));
        assert_eq!(h.signer.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_traded_mint_never_bought_again() {
        let h = routable();
        h.orchestrator.queue_tokens(vec![approved("T1")]).await;
        h.orchestrator.process_queue().await;
        assert!(matches!(h.trade_states.get("T1").await, TradeState::Traded { .. }));

        // Even with the in-session set and position cache gone
        h.orchestrator.reset_executed_tokens().await;
        *h.orchestrator.active_positions.write().await = HashSet::new();

        assert_eq!(h.orchestrator.queue_tokens(vec![approved("T1")]).await, 0);
        let outcome = h.orchestrator.execute_immediate(approved("T1")).await;
        assert!(matches!(outcome, TradeOutcome::Skipped { .. }));
        assert_eq!(h.signer.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_between_attempt_starts() {
        let jupiter = Arc::new(StampingVenue {
            inner: MockVenue::always("jupiter", 1_000_000_000),
            stamps: std::sync::Mutex::new(Vec::new()),
        });
        let stamped: Arc<dyn SwapVenue> = jupiter.clone();
        let raydium: Arc<dyn SwapVenue> = Arc::new(MockVenue::always("raydium", 1_000_000_000));
        let h = harness(
            vec![stamped.clone(), raydium.clone()],
            vec![stamped, raydium],
            MockSigner::ok(),
        );

        h.orchestrator
            .queue_tokens(vec![approved("T1"), approved("T2")])
            .await;
        let outcomes = h.orchestrator.process_queue().await;
        assert_eq!(outcomes.len(), 2);

        let gap = jupiter.first_stamp("T2") - jupiter.first_stamp("T1");
        assert!(gap >= Duration::from_millis(2000), "gap was {:?}", gap);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_route_marks_pending() {
        let jupiter: Arc<dyn SwapVenue> = Arc::new(MockVenue::no_route("jupiter"));
        let raydium: Arc<dyn SwapVenue> = Arc::new(MockVenue::no_route("raydium"));
        let h = harness(vec![jupiter.clone(), raydium.clone()], vec![jupiter, raydium], MockSigner::ok());

        let outcome = h.orchestrator.execute_immediate(approved("T1")).await;
        assert_eq!(
            outcome,
            TradeOutcome::Pending {
                reason: PENDING_NO_ROUTE.into()
            }
        );
        assert_eq!(h.signer.calls(), 0);
        assert!(matches!(
            h.trade_states.eligibility("T1").await,
            Eligibility::RetryLater { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_venue_with_route_is_enough() {
        let jupiter: Arc<dyn SwapVenue> = Arc::new(MockVenue::no_route("jupiter"));
        let raydium: Arc<dyn SwapVenue> = Arc::new(MockVenue::always("raydium", 1_000_000_000));
        let h = harness(vec![jupiter.clone(), raydium.clone()], vec![jupiter, raydium], MockSigner::ok());

        let outcome = h.orchestrator.execute_immediate(approved("T1")).await;
        assert!(matches!(outcome, TradeOutcome::Traded { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_awaiting_indexing_is_pending_not_failure() {
        let h = routable();
        let mut token = approved("T1");
        token.candidate.awaiting_indexing = true;

        let outcome = h.orchestrator.execute_immediate(token).await;
        assert_eq!(
            outcome,
            TradeOutcome::Pending {
                reason: PENDING_AWAITING_INDEXING.into()
            }
        );
        assert_eq!(h.signer.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execution_failure_rejects() {
        let jupiter: Arc<dyn SwapVenue> = Arc::new(MockVenue::always("jupiter", 1_000_000_000));
        let h = harness(
            vec![jupiter.clone()],
            vec![jupiter],
            MockSigner::scripted(vec![Err("blockhash expired".into()), Err("blockhash expired".into())]),
        );

        match h.orchestrator.execute_immediate(approved("T1")).await {
            TradeOutcome::Rejected { reason } => assert!(reason.contains("blockhash")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(h.trade_states.get("T1").await, TradeState::Rejected { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_route_class_failure_is_pending() {
        // Route check passes, then the buy itself hits a route error
        let check: Arc<dyn SwapVenue> = Arc::new(MockVenue::always("raydium", 1_000_000_000));
        let buy: Arc<dyn SwapVenue> = Arc::new(MockVenue::new(
            "jupiter",
            vec![Err(Error::NoRoute("jupiter: liquidity removed".into()))],
        ));
        let h = harness(vec![buy], vec![check], MockSigner::ok());

        let outcome = h.orchestrator.execute_immediate(approved("T1")).await;
        assert!(matches!(outcome, TradeOutcome::Pending { .. }));
        assert_eq!(h.trade_states.get("T1").await.name(), "PENDING");
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_persists_position_and_balance() {
        let h = routable();
        h.wallet.set_balance(9.5);
        match h.orchestrator.execute_immediate(approved("T1")).await {
            TradeOutcome::Traded { position_id, .. } => {
                let open = h.positions.open_positions().await.unwrap();
                assert_eq!(open.len(), 1);
                assert_eq!(open[0].id, position_id);
                assert_eq!(open[0].mint, "T1");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(h.orchestrator.last_balance().await, Some(9.5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gate_blocks_before_processing() {
        let h = routable();
        h.wallet.set_balance(0.05);
        h.orchestrator.queue_tokens(vec![approved("T1")]).await;

        let outcomes = h.orchestrator.process_queue().await;
        assert!(outcomes.is_empty());
        assert_eq!(h.orchestrator.queue_len().await, 1);
        assert_eq!(h.signer.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_position_blocks_queueing() {
        let h = routable();
        h.positions
            .create_position(crate::position::store::fixtures::new_position("T1", 0.001))
            .await
            .unwrap();
        assert_eq!(h.orchestrator.sync_active_positions().await.unwrap(), 1);
        assert_eq!(h.orchestrator.queue_tokens(vec![approved("T1")]).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_queue() {
        let h = routable();
        h.orchestrator
            .queue_tokens(vec![approved("T1"), approved("T2")])
            .await;
        assert_eq!(h.orchestrator.clear_queue().await, 2);
        assert!(h.orchestrator.process_queue().await.is_empty());
        // Cleared mints can be queued again
        assert_eq!(h.orchestrator.queue_tokens(vec![approved("T1")]).await, 1);
    }
}
