//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub tradability: TradabilityConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub exit_monitor: ExitMonitorConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub filters: FilterConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// Upstream HTTP services
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointsConfig {
    /// Keyless Jupiter endpoint, tried first
    #[serde(default = "default_jupiter_primary_url")]
    pub jupiter_primary_url: String,
    /// Keyed Jupiter endpoint, used when the primary fails
    #[serde(default = "default_jupiter_fallback_url")]
    pub jupiter_fallback_url: String,
    #[serde(default)]
    pub jupiter_api_key: String,
    #[serde(default = "default_raydium_api_url")]
    pub raydium_api_url: String,
    #[serde(default = "default_raydium_trade_url")]
    pub raydium_trade_url: String,
    #[serde(default = "default_dexscreener_url")]
    pub dexscreener_url: String,
    #[serde(default = "default_rugcheck_url")]
    pub rugcheck_url: String,
    #[serde(default = "default_pumpportal_url")]
    pub pumpportal_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    #[serde(default = "default_keypair_path")]
    pub keypair_path: String,
}

/// Priority fee level chosen by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
    Normal,
    Fast,
    Turbo,
}

impl PriorityLevel {
    /// Compute-unit price in micro-lamports for this level
    pub fn fee_lamports(self) -> u64 {
        match self {
            PriorityLevel::Normal => 100_000,
            PriorityLevel::Fast => 500_000,
            PriorityLevel::Turbo => 1_000_000,
        }
    }
}

impl std::str::FromStr for PriorityLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(PriorityLevel::Normal),
            "fast" => Ok(PriorityLevel::Fast),
            "turbo" => Ok(PriorityLevel::Turbo),
            other => Err(format!("unknown priority level: {}", other)),
        }
    }
}

impl std::fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PriorityLevel::Normal => "normal",
            PriorityLevel::Fast => "fast",
            PriorityLevel::Turbo => "turbo",
        };
        write!(f, "{}", s)
    }
}

/// User trade settings. Snapshotted into `TradingParams` per attempt.
#[derive(Debug, Clone, Deserialize)]
pub struct TradingConfig {
    #[serde(default = "default_buy_amount_sol")]
    pub buy_amount_sol: f64,
    /// Percent, e.g. 15 for 15%
    #[serde(default = "default_slippage_pct")]
    pub slippage_pct: f64,
    /// Wider tolerance used when exiting
    #[serde(default = "default_exit_slippage_pct")]
    pub exit_slippage_pct: f64,
    #[serde(default = "default_priority")]
    pub priority: PriorityLevel,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Swap venues used for route checks and execution, in preference order
    #[serde(default = "default_venues")]
    pub venues: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradabilityConfig {
    #[serde(default = "default_min_liquidity_sol")]
    pub min_liquidity_sol: f64,
    /// Absolute floor applied even if min_liquidity_sol is set lower
    #[serde(default = "default_hard_floor_sol")]
    pub hard_floor_sol: f64,
    /// SOL price in USD used to express stablecoin-side liquidity in SOL
    #[serde(default = "default_sol_usd_rate")]
    pub sol_usd_rate: f64,
    #[serde(default = "default_swap_enabled_statuses")]
    pub swap_enabled_statuses: Vec<u8>,
    #[serde(default = "default_probe_amount_sol")]
    pub probe_amount_sol: f64,
    #[serde(default = "default_probe_slippage_pct")]
    pub probe_slippage_pct: f64,
    #[serde(default = "default_backend_timeout_ms")]
    pub backend_timeout_ms: u64,
    #[serde(default = "default_prover_budget_ms")]
    pub prover_budget_ms: u64,
    #[serde(default = "default_registry_timeout_ms")]
    pub registry_timeout_ms: u64,
    #[serde(default = "default_bonding_timeout_ms")]
    pub bonding_timeout_ms: u64,
    /// Discovery sources allowed through when the registry is down
    #[serde(default)]
    pub trusted_sources: Vec<String>,
    #[serde(default = "default_trusted_source_min_liquidity")]
    pub trusted_source_min_liquidity_sol: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_enrichment_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_enrichment_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_min_backoff_secs")]
    pub min_backoff_secs: u64,
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// How long a found pair's figures are reused
    #[serde(default = "default_found_ttl_secs")]
    pub found_ttl_secs: u64,
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub check_rug_pull: bool,
    #[serde(default = "default_true")]
    pub check_honeypot: bool,
    #[serde(default = "default_true")]
    pub check_mint_authority: bool,
    #[serde(default = "default_true")]
    pub check_freeze_authority: bool,
    #[serde(default)]
    pub min_holders: u32,
    #[serde(default = "default_max_ownership_pct")]
    pub max_ownership_pct: f64,
    #[serde(default = "default_max_risk_score")]
    pub max_risk_score: u32,
    #[serde(default = "default_risk_timeout_ms")]
    pub timeout_ms: u64,
    /// Score reported when the safety service cannot be reached
    #[serde(default = "default_unverified_score")]
    pub unverified_score: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    #[serde(default = "default_fee_buffer_sol")]
    pub fee_buffer_sol: f64,
    #[serde(default = "default_route_check_timeout_ms")]
    pub route_check_timeout_ms: u64,
    #[serde(default = "default_pending_retry_secs")]
    pub pending_retry_secs: u64,
    #[serde(default = "default_expected_network")]
    pub expected_network: String,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_max_open_positions")]
    pub max_open_positions: usize,
    /// How often the queue worker wakes when idle
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExitMonitorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_take_profit_pct")]
    pub take_profit_pct: f64,
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: f64,
    /// Loss (as a positive percent) past which an unsellable token is written off
    #[serde(default = "default_dead_token_loss_pct")]
    pub dead_token_loss_pct: f64,
    #[serde(default = "default_max_sell_attempts")]
    pub max_sell_attempts: u32,
    #[serde(default = "default_true")]
    pub verify_holdings: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SafetyConfig {
    #[serde(default = "default_true")]
    pub require_sell_confirmation: bool,
    #[serde(default = "default_daily_loss_limit")]
    pub daily_loss_limit_sol: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl PersistenceConfig {
    pub fn positions_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join("positions.json")
    }

    pub fn trade_state_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join("trade_state.json")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub name_patterns: Vec<String>,
    #[serde(default)]
    pub blocked_patterns: Vec<String>,
}

// Default value functions
fn default_rpc_endpoint() -> String {
    std::env::var("RPC_ENDPOINT").unwrap_or_else(|_| "https://api.mainnet-beta.solana.com".into())
}

fn default_timeout_ms() -> u64 {
    30000
}

fn default_max_retries() -> u32 {
    3
}

fn default_jupiter_primary_url() -> String {
    "https://lite-api.jup.ag/swap/v1".into()
}

fn default_jupiter_fallback_url() -> String {
    "https://api.jup.ag/swap/v1".into()
}

fn default_raydium_api_url() -> String {
    "https://api-v3.raydium.io".into()
}

fn default_raydium_trade_url() -> String {
    "https://transaction-v1.raydium.io".into()
}

fn default_dexscreener_url() -> String {
    "https://api.dexscreener.com".into()
}

fn default_rugcheck_url() -> String {
    "https://api.rugcheck.xyz".into()
}

fn default_pumpportal_url() -> String {
    "https://pumpportal.fun/api/trade-local".into()
}

fn default_keypair_path() -> String {
    std::env::var("KEYPAIR_PATH").unwrap_or_else(|_| "credentials/keypair.json".into())
}

fn default_buy_amount_sol() -> f64 {
    0.05
}

fn default_slippage_pct() -> f64 {
    15.0
}

fn default_exit_slippage_pct() -> f64 {
    25.0
}

fn default_priority() -> PriorityLevel {
    PriorityLevel::Fast
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_venues() -> Vec<String> {
    vec!["jupiter".into(), "raydium".into()]
}

fn default_min_liquidity_sol() -> f64 {
    20.0
}

fn default_hard_floor_sol() -> f64 {
    5.0
}

fn default_sol_usd_rate() -> f64 {
    150.0
}

fn default_swap_enabled_statuses() -> Vec<u8> {
    vec![1, 6]
}

fn default_probe_amount_sol() -> f64 {
    0.001
}

fn default_probe_slippage_pct() -> f64 {
    15.0
}

fn default_backend_timeout_ms() -> u64 {
    10000
}

fn default_prover_budget_ms() -> u64 {
    15000
}

fn default_registry_timeout_ms() -> u64 {
    8000
}

fn default_bonding_timeout_ms() -> u64 {
    5000
}

fn default_trusted_source_min_liquidity() -> f64 {
    50.0
}

fn default_enrichment_timeout_ms() -> u64 {
    3000
}

fn default_enrichment_attempts() -> u32 {
    3
}

fn default_min_backoff_secs() -> u64 {
    30
}

fn default_max_backoff_secs() -> u64 {
    120
}

fn default_cache_capacity() -> usize {
    1000
}

fn default_found_ttl_secs() -> u64 {
    300
}

fn default_requests_per_minute() -> u32 {
    60
}

fn default_max_ownership_pct() -> f64 {
    30.0
}

fn default_max_risk_score() -> u32 {
    70
}

fn default_risk_timeout_ms() -> u64 {
    5000
}

fn default_unverified_score() -> u32 {
    50
}

fn default_cooldown_ms() -> u64 {
    2000
}

fn default_fee_buffer_sol() -> f64 {
    0.01
}

fn default_route_check_timeout_ms() -> u64 {
    10000
}

fn default_pending_retry_secs() -> u64 {
    60
}

fn default_expected_network() -> String {
    "mainnet-beta".into()
}

fn default_queue_capacity() -> usize {
    256
}

fn default_max_open_positions() -> usize {
    5
}

fn default_tick_ms() -> u64 {
    500
}

fn default_poll_interval_secs() -> u64 {
    20
}

fn default_take_profit_pct() -> f64 {
    50.0
}

fn default_stop_loss_pct() -> f64 {
    30.0
}

fn default_dead_token_loss_pct() -> f64 {
    80.0
}

fn default_max_sell_attempts() -> u32 {
    3
}

fn default_daily_loss_limit() -> f64 {
    1.0
}

fn default_data_dir() -> String {
    "data".into()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            .set_default("rpc.endpoint", default_rpc_endpoint())?
            .set_default("rpc.timeout_ms", default_timeout_ms() as i64)?
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix TRADER_)
            .add_source(
                config::Environment::with_prefix("TRADER")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("tradability.trusted_sources")
                    .with_list_parse_key("trading.venues")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.trading.buy_amount_sol <= 0.0 {
            anyhow::bail!("buy_amount_sol must be positive");
        }

        if self.trading.slippage_pct <= 0.0 || self.trading.slippage_pct > 100.0 {
            anyhow::bail!("slippage_pct must be in (0, 100]");
        }

        if self.trading.exit_slippage_pct <= 0.0 || self.trading.exit_slippage_pct > 100.0 {
            anyhow::bail!("exit_slippage_pct must be in (0, 100]");
        }

        if self.trading.max_retries == 0 {
            anyhow::bail!("max_retries must be at least 1");
        }

        if self.trading.venues.is_empty() {
            anyhow::bail!("at least one swap venue is required");
        }

        for venue in &self.trading.venues {
            if !matches!(venue.as_str(), "jupiter" | "raydium" | "pumpportal") {
                anyhow::bail!("unknown swap venue: {}", venue);
            }
        }

        if self.tradability.min_liquidity_sol < 0.0 || self.tradability.hard_floor_sol < 0.0 {
            anyhow::bail!("liquidity thresholds cannot be negative");
        }

        if self.tradability.sol_usd_rate <= 0.0 {
            anyhow::bail!("sol_usd_rate must be positive");
        }

        if self.tradability.probe_amount_sol <= 0.0 {
            anyhow::bail!("probe_amount_sol must be positive");
        }

        if self.enrichment.min_backoff_secs > self.enrichment.max_backoff_secs {
            anyhow::bail!("enrichment min_backoff_secs exceeds max_backoff_secs");
        }

        if self.orchestrator.cooldown_ms == 0 {
            anyhow::bail!("cooldown_ms must be non-zero");
        }

        if self.exit_monitor.take_profit_pct <= 0.0 {
            anyhow::bail!("take_profit_pct must be positive");
        }

        if self.exit_monitor.stop_loss_pct <= 0.0 || self.exit_monitor.stop_loss_pct >= 100.0 {
            anyhow::bail!("stop_loss_pct must be between 0 and 100");
        }

        if self.safety.daily_loss_limit_sol <= 0.0 {
            anyhow::bail!("daily_loss_limit_sol must be positive");
        }

        // Validate filter patterns (compile regex to check)
        for pattern in &self.filters.name_patterns {
            regex::Regex::new(pattern)
                .with_context(|| format!("Invalid name_pattern regex: {}", pattern))?;
        }

        for pattern in &self.filters.blocked_patterns {
            regex::Regex::new(pattern)
                .with_context(|| format!("Invalid blocked_pattern regex: {}", pattern))?;
        }

        if self.tradability.min_liquidity_sol < self.tradability.hard_floor_sol {
            tracing::warn!(
                "min_liquidity_sol ({}) is below the hard floor ({}); the floor applies",
                self.tradability.min_liquidity_sol,
                self.tradability.hard_floor_sol
            );
        }

        Ok(())
    }

    /// Effective liquidity threshold the pool validator enforces
    pub fn liquidity_threshold_sol(&self) -> f64 {
        self.tradability
            .min_liquidity_sol
            .max(self.tradability.hard_floor_sol)
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  RPC:
    endpoint: {}
    timeout: {}ms
  Endpoints:
    jupiter: {} (fallback {})
    jupiter_api_key: {}
    raydium: {}
    dexscreener: {}
    rugcheck: {}
  Trading:
    buy_amount: {} SOL
    slippage: {}% (exit {}%)
    priority: {}
    max_retries: {}
    venues: {:?}
  Tradability:
    min_liquidity: {} SOL (floor {} SOL)
    sol_usd_rate: {}
    trusted_sources: {:?}
  Risk:
    enabled: {}
    max_risk_score: {}
  Orchestrator:
    cooldown: {}ms
    max_open_positions: {}
    network: {}
  Exit Monitor:
    enabled: {}
    take_profit: {}%
    stop_loss: {}%
    poll_interval: {}s
  Safety:
    daily_loss_limit: {} SOL
"#,
            mask_url(&self.rpc.endpoint),
            self.rpc.timeout_ms,
            mask_url(&self.endpoints.jupiter_primary_url),
            mask_url(&self.endpoints.jupiter_fallback_url),
            if self.endpoints.jupiter_api_key.is_empty() {
                "(not set)"
            } else {
                "***"
            },
            mask_url(&self.endpoints.raydium_api_url),
            mask_url(&self.endpoints.dexscreener_url),
            mask_url(&self.endpoints.rugcheck_url),
            self.trading.buy_amount_sol,
            self.trading.slippage_pct,
            self.trading.exit_slippage_pct,
            self.trading.priority,
            self.trading.max_retries,
            self.trading.venues,
            self.tradability.min_liquidity_sol,
            self.tradability.hard_floor_sol,
            self.tradability.sol_usd_rate,
            self.tradability.trusted_sources,
            self.risk.enabled,
            self.risk.max_risk_score,
            self.orchestrator.cooldown_ms,
            self.orchestrator.max_open_positions,
            self.orchestrator.expected_network,
            self.exit_monitor.enabled,
            self.exit_monitor.take_profit_pct,
            self.exit_monitor.stop_loss_pct,
            self.exit_monitor.poll_interval_secs,
            self.safety.daily_loss_limit_sol,
        )
    }
}

/// Mask URL for display (hide API keys in query params)
fn mask_url(url: &str) -> String {
    if let Some(idx) = url.find('?') {
        format!("{}?***", &url[..idx])
    } else {
        url.to_string()
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: default_rpc_endpoint(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            jupiter_primary_url: default_jupiter_primary_url(),
            jupiter_fallback_url: default_jupiter_fallback_url(),
            jupiter_api_key: String::new(),
            raydium_api_url: default_raydium_api_url(),
            raydium_trade_url: default_raydium_trade_url(),
            dexscreener_url: default_dexscreener_url(),
            rugcheck_url: default_rugcheck_url(),
            pumpportal_url: default_pumpportal_url(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            keypair_path: default_keypair_path(),
        }
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            buy_amount_sol: default_buy_amount_sol(),
            slippage_pct: default_slippage_pct(),
            exit_slippage_pct: default_exit_slippage_pct(),
            priority: default_priority(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            venues: default_venues(),
        }
    }
}

impl Default for TradabilityConfig {
    fn default() -> Self {
        Self {
            min_liquidity_sol: default_min_liquidity_sol(),
            hard_floor_sol: default_hard_floor_sol(),
            sol_usd_rate: default_sol_usd_rate(),
            swap_enabled_statuses: default_swap_enabled_statuses(),
            probe_amount_sol: default_probe_amount_sol(),
            probe_slippage_pct: default_probe_slippage_pct(),
            backend_timeout_ms: default_backend_timeout_ms(),
            prover_budget_ms: default_prover_budget_ms(),
            registry_timeout_ms: default_registry_timeout_ms(),
            bonding_timeout_ms: default_bonding_timeout_ms(),
            trusted_sources: vec![],
            trusted_source_min_liquidity_sol: default_trusted_source_min_liquidity(),
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: default_enrichment_timeout_ms(),
            max_attempts: default_enrichment_attempts(),
            min_backoff_secs: default_min_backoff_secs(),
            max_backoff_secs: default_max_backoff_secs(),
            cache_capacity: default_cache_capacity(),
            found_ttl_secs: default_found_ttl_secs(),
            requests_per_minute: default_requests_per_minute(),
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_rug_pull: true,
            check_honeypot: true,
            check_mint_authority: true,
            check_freeze_authority: true,
            min_holders: 0,
            max_ownership_pct: default_max_ownership_pct(),
            max_risk_score: default_max_risk_score(),
            timeout_ms: default_risk_timeout_ms(),
            unverified_score: default_unverified_score(),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
            fee_buffer_sol: default_fee_buffer_sol(),
            route_check_timeout_ms: default_route_check_timeout_ms(),
            pending_retry_secs: default_pending_retry_secs(),
            expected_network: default_expected_network(),
            queue_capacity: default_queue_capacity(),
            max_open_positions: default_max_open_positions(),
            tick_ms: default_tick_ms(),
        }
    }
}

impl Default for ExitMonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: default_poll_interval_secs(),
            take_profit_pct: default_take_profit_pct(),
            stop_loss_pct: default_stop_loss_pct(),
            dead_token_loss_pct: default_dead_token_loss_pct(),
            max_sell_attempts: default_max_sell_attempts(),
            verify_holdings: true,
        }
    }
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            require_sell_confirmation: true,
            daily_loss_limit_sol: default_daily_loss_limit(),
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc: RpcConfig::default(),
            endpoints: EndpointsConfig::default(),
            wallet: WalletConfig::default(),
            trading: TradingConfig::default(),
            tradability: TradabilityConfig::default(),
            enrichment: EnrichmentConfig::default(),
            risk: RiskConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            exit_monitor: ExitMonitorConfig::default(),
            safety: SafetyConfig::default(),
            persistence: PersistenceConfig::default(),
            filters: FilterConfig::default(),
        }
    }
}
