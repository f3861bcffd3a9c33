//! Candidate tokens as delivered by the discovery feed

use serde::{Deserialize, Serialize};

/// Where a token sits in its launch lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenStage {
    /// Still trading against the pre-AMM bonding curve
    Bonding,
    /// Pool validated and swappable, not yet on the pair indexer
    LpLive,
    /// Pool validated, indexer has no pair yet
    Indexing,
    /// Indexer confirms a pair
    Listed,
}

impl std::fmt::Display for TokenStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TokenStage::Bonding => "BONDING",
            TokenStage::LpLive => "LP_LIVE",
            TokenStage::Indexing => "INDEXING",
            TokenStage::Listed => "LISTED",
        };
        write!(f, "{}", s)
    }
}

/// A discovered token that has not been traded yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateToken {
    /// Mint address
    pub address: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    /// Discovery source label, matched against the trust list
    #[serde(default)]
    pub source: String,
    /// Liquidity estimate in SOL from the scanner
    #[serde(default)]
    pub liquidity: f64,
    #[serde(default)]
    pub buyer_rank: Option<u32>,
    #[serde(default)]
    pub risk_score: Option<u32>,
    #[serde(default)]
    pub is_tradeable: bool,
    #[serde(default)]
    pub can_buy: bool,
    #[serde(default)]
    pub can_sell: bool,
    #[serde(default)]
    pub stage: Option<TokenStage>,
    /// Set by the scanner when the token is too new to be indexed anywhere
    #[serde(default)]
    pub awaiting_indexing: bool,
}

impl CandidateToken {
    pub fn new(address: impl Into<String>, symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        Self {
            address: address.into(),
            name: symbol.clone(),
            symbol,
            source: String::new(),
            liquidity: 0.0,
            buyer_rank: None,
            risk_score: None,
            is_tradeable: false,
            can_buy: false,
            can_sell: false,
            stage: None,
            awaiting_indexing: false,
        }
    }

    /// Symbol for display, falling back to a shortened mint
    pub fn display_symbol(&self) -> String {
        if self.symbol.trim().is_empty() {
            short_mint(&self.address)
        } else {
            self.symbol.clone()
        }
    }
}

/// First 8 chars of a mint, for log lines
pub fn short_mint(mint: &str) -> String {
    mint.chars().take(8).collect()
}
