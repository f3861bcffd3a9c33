//! Wallet capability
//!
//! The trader only needs to know whether a wallet is usable (connected,
//! right network, funded) and how many tokens it holds. Signing lives in
//! [`crate::trading::signer`]; nothing here touches key material.

pub mod rpc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use rpc::{RpcHoldings, RpcWallet};

use crate::error::Result;

/// Point-in-time view of the trading wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSnapshot {
    pub is_connected: bool,
    pub network: String,
    pub address: String,
    pub balance_sol: f64,
}

impl WalletSnapshot {
    pub fn disconnected() -> Self {
        Self {
            is_connected: false,
            network: "unknown".to_string(),
            address: String::new(),
            balance_sol: 0.0,
        }
    }
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn snapshot(&self) -> Result<WalletSnapshot>;
}

/// Token balances held by the trading wallet
#[async_trait]
pub trait HoldingsReader: Send + Sync {
    /// Base units of `mint` across all of the wallet's token accounts
    async fn token_balance(&self, mint: &str) -> Result<u64>;
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use crate::error::Error;
    use std::collections::HashMap;
    use std::sync::Mutex;

    pub struct MockWallet {
        pub snapshot: Mutex<WalletSnapshot>,
    }

    impl MockWallet {
        pub fn funded(balance_sol: f64) -> Self {
            Self {
                snapshot: Mutex::new(WalletSnapshot {
                    is_connected: true,
                    network: "mainnet-beta".to_string(),
                    address: "Wallet1111111111111111111111111111111111111".to_string(),
                    balance_sol,
                }),
            }
        }

        pub fn disconnected() -> Self {
            Self {
                snapshot: Mutex::new(WalletSnapshot::disconnected()),
            }
        }

        pub fn set_balance(&self, balance_sol: f64) {
            self.snapshot.lock().unwrap().balance_sol = balance_sol;
        }
    }

    #[async_trait]
    impl WalletProvider for MockWallet {
        async fn snapshot(&self) -> Result<WalletSnapshot> {
            Ok(self.snapshot.lock().unwrap().clone())
        }
    }

    /// Balances keyed by mint; unknown mints error unless `default` is set
    #[derive(Default)]
    pub struct MockHoldings {
        pub balances: Mutex<HashMap<String, u64>>,
        pub default: Option<u64>,
    }

    impl MockHoldings {
        pub fn holding_everything() -> Self {
            Self {
                balances: Mutex::new(HashMap::new()),
                default: Some(u64::MAX),
            }
        }

        pub fn set(&self, mint: &str, amount: u64) {
            self.balances.lock().unwrap().insert(mint.to_string(), amount);
        }
    }

    #[async_trait]
    impl HoldingsReader for MockHoldings {
        async fn token_balance(&self, mint: &str) -> Result<u64> {
            if let Some(amount) = self.balances.lock().unwrap().get(mint) {
                return Ok(*amount);
            }
            self.default
                .ok_or_else(|| Error::Rpc(format!("no balance for {}", mint)))
        }
    }
}
