//! RPC-backed wallet and holdings readers

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_request::TokenAccountsFilter;
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{HoldingsReader, WalletProvider, WalletSnapshot};
use crate::error::{Error, Result};

const MAINNET_GENESIS: &str = "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdpKuc147dw2N9d";
const DEVNET_GENESIS: &str = "EtWTRABZaYq6iMfeYKouRu166VU2xqa1wcaWoxPkrZBG";
const TESTNET_GENESIS: &str = "4uhcVJyU9pJkvQyS88uRDiswHXSCkY3zQawwpjk2NsNY";

/// Cluster name for a genesis hash
pub fn network_from_genesis(hash: &str) -> &'static str {
    match hash {
        MAINNET_GENESIS => "mainnet-beta",
        DEVNET_GENESIS => "devnet",
        TESTNET_GENESIS => "testnet",
        _ => "localnet",
    }
}

pub struct RpcWallet {
    rpc: Arc<RpcClient>,
    address: Pubkey,
}

impl RpcWallet {
    pub fn new(rpc: Arc<RpcClient>, address: Pubkey) -> Self {
        Self { rpc, address }
    }
}

#[async_trait]
impl WalletProvider for RpcWallet {
    async fn snapshot(&self) -> Result<WalletSnapshot> {
        let genesis = match self.rpc.get_genesis_hash().await {
            Ok(hash) => hash.to_string(),
            Err(e) => {
                warn!("RPC unreachable while reading wallet: {}", e);
                return Ok(WalletSnapshot {
                    address: self.address.to_string(),
                    ..WalletSnapshot::disconnected()
                });
            }
        };

        let lamports = self.rpc.get_balance(&self.address).await?;

        Ok(WalletSnapshot {
            is_connected: true,
            network: network_from_genesis(&genesis).to_string(),
            address: self.address.to_string(),
            balance_sol: lamports as f64 / LAMPORTS_PER_SOL as f64,
        })
    }
}

pub struct RpcHoldings {
    rpc: Arc<RpcClient>,
    owner: Pubkey,
}

impl RpcHoldings {
    pub fn new(rpc: Arc<RpcClient>, owner: Pubkey) -> Self {
        Self { rpc, owner }
    }
}

#[async_trait]
impl HoldingsReader for RpcHoldings {
    async fn token_balance(&self, mint: &str) -> Result<u64> {
        let mint_key = Pubkey::from_str(mint).map_err(|e| Error::InvalidAddress(e.to_string()))?;
        let accounts = self
            .rpc
            .get_token_accounts_by_owner(&self.owner, TokenAccountsFilter::Mint(mint_key))
            .await?;

        let mut total: u64 = 0;
        for account in accounts {
            let data = serde_json::to_value(&account.account.data)?;
            total = total.saturating_add(parsed_amount(&data, mint));
        }

        debug!(mint = %mint, total, "Token balance");
        Ok(total)
    }
}

/// Raw amount from a jsonParsed token account, zero if it is for another mint
fn parsed_amount(data: &serde_json::Value, mint: &str) -> u64 {
    let Some(info) = data.get("parsed").and_then(|p| p.get("info")) else {
        return 0;
    };
    if info.get("mint").and_then(|m| m.as_str()) != Some(mint) {
        return 0;
    }
    info.get("tokenAmount")
        .and_then(|t| t.get("amount"))
        .and_then(|a| a.as_str())
        .and_then(|a| a.parse().ok())
        .unwrap_or(0)
}
