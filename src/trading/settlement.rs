//! Realized fill lookup
//!
//! Reads a confirmed transaction's balance changes so entry and exit prices
//! come from what actually moved, not from the quote.

use async_trait::async_trait;
use solana_account_decoder::parse_token::UiTokenAmount;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcTransactionConfig;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signature::Signature;
use solana_transaction_status::{UiTransactionEncoding, UiTransactionTokenBalance};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};

/// Balance changes a transaction caused for one wallet and one mint
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    /// Lamports gained (negative when spent), network fee excluded
    pub sol_change_lamports: i64,
    /// Token base units gained (negative when sold)
    pub token_change: i128,
    pub token_decimals: u8,
    pub fee_lamports: u64,
}

#[async_trait]
pub trait Settlement: Send + Sync {
    async fn settle(&self, signature: &str, owner: &str, mint: &str) -> Result<Fill>;
}

pub struct RpcSettlement {
    rpc: Arc<RpcClient>,
    attempts: u32,
    delay: Duration,
}

impl RpcSettlement {
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self {
            rpc,
            attempts: 5,
            delay: Duration::from_secs(1),
        }
    }
}

#[async_trait]
impl Settlement for RpcSettlement {
    async fn settle(&self, signature: &str, owner: &str, mint: &str) -> Result<Fill> {
        let sig = Signature::from_str(signature)
            .map_err(|e| Error::Settlement(format!("bad signature: {}", e)))?;
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Json),
            commitment: Some(CommitmentConfig::confirmed()),
            max_supported_transaction_version: Some(0),
        };

        let mut last_error = String::from("not attempted");
        for attempt in 1..=self.attempts {
            match self.rpc.get_transaction_with_config(&sig, config).await {
                Ok(tx) => {
                    let meta = tx
                        .transaction
                        .meta
                        .ok_or_else(|| Error::Settlement("transaction has no meta".to_string()))?;

                    if let Some(err) = meta.err {
                        return Err(Error::Settlement(format!("transaction failed: {}", err)));
                    }

                    let pre: Option<Vec<UiTransactionTokenBalance>> = meta.pre_token_balances.into();
                    let post: Option<Vec<UiTransactionTokenBalance>> = meta.post_token_balances.into();
                    let pre = pre.unwrap_or_default();
                    let post = post.unwrap_or_default();

                    // Account 0 is the fee payer, which is our wallet
                    let sol_before = meta.pre_balances.first().copied().unwrap_or(0) as i64;
                    let sol_after = meta.post_balances.first().copied().unwrap_or(0) as i64;

                    return Ok(Fill {
                        sol_change_lamports: sol_after - sol_before + meta.fee as i64,
                        token_change: owner_balance(&post, owner, mint)
                            - owner_balance(&pre, owner, mint),
                        token_decimals: token_decimals(&post, mint)
                            .or_else(|| token_decimals(&pre, mint))
                            .unwrap_or(6),
                        fee_lamports: meta.fee,
                    });
                }
                Err(e) => {
                    last_error = e.to_string();
                    debug!(attempt, %signature, "Transaction not available yet: {}", last_error);
                    tokio::time::sleep(self.delay).await;
                }
            }
        }

        Err(Error::Settlement(last_error))
    }
}

/// Sum of `owner`'s token balance for `mint` across all token accounts
pub fn owner_balance(balances: &[UiTransactionTokenBalance], owner: &str, mint: &str) -> i128 {
    balances
        .iter()
        .filter(|b| b.mint == mint)
        .filter(|b| {
            let balance_owner: Option<String> = b.owner.clone().into();
            balance_owner.as_deref() == Some(owner)
        })
        .map(|b| parse_ui_amount(&b.ui_token_amount))
        .sum()
}

fn token_decimals(balances: &[UiTransactionTokenBalance], mint: &str) -> Option<u8> {
    balances
        .iter()
        .find(|b| b.mint == mint)
        .map(|b| b.ui_token_amount.decimals)
}

fn parse_ui_amount(amount: &UiTokenAmount) -> i128 {
    amount.amount.parse::<i128>().unwrap_or(0)
}


#[cfg(test)]
mod tests {
    use super::*;
    use solana_transaction_status::option_serializer::OptionSerializer;

    fn balance(owner: &str, mint: &str, amount: &str) -> UiTransactionTokenBalance {
        UiTransactionTokenBalance {
            account_index: 1,
            mint: mint.to_string(),
            ui_token_amount: UiTokenAmount {
                ui_amount: None,
                decimals: 6,
                amount: amount.to_string(),
                ui_amount_string: String::new(),
            },
            owner: OptionSerializer::Some(owner.to_string()),
            program_id: OptionSerializer::None,
        }
    }

    #[test]
    fn test_owner_balance_filters_owner_and_mint() {
        let balances = vec![
            balance("me", "MintX", "1000"),
            balance("me", "MintX", "500"),
            balance("pool", "MintX", "999999"),
            balance("me", "MintY", "7"),
        ];
        assert_eq!(owner_balance(&balances, "me", "MintX"), 1500);
        assert_eq!(owner_balance(&balances, "me", "MintZ"), 0);
        assert_eq!(token_decimals(&balances, "MintX"), Some(6));
    }
}
