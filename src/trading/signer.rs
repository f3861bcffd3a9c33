//! Transaction signing capability
//!
//! The executor only ever sees this trait; key material stays here.

use async_trait::async_trait;
use base64::Engine as _;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::VersionedTransaction;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Error, Result};

#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Wallet address the transactions are built for
    fn public_key(&self) -> String;

    /// Sign a base64 unsigned transaction, submit it and return the signature
    async fn sign_and_send(&self, unsigned_transaction: &str) -> Result<String>;
}

/// Signs locally with a keypair file and submits through RPC
pub struct KeypairSigner {
    keypair: Arc<Keypair>,
    rpc: Arc<RpcClient>,
}

impl KeypairSigner {
    pub fn new(keypair: Arc<Keypair>, rpc: Arc<RpcClient>) -> Self {
        Self { keypair, rpc }
    }

    /// Load a JSON byte-array keypair (solana-keygen format)
    pub fn from_file<P: AsRef<Path>>(path: P, rpc: Arc<RpcClient>) -> Result<Self> {
        let keypair = load_keypair(path)?;
        info!("Loaded keypair: {}", keypair.pubkey());
        Ok(Self::new(Arc::new(keypair), rpc))
    }
}

pub fn load_keypair<P: AsRef<Path>>(path: P) -> Result<Keypair> {
    let path = path.as_ref();
    let keypair_data = std::fs::read_to_string(path)
        .map_err(|e| Error::InvalidKeypair(format!("{}: {}", path.display(), e)))?;
    let secret_key: Vec<u8> = serde_json::from_str(&keypair_data)
        .map_err(|e| Error::InvalidKeypair(format!("{}: {}", path.display(), e)))?;
    Keypair::from_bytes(&secret_key).map_err(|e| Error::InvalidKeypair(e.to_string()))
}

/// Decode and sign a base64 VersionedTransaction
pub fn sign_transaction(unsigned_transaction: &str, keypair: &Keypair) -> Result<VersionedTransaction> {
    let tx_bytes = base64::engine::general_purpose::STANDARD
        .decode(unsigned_transaction)
        .map_err(|e| Error::Deserialization(format!("transaction base64: {}", e)))?;
    let unsigned: VersionedTransaction = bincode::deserialize(&tx_bytes)
        .map_err(|e| Error::Deserialization(format!("transaction bincode: {}", e)))?;

    VersionedTransaction::try_new(unsigned.message, &[keypair])
        .map_err(|e| Error::SigningRejected(e.to_string()))
}

#[async_trait]
impl TransactionSigner for KeypairSigner {
    fn public_key(&self) -> String {
        self.keypair.pubkey().to_string()
    }

    async fn sign_and_send(&self, unsigned_transaction: &str) -> Result<String> {
        let signed = sign_transaction(unsigned_transaction, &self.keypair)?;

        let signature = self
            .rpc
            .send_and_confirm_transaction(&signed)
            .await
            .map_err(|e| Error::TransactionSend(e.to_string()))?;

        debug!(%signature, "Transaction confirmed");
        Ok(signature.to_string())
    }
}
