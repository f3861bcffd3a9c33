//! Error types for the trader

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the trader
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid keypair: {0}")]
    InvalidKeypair(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    // RPC errors
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("RPC timeout after {0}ms")]
    RpcTimeout(u64),

    // Upstream service errors
    #[error("No route: {0}")]
    NoRoute(String),

    #[error("Rate limited by {0}")]
    RateLimited(String),

    #[error("Upstream {service} returned {status}")]
    Upstream { service: String, status: u16 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("{0} timed out")]
    Timeout(String),

    // Pump.fun protocol errors
    #[error("Bonding curve decode failed: {0}")]
    BondingCurveDecode(String),

    #[error("Price calculation overflow")]
    PriceOverflow,

    // Trading errors
    #[error("Transaction build failed: {0}")]
    TransactionBuild(String),

    #[error("Transaction send failed: {0}")]
    TransactionSend(String),

    #[error("Signing rejected: {0}")]
    SigningRejected(String),

    #[error("Settlement unavailable: {0}")]
    Settlement(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // Position management errors
    #[error("Position not found: {0}")]
    PositionNotFound(String),

    #[error("Position already closed: {0}")]
    PositionClosed(String),

    #[error("Position persistence failed: {0}")]
    PositionPersistence(String),

    // Trade state errors
    #[error("Trade state persistence failed: {0}")]
    TradeState(String),

    #[error("Illegal trade state transition for {mint}: {from} -> {to}")]
    IllegalTransition {
        mint: String,
        from: String,
        to: String,
    },

    // Wallet errors
    #[error("Wallet not ready: {0}")]
    WalletNotReady(String),

    #[error("Insufficient balance: {available}SOL available, {required}SOL required")]
    InsufficientBalance { available: f64, required: f64 },

    // Filter errors
    #[error("Invalid regex pattern: {0}")]
    InvalidRegex(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is retryable (transient)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Rpc(_)
                | Error::RpcTimeout(_)
                | Error::RateLimited(_)
                | Error::Network(_)
                | Error::Timeout(_)
                | Error::TransactionSend(_)
        ) || matches!(self, Error::Upstream { status, .. } if *status >= 500)
    }

    /// Liquidity/route class failures leave a token eligible for a later retry
    pub fn is_route_class(&self) -> bool {
        match self {
            Error::NoRoute(_) => true,
            Error::TransactionBuild(msg) | Error::TransactionSend(msg) => {
                let msg = msg.to_ascii_lowercase();
                msg.contains("no route")
                    || msg.contains("route not found")
                    || msg.contains("liquidity")
                    || msg.contains("could not find any route")
            }
            _ => false,
        }
    }

    /// Short, bounded reason string suitable for persisting
    pub fn short_reason(&self) -> String {
        let mut reason = self.to_string();
        if reason.len() > 120 {
            let mut cut = 120;
            while !reason.is_char_boundary(cut) {
                cut -= 1;
            }
            reason.truncate(cut);
        }
        reason
    }
}

// Conversion from solana_client errors
impl From<solana_client::client_error::ClientError> for Error {
    fn from(e: solana_client::client_error::ClientError) -> Self {
        Error::Rpc(e.to_string())
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        let host = e
            .url()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "request".to_string());

        if e.is_timeout() {
            Error::Timeout(host)
        } else if let Some(status) = e.status() {
            Error::Upstream {
                service: host,
                status: status.as_u16(),
            }
        } else {
            Error::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_class() {
        assert!(Error::NoRoute("jupiter".into()).is_route_class());
        assert!(Error::TransactionBuild("Could not find any route".into()).is_route_class());
        assert!(!Error::SigningRejected("user declined".into()).is_route_class());
    }

    #[test]
    fn test_retryable() {
        assert!(Error::RateLimited("jupiter".into()).is_retryable());
        assert!(Error::Upstream { service: "x".into(), status: 503 }.is_retryable());
        assert!(!Error::Upstream { service: "x".into(), status: 400 }.is_retryable());
        assert!(!Error::NoRoute("x".into()).is_retryable());
    }

    #[test]
    fn test_short_reason_is_bounded() {
        let err = Error::Internal("x".repeat(500));
        assert!(err.short_reason().len() <= 120);
    }
}
