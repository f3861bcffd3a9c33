//! Launch trader library
//!
//! Decides whether newly launched Solana tokens are safe and possible to
//! trade, buys them one at a time through a persistent dedup guard and
//! closes positions on take-profit or stop-loss.

pub mod activity;
pub mod cache;
pub mod candidate;
pub mod cli;
pub mod config;
pub mod dexscreener;
pub mod error;
pub mod feed;
pub mod filter;
pub mod orchestrator;
pub mod position;
pub mod pump;
pub mod risk;
pub mod tradability;
pub mod trading;
pub mod wallet;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
