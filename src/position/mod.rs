//! Position management module
//!
//! - `store`: durable positions and daily stats
//! - `price_feed`: market price for held tokens
//! - `exit_monitor`: take-profit / stop-loss loop

pub mod exit_monitor;
pub mod price_feed;
pub mod store;

pub use exit_monitor::{decide, ExitAction, ExitDecision, ExitMonitor, ExitSettings};
pub use price_feed::{PriceSource, QuotePriceSource};
pub use store::{
    DailyStats, ExitReason, JsonPositionStore, NewPosition, Position, PositionClose, PositionStatus,
    PositionStore,
};
