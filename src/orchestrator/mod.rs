//! Live trading orchestration
//!
//! - `approval`: filter, tradability and risk checks for discovered tokens
//! - `gate`: wallet and safety prerequisites
//! - `trade_state`: durable per-mint dedup
//! - `live`: queue, single-flight execution and cooldown

pub mod approval;
pub mod gate;
pub mod live;
pub mod trade_state;

pub use approval::{Approval, ApprovalGate, ApprovedToken, RejectedBy};
pub use gate::{check_prerequisites, GateSettings, GateStatus};
pub use live::{LiveOrchestrator, OrchestratorSettings, TradeOutcome};
pub use trade_state::{Eligibility, TradeState, TradeStateStore};
