//! Pump.fun protocol module
//!
//! # WARNING: Protocol Instability
//! Pump.fun has historically changed program behavior without notice.
//! The constants and structures in this module may break silently.

pub mod accounts;
pub mod curve;
pub mod program;

pub use accounts::BondingCurve;
pub use curve::{BondingCurveSource, CurveStatus, RpcBondingCurveSource};
pub use program::PUMP_PROGRAM_ID;
