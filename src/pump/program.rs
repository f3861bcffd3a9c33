//! Pump.fun program constants
//!
//! # WARNING: These constants may change without notice
//! Pump.fun has historically modified their program behavior.
//! If account parsing breaks, these values may need to be updated.

use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

/// Pump.fun program ID
pub const PUMP_PROGRAM_ID_STR: &str = "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P";

/// PDA seed for a mint's bonding curve account
pub const BONDING_CURVE_SEED: &[u8] = b"bonding-curve";

/// Pump.fun tokens always use 6 decimals
pub const TOKEN_DECIMALS: u8 = 6;

/// Real token reserves a fresh curve starts with; progress is measured against this
pub const INITIAL_REAL_TOKEN_RESERVES: u64 = 793_100_000_000_000;

lazy_static::lazy_static! {
    /// Pump.fun program ID as Pubkey
    pub static ref PUMP_PROGRAM_ID: Pubkey =
        Pubkey::from_str(PUMP_PROGRAM_ID_STR).expect("Invalid pump program ID");
}

/// Account discriminators (first 8 bytes of account data)
#[allow(non_snake_case)]
pub mod ACCOUNT_DISCRIMINATORS {
    /// BondingCurve account discriminator
    pub const BONDING_CURVE: [u8; 8] = [23, 183, 248, 55, 96, 216, 172, 96];
}

/// Derive the bonding curve PDA for a mint
pub fn derive_bonding_curve(mint: &Pubkey) -> Pubkey {
    let (pda, _bump) =
        Pubkey::find_program_address(&[BONDING_CURVE_SEED, mint.as_ref()], &PUMP_PROGRAM_ID);
    pda
}
