//! Pump.fun account structures
//!
//! # WARNING: These structures may change without notice
//! If deserialization fails, the layout may need updating.

use borsh::{BorshDeserialize, BorshSerialize};

use super::program::{ACCOUNT_DISCRIMINATORS, INITIAL_REAL_TOKEN_RESERVES, TOKEN_DECIMALS};
use crate::error::{Error, Result};

const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// BondingCurve account - stores the bonding curve state for a token
#[derive(Debug, Clone, BorshDeserialize, BorshSerialize)]
pub struct BondingCurve {
    _discriminator: [u8; 8],

    /// Virtual SOL reserves for price calculation
    pub virtual_sol_reserves: u64,

    /// Virtual token reserves for price calculation
    pub virtual_token_reserves: u64,

    /// Real SOL reserves (actual SOL held in bonding curve)
    pub real_sol_reserves: u64,

    /// Real token reserves (actual tokens held in bonding curve)
    pub real_token_reserves: u64,

    pub token_total_supply: u64,

    /// Set once the curve has migrated to an AMM pool
    pub complete: bool,
}

impl BondingCurve {
    #[cfg(test)]
    pub fn new_for_test(
        virtual_sol_reserves: u64,
        virtual_token_reserves: u64,
        real_token_reserves: u64,
        complete: bool,
    ) -> Self {
        Self {
            _discriminator: ACCOUNT_DISCRIMINATORS::BONDING_CURVE,
            virtual_sol_reserves,
            virtual_token_reserves,
            real_sol_reserves: 0,
            real_token_reserves,
            token_total_supply: 1_000_000_000_000_000,
            complete,
        }
    }

    /// Deserialize from account data, checking the discriminator
    pub fn try_from_slice(data: &[u8]) -> Result<Self> {
        if data.len() < 8 {
            return Err(Error::BondingCurveDecode(
                "Account data too short".to_string(),
            ));
        }

        let discriminator: [u8; 8] = data[..8]
            .try_into()
            .map_err(|_| Error::BondingCurveDecode("Invalid discriminator".to_string()))?;

        if discriminator != ACCOUNT_DISCRIMINATORS::BONDING_CURVE {
            return Err(Error::BondingCurveDecode(format!(
                "Wrong discriminator: expected {:?}, got {:?}",
                ACCOUNT_DISCRIMINATORS::BONDING_CURVE,
                discriminator
            )));
        }

        // Newer curves carry trailing fields (creator); only the prefix is read
        let mut slice = data;
        <Self as BorshDeserialize>::deserialize(&mut slice)
            .map_err(|e| Error::BondingCurveDecode(format!("Borsh decode failed: {}", e)))
    }

    /// Price in SOL per whole token
    pub fn price_sol(&self) -> Result<f64> {
        if self.virtual_token_reserves == 0 {
            return Err(Error::PriceOverflow);
        }

        let sol = self.virtual_sol_reserves as f64 / LAMPORTS_PER_SOL;
        let tokens = self.virtual_token_reserves as f64 / 10f64.powi(TOKEN_DECIMALS as i32);
        Ok(sol / tokens)
    }

    /// Percent of the sellable supply already bought off the curve
    pub fn progress_pct(&self) -> f64 {
        if self.complete {
            return 100.0;
        }
        let sold = INITIAL_REAL_TOKEN_RESERVES.saturating_sub(self.real_token_reserves);
        (sold as f64 / INITIAL_REAL_TOKEN_RESERVES as f64 * 100.0).clamp(0.0, 100.0)
    }

    /// Tokens received for a SOL amount (constant product, lamports in, base units out)
    pub fn calculate_buy_tokens(&self, sol_amount: u64) -> Result<u64> {
        if self.virtual_sol_reserves == 0 || self.virtual_token_reserves == 0 {
            return Err(Error::PriceOverflow);
        }

        let new_sol_reserves = self
            .virtual_sol_reserves
            .checked_add(sol_amount)
            .ok_or(Error::PriceOverflow)?;

        let k = (self.virtual_sol_reserves as u128)
            .checked_mul(self.virtual_token_reserves as u128)
            .ok_or(Error::PriceOverflow)?;

        let new_token_reserves = k
            .checked_div(new_sol_reserves as u128)
            .ok_or(Error::PriceOverflow)?;

        let tokens_out = (self.virtual_token_reserves as u128)
            .checked_sub(new_token_reserves)
            .ok_or(Error::PriceOverflow)?;

        // Cannot buy more than the curve actually holds
        Ok((tokens_out as u64).min(self.real_token_reserves))
    }

    /// Lamports received for selling tokens
    pub fn calculate_sell_sol(&self, token_amount: u64) -> Result<u64> {
        if self.virtual_sol_reserves == 0 || self.virtual_token_reserves == 0 {
            return Err(Error::PriceOverflow);
        }

        let new_token_reserves = self
            .virtual_token_reserves
            .checked_add(token_amount)
            .ok_or(Error::PriceOverflow)?;

        let k = (self.virtual_sol_reserves as u128)
            .checked_mul(self.virtual_token_reserves as u128)
            .ok_or(Error::PriceOverflow)?;

        let new_sol_reserves = k
            .checked_div(new_token_reserves as u128)
            .ok_or(Error::PriceOverflow)?;

        let sol_out = (self.virtual_sol_reserves as u128)
            .checked_sub(new_sol_reserves)
            .ok_or(Error::PriceOverflow)?;

        Ok(sol_out as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_curve() -> BondingCurve {
        BondingCurve::new_for_test(
            30_000_000_000,
            1_073_000_000_000_000,
            INITIAL_REAL_TOKEN_RESERVES,
            false,
        )
    }

    #[test]
    fn test_price_sol() {
        let price = fresh_curve().price_sol().unwrap();
        // 30 SOL / 1.073B tokens
        assert!((price - 2.796e-8).abs() < 1e-10);
    }

    #[test]
    fn test_progress() {
        let mut curve = fresh_curve();
        assert_eq!(curve.progress_pct(), 0.0);

        curve.real_token_reserves = INITIAL_REAL_TOKEN_RESERVES / 2;
        assert!((curve.progress_pct() - 50.0).abs() < 0.01);

        curve.complete = true;
        assert_eq!(curve.progress_pct(), 100.0);
    }

    #[test]
    fn test_buy_then_sell_loses_nothing_to_rounding_upwards() {
        let curve = fresh_curve();
        let tokens = curve.calculate_buy_tokens(1_000_000_000).unwrap();
        assert!(tokens > 0);
        let sol = curve.calculate_sell_sol(tokens).unwrap();
        assert!(sol <= 1_000_000_000);
    }

    #[test]
    fn test_decode_rejects_wrong_discriminator() {
        let data = [0u8; 64];
        assert!(matches!(
            BondingCurve::try_from_slice(&data),
            Err(Error::BondingCurveDecode(_))
        ));
    }

    #[test]
    fn test_decode_with_trailing_bytes() {
        let curve = fresh_curve();
        let mut data = borsh::to_vec(&curve).unwrap();
        data.extend_from_slice(&[7u8; 32]);
        let decoded = BondingCurve::try_from_slice(&data).unwrap();
        assert_eq!(decoded.virtual_sol_reserves, 30_000_000_000);
        assert!(!decoded.complete);
    }
}
