//! Interest-rate and exchange-rate arithmetic for lending markets.
//!
//! Balances stay in raw `U256` fixed point end to end. Only per-interval
//! interest rates are converted to `f64`, since annualisation needs `powf`
//! and the result is a display percentage.

use crate::types::conversions::{u256_to_decimal, ConversionError};
use ethers::types::U256;
use rust_decimal::prelude::ToPrimitive;

/// Decimals of the fixed-point format used for Compound-style rates (1e18 = 1.0).
pub const WAD_DECIMALS: u8 = 18;

// 10^77 is the largest power of ten that fits in a U256
const MAX_U256_EXP10: u8 = 77;

/// Converts a raw per-interval rate (18-decimal fixed point) into a fraction.
pub fn rate_per_interval(rate_raw: U256) -> Result<f64, ConversionError> {
    u256_to_decimal(rate_raw, WAD_DECIMALS)?
        .to_f64()
        .ok_or(ConversionError::Overflow)
}

/// Simple annualised rate: `rate * intervals_per_year`.
pub fn calculate_apr(rate_per_interval: f64, intervals_per_year: u64) -> f64 {
    rate_per_interval * intervals_per_year as f64
}

/// Compounded annualised rate: `(1 + rate)^intervals_per_year - 1`.
pub fn calculate_apy(rate_per_interval: f64, intervals_per_year: u64) -> f64 {
    (1.0 + rate_per_interval).powf(intervals_per_year as f64) - 1.0
}

pub fn percent(fraction: f64) -> f64 {
    fraction * 100.0
}

/// `rate_raw * balance_raw / 10^decimals`, or `None` on overflow.
pub fn underlying_balance(rate_raw: U256, balance_raw: U256, decimals: u8) -> Option<U256> {
    if decimals > MAX_U256_EXP10 {
        return None;
    }
    rate_raw
        .checked_mul(balance_raw)?
        .checked_div(U256::exp10(decimals as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCKS_PER_YEAR: u64 = 2_628_000;

    #[test]
    fn test_apr_scenario() {
        let apr = percent(calculate_apr(0.000_000_1, BLOCKS_PER_YEAR));
        assert!((apr - 26.28).abs() < 1e-9, "apr = {apr}");
    }

    #[test]
    fn test_apy_scenario() {
        let apy = percent(calculate_apy(0.000_000_1, BLOCKS_PER_YEAR));
        let expected = ((1.0f64 + 0.000_000_1).powf(BLOCKS_PER_YEAR as f64) - 1.0) * 100.0;
        assert!((apy - expected).abs() < 1e-9);
        assert!((apy - 30.0567).abs() < 1e-3, "apy = {apy}");
        assert!(apy > 26.28, "compounding must beat the simple rate");
    }

    #[test]
    fn test_zero_rate_is_zero() {
        assert_eq!(calculate_apr(0.0, BLOCKS_PER_YEAR), 0.0);
        assert_eq!(calculate_apy(0.0, BLOCKS_PER_YEAR), 0.0);
    }

    #[test]
    fn test_rate_per_interval_from_wad() {
        // 1e-7 per block as 18-decimal fixed point
        let rate = rate_per_interval(U256::from(100_000_000_000u64)).unwrap();
        assert!((rate - 0.000_000_1).abs() < 1e-18);
        assert!(rate_per_interval(U256::MAX).is_err());
    }

    #[test]
    fn test_underlying_balance_scenario() {
        let rate_raw = U256::from(1_050_000_000_000_000_000u128);
        let balance_raw = U256::from(1_000_000u64);
        let balance = underlying_balance(rate_raw, balance_raw, 6).unwrap();
        assert_eq!(balance, U256::from(1_050_000_000_000_000_000u128));
    }

    #[test]
    fn test_underlying_balance_truncates_toward_zero() {
        // 15 * 3 / 10^2 = 0.45, floored to 0
        let balance = underlying_balance(U256::from(15u64), U256::from(3u64), 2).unwrap();
        assert_eq!(balance, U256::zero());
    }

    #[test]
    fn test_underlying_balance_overflow_is_none() {
        assert!(underlying_balance(U256::MAX, U256::from(2u64), 18).is_none());
        assert!(underlying_balance(U256::one(), U256::one(), 78).is_none());
        assert_eq!(
            underlying_balance(U256::one(), U256::exp10(77), 77),
            Some(U256::one())
        );
    }
}
