use ethers::types::{Address, U256};
use ethers::utils::to_checksum;
use rust_decimal::Decimal;
use std::str::FromStr;

// Raw on-chain fixed point to decimal, exact while the value fits in 96 bits
pub fn u256_to_decimal(value: U256, decimals: u8) -> Result<Decimal, ConversionError> {
    let as_u128 = u128::try_from(value).map_err(|_| ConversionError::Overflow)?;
    let as_i128 = i128::try_from(as_u128).map_err(|_| ConversionError::Overflow)?;

    Decimal::try_from_i128_with_scale(as_i128, u32::from(decimals))
        .map_err(|e| ConversionError::InvalidDecimal(e.to_string()))
}

// Checksummed form for logs and display. Serde writes addresses as lowercase hex.
pub fn address_to_string(addr: Address) -> String {
    to_checksum(&addr, None)
}

pub fn string_to_address(s: &str) -> Result<Address, ConversionError> {
    Address::from_str(s.trim()).map_err(|e| ConversionError::InvalidAddress(e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("Invalid decimal: {0}")]
    InvalidDecimal(String),
    #[error("Overflow in conversion")]
    Overflow,
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Unsupported chain: {0}")]
    UnsupportedChain(String),
}
