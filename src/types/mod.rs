//! Shared result types returned by protocol adapters.
//!
//! Amounts are always raw on-chain integers (`U256`) scaled by the token's
//! decimals. Converting to human units is left to callers, see
//! [`conversions::u256_to_decimal`].

pub mod chain;
pub mod conversions;

pub use chain::Chain;

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

/// ERC-20 descriptor of a protocol or underlying token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc20Metadata {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Cached description of one pool: the protocol token and what it is a claim on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolMetadata {
    pub protocol_token: Erc20Metadata,
    pub underlying_tokens: Vec<Erc20Metadata>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionType {
    Supply,
    Lend,
    Borrow,
    Staked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetType {
    StandardErc20,
    NonStandardErc20,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenType {
    Protocol,
    Underlying,
    Reward,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolDetails {
    pub protocol_id: String,
    pub name: String,
    pub description: String,
    pub site_url: String,
    pub icon_url: String,
    pub position_type: PositionType,
    pub chain: Chain,
    pub product_id: String,
    pub asset_type: AssetType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    #[serde(flatten)]
    pub token: Erc20Metadata,
    pub balance_raw: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Underlying {
    #[serde(flatten)]
    pub token: Erc20Metadata,
    pub balance_raw: U256,
    #[serde(rename = "type")]
    pub token_type: TokenType,
}

/// A user's holding of one protocol token together with its underlying value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolPosition {
    #[serde(flatten)]
    pub token: Erc20Metadata,
    pub balance_raw: U256,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub tokens: Vec<Underlying>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnderlyingTokenRate {
    #[serde(flatten)]
    pub token: Erc20Metadata,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub underlying_rate_raw: U256,
}

/// Exchange rate of one whole protocol token (`base_rate`) into its underlyings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolTokenUnderlyingRate {
    #[serde(flatten)]
    pub token: Erc20Metadata,
    pub base_rate: u64,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub tokens: Vec<UnderlyingTokenRate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolTokenApr {
    #[serde(flatten)]
    pub token: Erc20Metadata,
    /// Annual percentage rate, in percent (26.28 means 26.28%)
    pub apr_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolTokenApy {
    #[serde(flatten)]
    pub token: Erc20Metadata,
    /// Annual percentage yield, in percent
    pub apy_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolTokenTvl {
    #[serde(flatten)]
    pub token: Erc20Metadata,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub total_supply_raw: U256,
}
