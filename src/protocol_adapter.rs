//! # Protocol Adapter Trait
//!
//! This module defines the read interface every protocol integration exposes.
//! Callers get protocol details, protocol tokens, user positions, exchange
//! rates, APR/APY and TVL without knowing the protocol's contracts.
//!
//! ## Overview
//!
//! An adapter is a (protocol, chain, product) triple. It holds its own
//! [`MetadataCache`](crate::cache::MetadataCache) for the slow-changing
//! token/pool metadata and a [`ContractReader`](crate::rpc::ContractReader)
//! for live reads. Both are injected at construction, so adapters carry no
//! global state and can run against fake readers in tests.
//!
//! ## Adding a New Protocol
//!
//! 1. Add the read-only ABIs to `contracts/`
//! 2. Implement [`ProtocolAdapter`] in `adapters/<protocol>.rs`
//! 3. Build metadata through `MetadataCache::get_or_build` so it is fetched once
//!
//! See `src/adapters/flux.rs` for a complete implementation.

use crate::cache::CacheError;
use crate::rpc::ReadError;
use crate::types::conversions::ConversionError;
use crate::types::{
    Chain, Erc20Metadata, ProtocolDetails, ProtocolPosition, ProtocolTokenApr, ProtocolTokenApy,
    ProtocolTokenTvl, ProtocolTokenUnderlyingRate, TokenBalance, Underlying,
};
use async_trait::async_trait;
use ethers::types::Address;

/// Errors returned by adapter operations.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The address is not a protocol token of this adapter's metadata.
    #[error("protocol token {address:?} not found in {protocol}/{chain}/{product} metadata")]
    NotFoundInMetadata {
        protocol: String,
        chain: Chain,
        product: String,
        address: Address,
    },
    #[error(transparent)]
    Metadata(#[from] CacheError),
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error("pool {protocol_token:?} has no underlying token")]
    MissingUnderlying { protocol_token: Address },
    #[error("arithmetic overflow computing {what} for {protocol_token:?}")]
    Overflow {
        protocol_token: Address,
        what: &'static str,
    },
    #[error("unexpected response from {contract:?}: {reason}")]
    UnexpectedResponse { contract: Address, reason: String },
}

/// Options for APR/APY queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateQuery {
    /// Historical block to read at; latest when `None`.
    pub block: Option<u64>,
    /// Compounding intervals per year; the protocol's own constant when `None`.
    pub intervals_per_year: Option<u64>,
}

impl RateQuery {
    pub fn at_block(block: u64) -> Self {
        Self { block: Some(block), ..Self::default() }
    }

    pub fn with_intervals_per_year(mut self, intervals: u64) -> Self {
        self.intervals_per_year = Some(intervals);
        self
    }
}

/// The read interface of a protocol integration.
///
/// All amounts are raw on-chain integers. Methods taking `block` read at that
/// historical block when given. Metadata is served from the adapter's cache;
/// rates, balances and supplies are always read live.
///
/// # Thread Safety
///
/// Adapters must be `Send + Sync`; one instance is shared by concurrent callers.
#[async_trait]
pub trait ProtocolAdapter: Send + Sync {
    fn protocol_id(&self) -> &str;

    fn chain(&self) -> Chain;

    fn product_id(&self) -> &str;

    /// Static description of the protocol product.
    fn protocol_details(&self) -> ProtocolDetails;

    /// Descriptors of every protocol token, from cached metadata.
    async fn get_protocol_tokens(&self) -> Result<Vec<Erc20Metadata>, AdapterError>;

    /// Non-zero holdings of `user`, optionally restricted to `protocol_tokens`.
    async fn get_positions(
        &self,
        user: Address,
        protocol_tokens: Option<&[Address]>,
        block: Option<u64>,
    ) -> Result<Vec<ProtocolPosition>, AdapterError>;

    /// Underlying amounts represented by a protocol token balance.
    ///
    /// Each underlying is `rate_raw * balance_raw / 10^protocol_decimals`,
    /// computed in integer arithmetic.
    async fn get_underlying_token_balances(
        &self,
        protocol_token_balance: &TokenBalance,
        block: Option<u64>,
    ) -> Result<Vec<Underlying>, AdapterError>;

    /// Current conversion rate of one protocol token into its underlyings.
    async fn get_protocol_token_to_underlying_token_rate(
        &self,
        protocol_token: Address,
        block: Option<u64>,
    ) -> Result<ProtocolTokenUnderlyingRate, AdapterError>;

    async fn get_apr(
        &self,
        protocol_token: Address,
        query: RateQuery,
    ) -> Result<ProtocolTokenApr, AdapterError>;

    async fn get_apy(
        &self,
        protocol_token: Address,
        query: RateQuery,
    ) -> Result<ProtocolTokenApy, AdapterError>;

    /// Total supply of every (or each requested) protocol token.
    async fn get_total_value_locked(
        &self,
        protocol_tokens: Option<&[Address]>,
        block: Option<u64>,
    ) -> Result<Vec<ProtocolTokenTvl>, AdapterError>;
}
