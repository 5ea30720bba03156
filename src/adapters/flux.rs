use anyhow::Context;
use async_trait::async_trait;
use ethers::types::Address;
use futures::future::try_join_all;
use log::info;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::cache::{CacheError, CacheKey, MetadataCache};
use crate::contracts::balance_checker::{BalancesCall, BalancesReturn};
use crate::contracts::comptroller::{GetAllMarketsCall, GetAllMarketsReturn};
use crate::contracts::f_token::{
    ExchangeRateStoredCall, ExchangeRateStoredReturn, SupplyRatePerBlockCall,
    SupplyRatePerBlockReturn, TotalSupplyCall, TotalSupplyReturn, UnderlyingCall,
    UnderlyingReturn,
};
use crate::protocol_adapter::{AdapterError, ProtocolAdapter, RateQuery};
use crate::rates;
use crate::rpc::{read_contract, ContractReader};
use crate::settings::Settings;
use crate::storage::MetadataStore;
use crate::token_enricher::TokenEnricher;
use crate::types::conversions::string_to_address;
use crate::types::{
    AssetType, Chain, Erc20Metadata, PoolMetadata, PositionType, ProtocolDetails,
    ProtocolPosition, ProtocolTokenApr, ProtocolTokenApy, ProtocolTokenTvl,
    ProtocolTokenUnderlyingRate, TokenBalance, TokenType, Underlying, UnderlyingTokenRate,
};

pub const PROTOCOL_ID: &str = "flux";
pub const PRODUCT_ID: &str = "pool";

/// Expected blocks per year on Ethereum (12s blocks).
pub const EXPECTED_BLOCKS_PER_YEAR: u64 = 2_628_000;

/// Cached Flux metadata: protocol token address -> pool description.
pub type FluxPoolMetadata = BTreeMap<Address, PoolMetadata>;

/// Deployment addresses and constants of a Flux pool adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FluxConfig {
    pub comptroller: Address,
    pub balance_checker: Address,
    pub blocks_per_year: u64,
}

impl FluxConfig {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let flux = &settings.protocols.flux;
        Ok(Self {
            comptroller: string_to_address(&flux.comptroller)
                .context("protocols.flux.comptroller")?,
            balance_checker: string_to_address(&settings.contracts.balance_checker)
                .context("contracts.balance_checker")?,
            blocks_per_year: flux.blocks_per_year,
        })
    }
}

/// Flux Finance lending pools (Compound-v2 fork).
///
/// Market metadata (fTokens and their underlyings) is built once through the
/// adapter's [`MetadataCache`]; exchange rates, supply rates, balances and
/// total supply are read live.
pub struct FluxPoolAdapter {
    key: CacheKey,
    config: FluxConfig,
    reader: Arc<dyn ContractReader>,
    cache: MetadataCache<FluxPoolMetadata>,
}

impl FluxPoolAdapter {
    pub fn new(
        chain: Chain,
        config: FluxConfig,
        reader: Arc<dyn ContractReader>,
        store: Arc<dyn MetadataStore>,
    ) -> Result<Self, CacheError> {
        Ok(Self {
            key: CacheKey::new(PROTOCOL_ID, chain, PRODUCT_ID)?,
            config,
            reader,
            cache: MetadataCache::new(store),
        })
    }

    pub fn from_settings(
        settings: &Settings,
        reader: Arc<dyn ContractReader>,
        store: Arc<dyn MetadataStore>,
    ) -> anyhow::Result<Self> {
        let chain = settings.chain()?;
        let config = FluxConfig::from_settings(settings)?;
        Ok(Self::new(chain, config, reader, store)?)
    }

    pub fn config(&self) -> &FluxConfig {
        &self.config
    }

    pub fn cache_key(&self) -> &CacheKey {
        &self.key
    }

    /// Market metadata, built on first use and persisted for later runs.
    pub async fn build_metadata(&self) -> Result<Arc<FluxPoolMetadata>, AdapterError> {
        let reader = Arc::clone(&self.reader);
        let comptroller = self.config.comptroller;
        let metadata = self
            .cache
            .get_or_build(&self.key, move || fetch_markets(reader, comptroller))
            .await?;
        Ok(metadata)
    }

    async fn fetch_pool_metadata(&self, protocol_token: Address) -> Result<PoolMetadata, AdapterError> {
        let metadata = self.build_metadata().await?;
        match metadata.get(&protocol_token) {
            Some(pool) => Ok(pool.clone()),
            None => {
                tracing::error!(
                    protocol = PROTOCOL_ID,
                    chain = %self.key.chain(),
                    product = PRODUCT_ID,
                    protocol_token = ?protocol_token,
                    "Protocol token pool not found"
                );
                Err(AdapterError::NotFoundInMetadata {
                    protocol: PROTOCOL_ID.to_string(),
                    chain: self.key.chain(),
                    product: PRODUCT_ID.to_string(),
                    address: protocol_token,
                })
            }
        }
    }

    /// Pools for the requested addresses, or every pool when `filter` is `None`.
    async fn select_pools(&self, filter: Option<&[Address]>) -> Result<Vec<PoolMetadata>, AdapterError> {
        match filter {
            Some(addresses) => {
                let mut pools = Vec::with_capacity(addresses.len());
                for &address in addresses {
                    pools.push(self.fetch_pool_metadata(address).await?);
                }
                Ok(pools)
            }
            None => Ok(self.build_metadata().await?.values().cloned().collect()),
        }
    }

    async fn underlying_rates(
        &self,
        pool: &PoolMetadata,
        block: Option<u64>,
    ) -> Result<Vec<UnderlyingTokenRate>, AdapterError> {
        let protocol_token = pool.protocol_token.address;
        let underlying = pool
            .underlying_tokens
            .first()
            .ok_or(AdapterError::MissingUnderlying { protocol_token })?;

        let rate: ExchangeRateStoredReturn =
            read_contract(&*self.reader, protocol_token, ExchangeRateStoredCall, block).await?;

        Ok(vec![UnderlyingTokenRate {
            token: underlying.clone(),
            token_type: TokenType::Underlying,
            underlying_rate_raw: rate.0,
        }])
    }

    async fn supply_rate_per_block(&self, protocol_token: Address, block: Option<u64>) -> Result<f64, AdapterError> {
        let rate: SupplyRatePerBlockReturn =
            read_contract(&*self.reader, protocol_token, SupplyRatePerBlockCall, block).await?;
        Ok(rates::rate_per_interval(rate.0)?)
    }
}

/// Reads every market from the comptroller and resolves each fToken's underlying.
async fn fetch_markets(
    reader: Arc<dyn ContractReader>,
    comptroller: Address,
) -> anyhow::Result<FluxPoolMetadata> {
    let markets: GetAllMarketsReturn = read_contract(&*reader, comptroller, GetAllMarketsCall, None)
        .await
        .context("listing comptroller markets")?;
    let protocol_tokens = TokenEnricher::fetch_many(&*reader, &markets.0, None)
        .await
        .context("reading fToken metadata")?;

    let mut metadata = FluxPoolMetadata::new();
    for protocol_token in protocol_tokens {
        let underlying: UnderlyingReturn =
            read_contract(&*reader, protocol_token.address, UnderlyingCall, None)
                .await
                .with_context(|| format!("reading underlying of {}", protocol_token.symbol))?;
        let underlying_token = TokenEnricher::fetch_metadata(&*reader, underlying.0, None)
            .await
            .with_context(|| format!("reading underlying metadata of {}", protocol_token.symbol))?;

        metadata.insert(
            protocol_token.address,
            PoolMetadata {
                protocol_token,
                underlying_tokens: vec![underlying_token],
            },
        );
    }

    info!("Flux: discovered {} markets via comptroller {:?}", metadata.len(), comptroller);
    Ok(metadata)
}

#[async_trait]
impl ProtocolAdapter for FluxPoolAdapter {
    fn protocol_id(&self) -> &str {
        PROTOCOL_ID
    }

    fn chain(&self) -> Chain {
        self.key.chain()
    }

    fn product_id(&self) -> &str {
        PRODUCT_ID
    }

    fn protocol_details(&self) -> ProtocolDetails {
        ProtocolDetails {
            protocol_id: PROTOCOL_ID.to_string(),
            name: "Flux".to_string(),
            description: "Flux pool adapter".to_string(),
            site_url: "https://fluxfinance.com".to_string(),
            icon_url: "https://docs.fluxfinance.com/img/favicon.svg".to_string(),
            position_type: PositionType::Lend,
            chain: self.key.chain(),
            product_id: PRODUCT_ID.to_string(),
            asset_type: AssetType::StandardErc20,
        }
    }

    async fn get_protocol_tokens(&self) -> Result<Vec<Erc20Metadata>, AdapterError> {
        let metadata = self.build_metadata().await?;
        Ok(metadata.values().map(|pool| pool.protocol_token.clone()).collect())
    }

    async fn get_positions(
        &self,
        user: Address,
        protocol_tokens: Option<&[Address]>,
        block: Option<u64>,
    ) -> Result<Vec<ProtocolPosition>, AdapterError> {
        let pools = self.select_pools(protocol_tokens).await?;
        if pools.is_empty() {
            return Ok(Vec::new());
        }

        let call = BalancesCall {
            users: vec![user],
            tokens: pools.iter().map(|pool| pool.protocol_token.address).collect(),
        };
        let balances: BalancesReturn =
            read_contract(&*self.reader, self.config.balance_checker, call, block).await?;
        if balances.0.len() != pools.len() {
            return Err(AdapterError::UnexpectedResponse {
                contract: self.config.balance_checker,
                reason: format!("expected {} balances, got {}", pools.len(), balances.0.len()),
            });
        }

        let mut positions = Vec::new();
        for (pool, balance_raw) in pools.into_iter().zip(balances.0) {
            if balance_raw.is_zero() {
                continue;
            }
            let balance = TokenBalance {
                token: pool.protocol_token,
                balance_raw,
            };
            let tokens = self.get_underlying_token_balances(&balance, block).await?;
            positions.push(ProtocolPosition {
                token: balance.token,
                balance_raw,
                token_type: TokenType::Protocol,
                tokens,
            });
        }
        Ok(positions)
    }

    async fn get_underlying_token_balances(
        &self,
        protocol_token_balance: &TokenBalance,
        block: Option<u64>,
    ) -> Result<Vec<Underlying>, AdapterError> {
        let protocol_token = protocol_token_balance.token.address;
        let pool = self.fetch_pool_metadata(protocol_token).await?;
        let rates = self.underlying_rates(&pool, block).await?;

        pool.underlying_tokens
            .iter()
            .map(|token| {
                let rate = rates
                    .iter()
                    .find(|rate| rate.token.address == token.address)
                    .ok_or(AdapterError::MissingUnderlying { protocol_token })?;
                let balance_raw = rates::underlying_balance(
                    rate.underlying_rate_raw,
                    protocol_token_balance.balance_raw,
                    protocol_token_balance.token.decimals,
                )
                .ok_or(AdapterError::Overflow {
                    protocol_token,
                    what: "underlying balance",
                })?;
                Ok(Underlying {
                    token: token.clone(),
                    balance_raw,
                    token_type: TokenType::Underlying,
                })
            })
            .collect()
    }

    async fn get_protocol_token_to_underlying_token_rate(
        &self,
        protocol_token: Address,
        block: Option<u64>,
    ) -> Result<ProtocolTokenUnderlyingRate, AdapterError> {
        let pool = self.fetch_pool_metadata(protocol_token).await?;
        let tokens = self.underlying_rates(&pool, block).await?;
        Ok(ProtocolTokenUnderlyingRate {
            token: pool.protocol_token,
            base_rate: 1,
            token_type: TokenType::Protocol,
            tokens,
        })
    }

    async fn get_apr(
        &self,
        protocol_token: Address,
        query: RateQuery,
    ) -> Result<ProtocolTokenApr, AdapterError> {
        let pool = self.fetch_pool_metadata(protocol_token).await?;
        let rate = self.supply_rate_per_block(protocol_token, query.block).await?;
        let intervals = query.intervals_per_year.unwrap_or(self.config.blocks_per_year);
        Ok(ProtocolTokenApr {
            token: pool.protocol_token,
            apr_percent: rates::percent(rates::calculate_apr(rate, intervals)),
        })
    }

    async fn get_apy(
        &self,
        protocol_token: Address,
        query: RateQuery,
    ) -> Result<ProtocolTokenApy, AdapterError> {
        let pool = self.fetch_pool_metadata(protocol_token).await?;
        let rate = self.supply_rate_per_block(protocol_token, query.block).await?;
        let intervals = query.intervals_per_year.unwrap_or(self.config.blocks_per_year);
        Ok(ProtocolTokenApy {
            token: pool.protocol_token,
            apy_percent: rates::percent(rates::calculate_apy(rate, intervals)),
        })
    }

    async fn get_total_value_locked(
        &self,
        protocol_tokens: Option<&[Address]>,
        block: Option<u64>,
    ) -> Result<Vec<ProtocolTokenTvl>, AdapterError> {
        let pools = self.select_pools(protocol_tokens).await?;
        let reader = &*self.reader;
        try_join_all(pools.into_iter().map(|pool| async move {
            let total_supply: TotalSupplyReturn =
                read_contract(reader, pool.protocol_token.address, TotalSupplyCall, block).await?;
            Ok::<_, AdapterError>(ProtocolTokenTvl {
                token: pool.protocol_token,
                token_type: TokenType::Protocol,
                total_supply_raw: total_supply.0,
            })
        }))
        .await
    }
}
