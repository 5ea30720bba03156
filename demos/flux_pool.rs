//! # Flux Pool Example
//!
//! Wires the SDK against a live RPC endpoint and prints every Flux market with
//! its APR, APY and total supply.
//!
//! ## Prerequisites
//!
//! - Set `SDK_RPC_HTTP_URL` to an Ethereum mainnet endpoint (or configure `Config.toml`)
//! - Optionally set `SDK_CACHE_METADATA_DIR` (defaults to `./metadata`)
//!
//! The first run builds the market metadata and writes
//! `<metadata dir>/flux/pool/1.json`; later runs read it from disk.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --example flux_pool
//! ```

use anyhow::Result;
use defi_adapters_sdk::{
    adapters::FluxPoolAdapter,
    protocol_adapter::{ProtocolAdapter, RateQuery},
    rpc::ContractReader,
    settings::Settings,
    storage::{FileStore, MetadataStore},
    types::conversions::{address_to_string, u256_to_decimal},
};
use ethers::prelude::{Http, Provider};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();
    defi_adapters_sdk::metrics::describe_metrics();

    // 1. Load settings from config file or environment
    let settings = Settings::new()?;
    println!("Settings loaded (rpc: {}, chain id: {})", settings.rpc.http_url, settings.rpc.chain_id);

    // 2. Collaborators: provider for reads, file store for metadata
    let provider = Provider::<Http>::try_from(settings.rpc.http_url.as_str())?;
    let reader: Arc<dyn ContractReader> = Arc::new(provider);
    let store: Arc<dyn MetadataStore> = Arc::new(FileStore::new(&settings.cache.metadata_dir));

    // 3. Adapter
    let adapter = FluxPoolAdapter::from_settings(&settings, reader, store)?;
    let details = adapter.protocol_details();
    println!("{} ({}) on {}: {}", details.name, details.product_id, details.chain, details.site_url);

    // 4. Markets with rates
    for token in adapter.get_protocol_tokens().await? {
        let apr = adapter.get_apr(token.address, RateQuery::default()).await?;
        let apy = adapter.get_apy(token.address, RateQuery::default()).await?;
        println!(
            "  {:<8} {}  APR {:>6.2}%  APY {:>6.2}%",
            token.symbol,
            address_to_string(token.address),
            apr.apr_percent,
            apy.apy_percent
        );
    }

    // 5. Total value locked, scaled for display only
    for tvl in adapter.get_total_value_locked(None, None).await? {
        match u256_to_decimal(tvl.total_supply_raw, tvl.token.decimals) {
            Ok(amount) => println!("  {:<8} total supply {}", tvl.token.symbol, amount),
            Err(e) => println!("  {:<8} total supply {} (raw, {})", tvl.token.symbol, tvl.total_supply_raw, e),
        }
    }

    Ok(())
}
