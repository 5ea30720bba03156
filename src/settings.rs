use crate::types::Chain;
use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::env;
use std::str::FromStr;

#[derive(Debug, Deserialize, Clone)]
pub struct Rpc {
    #[serde(default = "default_http_url")]
    pub http_url: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
}

fn default_http_url() -> String {
    "http://127.0.0.1:8545".to_string()
}
fn default_chain_id() -> u64 {
    1 // Ethereum mainnet
}

impl Default for Rpc {
    fn default() -> Self {
        Self {
            http_url: default_http_url(),
            chain_id: default_chain_id(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Cache {
    /// Root directory of the file-backed metadata store
    #[serde(default = "default_metadata_dir")]
    pub metadata_dir: String,
}

fn default_metadata_dir() -> String {
    "metadata".to_string()
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            metadata_dir: default_metadata_dir(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Contracts {
    #[serde(default = "default_balance_checker")]
    pub balance_checker: String,
}

fn default_balance_checker() -> String {
    // Widely used BalanceChecker deployment on Ethereum mainnet
    "0xb1F8e55c7f64D203C1400B9D8555d050F94aDF39".to_string()
}

impl Default for Contracts {
    fn default() -> Self {
        Self {
            balance_checker: default_balance_checker(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Flux {
    #[serde(default = "default_flux_comptroller")]
    pub comptroller: String,
    #[serde(default = "default_flux_blocks_per_year")]
    pub blocks_per_year: u64,
}

// https://docs.fluxfinance.com/addresses
fn default_flux_comptroller() -> String {
    "0x95Af143a021DF745bc78e845b54591C53a8B3A51".to_string()
}
fn default_flux_blocks_per_year() -> u64 {
    2_628_000 // 12s blocks
}

impl Default for Flux {
    fn default() -> Self {
        Self {
            comptroller: default_flux_comptroller(),
            blocks_per_year: default_flux_blocks_per_year(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Protocols {
    #[serde(default)]
    pub flux: Flux,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub rpc: Rpc,
    #[serde(default)]
    pub cache: Cache,
    #[serde(default)]
    pub contracts: Contracts,
    #[serde(default)]
    pub protocols: Protocols,
}

impl Settings {
    /// Loads `Config.toml` from the working directory if present, then applies
    /// `SDK_*` environment overrides. Every field has a default.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_file("Config.toml")
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;
        settings.apply_env_overrides()?;
        Ok(settings)
    }

    /// Chain of the configured RPC endpoint.
    pub fn chain(&self) -> Result<Chain, ConfigError> {
        Chain::try_from(self.rpc.chain_id).map_err(|e| ConfigError::Message(e.to_string()))
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(url) = env_string("SDK_RPC_HTTP_URL") {
            self.rpc.http_url = url;
        }
        // Accepts a chain name ("ethereum") or id ("1")
        if let Some(raw) = env_string("SDK_RPC_CHAIN_ID") {
            let chain = Chain::from_str(&raw)
                .map_err(|e| ConfigError::Message(format!("SDK_RPC_CHAIN_ID: {}", e)))?;
            self.rpc.chain_id = chain.id();
        }
        if let Some(dir) = env_string("SDK_CACHE_METADATA_DIR") {
            self.cache.metadata_dir = dir;
        }
        if let Some(addr) = env_string("SDK_CONTRACTS_BALANCE_CHECKER") {
            self.contracts.balance_checker = addr;
        }
        if let Some(addr) = env_string("SDK_FLUX_COMPTROLLER") {
            self.protocols.flux.comptroller = addr;
        }
        if let Some(raw) = env_string("SDK_FLUX_BLOCKS_PER_YEAR") {
            self.protocols.flux.blocks_per_year = raw
                .parse()
                .map_err(|e| ConfigError::Message(format!("SDK_FLUX_BLOCKS_PER_YEAR: {}", e)))?;
        }
        Ok(())
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
