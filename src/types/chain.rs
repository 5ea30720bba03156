use crate::types::conversions::ConversionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// EVM chains an adapter can be deployed on.
///
/// Serialized as the numeric chain id so on-disk metadata stays stable if a
/// chain is renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub enum Chain {
    Ethereum,
    Optimism,
    Bsc,
    Polygon,
    Fantom,
    Base,
    Arbitrum,
    Avalanche,
    Linea,
}

impl Chain {
    pub const ALL: [Chain; 9] = [
        Chain::Ethereum,
        Chain::Optimism,
        Chain::Bsc,
        Chain::Polygon,
        Chain::Fantom,
        Chain::Base,
        Chain::Arbitrum,
        Chain::Avalanche,
        Chain::Linea,
    ];

    pub const fn id(self) -> u64 {
        match self {
            Chain::Ethereum => 1,
            Chain::Optimism => 10,
            Chain::Bsc => 56,
            Chain::Polygon => 137,
            Chain::Fantom => 250,
            Chain::Base => 8453,
            Chain::Arbitrum => 42161,
            Chain::Avalanche => 43114,
            Chain::Linea => 59144,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Optimism => "optimism",
            Chain::Bsc => "bsc",
            Chain::Polygon => "polygon",
            Chain::Fantom => "fantom",
            Chain::Base => "base",
            Chain::Arbitrum => "arbitrum",
            Chain::Avalanche => "avalanche",
            Chain::Linea => "linea",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Chain> for u64 {
    fn from(chain: Chain) -> Self {
        chain.id()
    }
}

impl TryFrom<u64> for Chain {
    type Error = ConversionError;

    fn try_from(id: u64) -> Result<Self, Self::Error> {
        Chain::ALL
            .into_iter()
            .find(|chain| chain.id() == id)
            .ok_or_else(|| ConversionError::UnsupportedChain(id.to_string()))
    }
}

/// Accepts either the lowercase chain name or its numeric id.
impl FromStr for Chain {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(id) = trimmed.parse::<u64>() {
            return Chain::try_from(id);
        }
        let lower = trimmed.to_lowercase();
        Chain::ALL
            .into_iter()
            .find(|chain| chain.name() == lower)
            .ok_or_else(|| ConversionError::UnsupportedChain(trimmed.to_string()))
    }
}
