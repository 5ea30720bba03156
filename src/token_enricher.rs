use crate::contracts::erc20::{DecimalsCall, DecimalsReturn, NameCall, SymbolCall};
use crate::rpc::{read_contract, read_raw, ContractReader, ReadError};
use crate::types::Erc20Metadata;
use ethers::abi::{decode, AbiDecode, AbiEncode, ParamType, Token};
use ethers::contract::EthCall;
use ethers::types::{Address, Bytes};
use futures::future::try_join_all;
use log::debug;

pub struct TokenEnricher;

impl TokenEnricher {
    /// Reads name, symbol and decimals of an ERC-20 token.
    pub async fn fetch_metadata(
        reader: &dyn ContractReader,
        token: Address,
        block: Option<u64>,
    ) -> Result<Erc20Metadata, ReadError> {
        let (name, symbol, decimals) = tokio::try_join!(
            Self::fetch_text(reader, token, NameCall, block),
            Self::fetch_text(reader, token, SymbolCall, block),
            read_contract::<_, DecimalsReturn>(reader, token, DecimalsCall, block),
        )?;

        debug!("TokenEnricher: {:?} is {} ({} decimals)", token, symbol, decimals.0);
        Ok(Erc20Metadata {
            address: token,
            name,
            symbol,
            decimals: decimals.0,
        })
    }

    /// Metadata for every token, in input order.
    pub async fn fetch_many(
        reader: &dyn ContractReader,
        tokens: &[Address],
        block: Option<u64>,
    ) -> Result<Vec<Erc20Metadata>, ReadError> {
        try_join_all(tokens.iter().map(|&token| Self::fetch_metadata(reader, token, block))).await
    }

    // Some older tokens (MKR, SAI) return bytes32 for name/symbol instead of string
    async fn fetch_text<C>(
        reader: &dyn ContractReader,
        token: Address,
        call: C,
        block: Option<u64>,
    ) -> Result<String, ReadError>
    where
        C: EthCall + AbiEncode,
    {
        let method = C::function_name().into_owned();
        let calldata: Bytes = call.encode().into();
        let raw = read_raw(reader, token, &method, calldata, block).await?;

        if let Ok(text) = String::decode(raw.as_ref()) {
            return Ok(text);
        }
        decode(&[ParamType::FixedBytes(32)], raw.as_ref())
            .ok()
            .and_then(|tokens| tokens.into_iter().next())
            .and_then(Token::into_fixed_bytes)
            .map(|word| bytes32_to_string(&word))
            .ok_or_else(|| ReadError::Decode {
                contract: token,
                method,
                reason: "expected string or bytes32".to_string(),
            })
    }
}

fn bytes32_to_string(word: &[u8]) -> String {
    let end = word.iter().position(|&b| b == 0).unwrap_or(word.len());
    String::from_utf8_lossy(&word[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes32_to_string_trims_padding() {
        let mut word = [0u8; 32];
        word[..3].copy_from_slice(b"MKR");
        assert_eq!(bytes32_to_string(&word), "MKR");
        assert_eq!(bytes32_to_string(&[b'A'; 32]), "A".repeat(32));
    }
}
