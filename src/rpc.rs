//! Read-only contract access.
//!
//! Adapters never talk to a provider directly: they go through
//! [`ContractReader`], a single `eth_call` style method. Every ethers
//! [`Middleware`] is a reader, and tests can substitute an in-process fake.
//!
//! [`read_contract`] adds typed encoding on top, using the call and return
//! structs generated by `abigen!` in [`crate::contracts`].

use crate::metrics;
use async_trait::async_trait;
use ethers::abi::{AbiDecode, AbiEncode};
use ethers::contract::EthCall;
use ethers::providers::Middleware;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, BlockId, BlockNumber, Bytes, TransactionRequest};
use log::debug;

/// Failure of a live contract read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    #[error("eth_call {method} on {contract:?} failed: {reason}")]
    Call {
        contract: Address,
        method: String,
        reason: String,
    },
    #[error("could not decode {method} result from {contract:?}: {reason}")]
    Decode {
        contract: Address,
        method: String,
        reason: String,
    },
}

#[async_trait]
pub trait ContractReader: Send + Sync {
    /// Executes `calldata` against `to`, at `block` or at the latest block.
    async fn call(&self, to: Address, calldata: Bytes, block: Option<u64>) -> anyhow::Result<Bytes>;
}

#[async_trait]
impl<M> ContractReader for M
where
    M: Middleware + 'static,
{
    async fn call(&self, to: Address, calldata: Bytes, block: Option<u64>) -> anyhow::Result<Bytes> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(calldata).into();
        let block = block.map(|number| BlockId::Number(BlockNumber::Number(number.into())));
        Middleware::call(self, &tx, block)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))
    }
}

/// Encodes `call`, executes it on `contract` and decodes the result as `R`.
pub async fn read_contract<C, R>(
    reader: &dyn ContractReader,
    contract: Address,
    call: C,
    block: Option<u64>,
) -> Result<R, ReadError>
where
    C: EthCall + AbiEncode,
    R: AbiDecode,
{
    let method = C::function_name().into_owned();
    let raw = read_raw(reader, contract, &method, call.encode().into(), block).await?;
    R::decode(raw.as_ref()).map_err(|e| ReadError::Decode {
        contract,
        method,
        reason: e.to_string(),
    })
}

/// Executes pre-encoded calldata, for results that need custom decoding.
pub async fn read_raw(
    reader: &dyn ContractReader,
    contract: Address,
    method: &str,
    calldata: Bytes,
    block: Option<u64>,
) -> Result<Bytes, ReadError> {
    metrics::increment_rpc_call(method);
    debug!("eth_call {} on {:?} at {:?}", method, contract, block);
    reader
        .call(contract, calldata, block)
        .await
        .map_err(|e| ReadError::Call {
            contract,
            method: method.to_string(),
            reason: format!("{:#}", e),
        })
}
