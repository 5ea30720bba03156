//! In-process stand-in for an Ethereum node serving a small Flux deployment.

#![allow(dead_code)]

use anyhow::{anyhow, bail, ensure};
use async_trait::async_trait;
use defi_adapters_sdk::adapters::flux::{FluxConfig, EXPECTED_BLOCKS_PER_YEAR};
use defi_adapters_sdk::contracts::balance_checker::BalancesCall;
use defi_adapters_sdk::contracts::comptroller::GetAllMarketsCall;
use defi_adapters_sdk::contracts::erc20::{DecimalsCall, NameCall, SymbolCall};
use defi_adapters_sdk::contracts::f_token::{
    ExchangeRateStoredCall, SupplyRatePerBlockCall, TotalSupplyCall, UnderlyingCall,
};
use defi_adapters_sdk::rpc::ContractReader;
use ethers::abi::{decode, encode, ParamType, Token};
use ethers::contract::EthCall;
use ethers::types::{Address, Bytes, U256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn addr(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

pub const COMPTROLLER: u64 = 0xc0;
pub const BALANCE_CHECKER: u64 = 0xbc;
pub const F_USDC: u64 = 0xf1;
pub const F_DAI: u64 = 0xf2;
pub const USDC: u64 = 0xa1;
pub const DAI: u64 = 0xa2;
pub const USER: u64 = 0x5e;

/// 1e-7 per block as 18-decimal fixed point
pub const SUPPLY_RATE_RAW: u64 = 100_000_000_000;
pub const F_USDC_EXCHANGE_RATE: u128 = 1_050_000_000_000_000_000;
pub const F_DAI_EXCHANGE_RATE: u128 = 200_000_000_000_000_000_000_000_000;

pub fn flux_config() -> FluxConfig {
    FluxConfig {
        comptroller: addr(COMPTROLLER),
        balance_checker: addr(BALANCE_CHECKER),
        blocks_per_year: EXPECTED_BLOCKS_PER_YEAR,
    }
}

#[derive(Debug, Clone)]
pub struct FakeToken {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub underlying: Option<Address>,
    pub exchange_rate: U256,
    pub supply_rate: U256,
    pub total_supply: U256,
    pub balances: HashMap<Address, U256>,
}

impl FakeToken {
    fn erc20(name: &str, symbol: &str, decimals: u8) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
            underlying: None,
            exchange_rate: U256::zero(),
            supply_rate: U256::zero(),
            total_supply: U256::zero(),
            balances: HashMap::new(),
        }
    }
}

pub struct FakeChain {
    comptroller: Address,
    balance_checker: Address,
    markets: Vec<Address>,
    tokens: HashMap<Address, FakeToken>,
    calls: Mutex<HashMap<&'static str, usize>>,
    fail_markets: AtomicBool,
    fail_live_reads: AtomicBool,
    market_delay: Mutex<Option<Duration>>,
}

impl FakeChain {
    /// Two markets: fUSDC (6 decimals, over USDC) and fDAI (8 decimals, over DAI).
    /// `USER` holds 1 fUSDC and no fDAI.
    pub fn flux() -> Self {
        let mut tokens = HashMap::new();

        let mut f_usdc = FakeToken::erc20("Flux USDC", "fUSDC", 6);
        f_usdc.underlying = Some(addr(USDC));
        f_usdc.exchange_rate = U256::from(F_USDC_EXCHANGE_RATE);
        f_usdc.supply_rate = U256::from(SUPPLY_RATE_RAW);
        f_usdc.total_supply = U256::from(5_000_000_000u64);
        f_usdc.balances.insert(addr(USER), U256::from(1_000_000u64));
        tokens.insert(addr(F_USDC), f_usdc);

        let mut f_dai = FakeToken::erc20("Flux DAI", "fDAI", 8);
        f_dai.underlying = Some(addr(DAI));
        f_dai.exchange_rate = U256::from(F_DAI_EXCHANGE_RATE);
        f_dai.total_supply = U256::from(1_000_000_000_000u64);
        tokens.insert(addr(F_DAI), f_dai);

        tokens.insert(addr(USDC), FakeToken::erc20("USD Coin", "USDC", 6));
        tokens.insert(addr(DAI), FakeToken::erc20("Dai Stablecoin", "DAI", 18));

        Self {
            comptroller: addr(COMPTROLLER),
            balance_checker: addr(BALANCE_CHECKER),
            markets: vec![addr(F_USDC), addr(F_DAI)],
            tokens,
            calls: Mutex::new(HashMap::new()),
            fail_markets: AtomicBool::new(false),
            fail_live_reads: AtomicBool::new(false),
            market_delay: Mutex::new(None),
        }
    }

    /// Number of calls received for `method` (ABI function name).
    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    pub fn set_fail_markets(&self, fail: bool) {
        self.fail_markets.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_live_reads(&self, fail: bool) {
        self.fail_live_reads.store(fail, Ordering::SeqCst);
    }

    /// Slows `getAllMarkets` down so concurrent callers overlap.
    pub fn set_market_delay(&self, delay: Duration) {
        *self.market_delay.lock().unwrap() = Some(delay);
    }

    fn record(&self, method: &'static str) {
        *self.calls.lock().unwrap().entry(method).or_insert(0) += 1;
    }

    fn token(&self, to: Address) -> anyhow::Result<&FakeToken> {
        self.tokens.get(&to).ok_or_else(|| anyhow!("no contract at {:?}", to))
    }

    fn live_read(&self, value: U256) -> anyhow::Result<Bytes> {
        if self.fail_live_reads.load(Ordering::SeqCst) {
            bail!("connection reset by peer");
        }
        Ok(encode(&[Token::Uint(value)]).into())
    }
}

fn method_for(selector: [u8; 4]) -> Option<&'static str> {
    [
        (GetAllMarketsCall::selector(), "getAllMarkets"),
        (BalancesCall::selector(), "balances"),
        (NameCall::selector(), "name"),
        (SymbolCall::selector(), "symbol"),
        (DecimalsCall::selector(), "decimals"),
        (UnderlyingCall::selector(), "underlying"),
        (ExchangeRateStoredCall::selector(), "exchangeRateStored"),
        (SupplyRatePerBlockCall::selector(), "supplyRatePerBlock"),
        (TotalSupplyCall::selector(), "totalSupply"),
    ]
    .into_iter()
    .find(|(known, _)| *known == selector)
    .map(|(_, method)| method)
}

#[async_trait]
impl ContractReader for FakeChain {
    async fn call(&self, to: Address, calldata: Bytes, _block: Option<u64>) -> anyhow::Result<Bytes> {
        ensure!(calldata.len() >= 4, "calldata too short");
        let selector: [u8; 4] = calldata[..4].try_into()?;
        let method = method_for(selector).ok_or_else(|| anyhow!("unknown selector {:?}", selector))?;
        self.record(method);

        match method {
            "getAllMarkets" => {
                ensure!(to == self.comptroller, "getAllMarkets sent to {:?}", to);
                let delay = *self.market_delay.lock().unwrap();
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                if self.fail_markets.load(Ordering::SeqCst) {
                    bail!("execution reverted");
                }
                let markets = self.markets.iter().map(|m| Token::Address(*m)).collect();
                Ok(encode(&[Token::Array(markets)]).into())
            }
            "balances" => {
                ensure!(to == self.balance_checker, "balances sent to {:?}", to);
                let address_array = ParamType::Array(Box::new(ParamType::Address));
                let args = decode(&[address_array.clone(), address_array], &calldata[4..])?;
                let users = args[0].clone().into_array().unwrap_or_default();
                let tokens = args[1].clone().into_array().unwrap_or_default();

                let mut out = Vec::new();
                for user in &users {
                    let user = user.clone().into_address().ok_or_else(|| anyhow!("bad user"))?;
                    for token in &tokens {
                        let token = token.clone().into_address().ok_or_else(|| anyhow!("bad token"))?;
                        let balance = self
                            .token(token)?
                            .balances
                            .get(&user)
                            .copied()
                            .unwrap_or_default();
                        out.push(Token::Uint(balance));
                    }
                }
                Ok(encode(&[Token::Array(out)]).into())
            }
            "name" => Ok(encode(&[Token::String(self.token(to)?.name.clone())]).into()),
            "symbol" => Ok(encode(&[Token::String(self.token(to)?.symbol.clone())]).into()),
            "decimals" => Ok(encode(&[Token::Uint(U256::from(self.token(to)?.decimals))]).into()),
            "underlying" => {
                let underlying = self
                    .token(to)?
                    .underlying
                    .ok_or_else(|| anyhow!("execution reverted"))?;
                Ok(encode(&[Token::Address(underlying)]).into())
            }
            "exchangeRateStored" => self.live_read(self.token(to)?.exchange_rate),
            "supplyRatePerBlock" => self.live_read(self.token(to)?.supply_rate),
            "totalSupply" => self.live_read(self.token(to)?.total_supply),
            other => bail!("{} not supported", other),
        }
    }
}
