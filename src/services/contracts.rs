//! On-chain reads used by the aggregator answer handler
//!
//! Calls go through the [`ChainReader`] trait so that a reverted call is an
//! ordinary `Err(ContractCallError::Reverted)` the handler can match on. Every
//! read is evaluated at the block of the event being indexed.

use alloy::{
    primitives::{Address, FixedBytes, U256},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::{json_rpc::ErrorPayload, types::BlockId},
    sol,
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::models::rate::CurrencyKey;

sol! {
    #[sol(rpc)]
    interface IAddressResolver {
        function getAddress(bytes32 name) external view returns (address);
    }
}

sol! {
    #[sol(rpc)]
    interface IExchangeRates {
        function currenciesUsingAggregator(address aggregator) external view returns (bytes32[] memory);
        function rateForCurrency(bytes32 currencyKey) external view returns (uint256);

        event RatesUpdated(bytes32[] currencyKeys, uint256[] newRates);
    }
}

sol! {
    interface IAggregator {
        event AnswerUpdated(int256 indexed current, uint256 indexed roundId, uint256 updatedAt);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractCallError {
    /// The call was rejected by the contract and carries no usable value
    Reverted(String),
    ProviderError(String),
    InvalidConfig(String),
}

impl std::fmt::Display for ContractCallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContractCallError::Reverted(msg) => write!(f, "Contract call reverted: {}", msg),
            ContractCallError::ProviderError(msg) => write!(f, "Provider error: {}", msg),
            ContractCallError::InvalidConfig(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ContractCallError {}

/// Whether a JSON-RPC error object reports an execution revert
///
/// Geth-style nodes use code 3 with revert data; others only say so in the
/// message. Rate limits, missing state and internal errors are not reverts.
pub fn is_revert(payload: &ErrorPayload) -> bool {
    payload.code == 3
        || payload.as_revert_data().is_some()
        || payload.message.to_lowercase().contains("revert")
}

impl From<alloy::contract::Error> for ContractCallError {
    fn from(err: alloy::contract::Error) -> Self {
        match &err {
            alloy::contract::Error::TransportError(e)
                if e.as_error_resp().is_some_and(is_revert) =>
            {
                ContractCallError::Reverted(err.to_string())
            }
            // Empty or malformed return data, e.g. no code at the address
            alloy::contract::Error::AbiError(_) => ContractCallError::Reverted(err.to_string()),
            _ => ContractCallError::ProviderError(err.to_string()),
        }
    }
}

#[async_trait]
pub trait ChainReader: Send + Sync {
    /// `AddressResolver(resolver).getAddress(name)` at `block`
    async fn get_address(
        &self,
        resolver: Address,
        name: FixedBytes<32>,
        block: u64,
    ) -> Result<Address, ContractCallError>;

    /// `ExchangeRates(exchange_rates).currenciesUsingAggregator(aggregator)` at `block`
    async fn currencies_using_aggregator(
        &self,
        exchange_rates: Address,
        aggregator: Address,
        block: u64,
    ) -> Result<Vec<CurrencyKey>, ContractCallError>;

    /// `ExchangeRates(exchange_rates).rateForCurrency(currency_key)` at `block`
    async fn rate_for_currency(
        &self,
        exchange_rates: Address,
        currency_key: CurrencyKey,
        block: u64,
    ) -> Result<U256, ContractCallError>;
}

/// [`ChainReader`] over an HTTP JSON-RPC endpoint
pub struct AlloyChainReader {
    provider: RootProvider<Http<Client>>,
}

impl AlloyChainReader {
    pub async fn new(rpc_url: &str) -> Result<Self, ContractCallError> {
        let provider = ProviderBuilder::new().on_http(rpc_url.parse().map_err(|e| {
            ContractCallError::InvalidConfig(format!("Invalid RPC URL: {}", e))
        })?);

        let chain_id = provider.get_chain_id().await.map_err(|e| {
            ContractCallError::ProviderError(format!("Connection failed: {}", e))
        })?;

        info!(chain_id = chain_id, "Connected chain reader");

        Ok(Self { provider })
    }

    pub fn provider(&self) -> &RootProvider<Http<Client>> {
        &self.provider
    }
}

#[async_trait]
impl ChainReader for AlloyChainReader {
    async fn get_address(
        &self,
        resolver: Address,
        name: FixedBytes<32>,
        block: u64,
    ) -> Result<Address, ContractCallError> {
        let contract = IAddressResolver::new(resolver, &self.provider);
        let address = contract
            .getAddress(name)
            .block(BlockId::number(block))
            .call()
            .await?
            ._0;
        debug!(resolver = %resolver, address = %address, block = block, "Resolved address");
        Ok(address)
    }

    async fn currencies_using_aggregator(
        &self,
        exchange_rates: Address,
        aggregator: Address,
        block: u64,
    ) -> Result<Vec<CurrencyKey>, ContractCallError> {
        let contract = IExchangeRates::new(exchange_rates, &self.provider);
        Ok(contract
            .currenciesUsingAggregator(aggregator)
            .block(BlockId::number(block))
            .call()
            .await?
            ._0)
    }

    async fn rate_for_currency(
        &self,
        exchange_rates: Address,
        currency_key: CurrencyKey,
        block: u64,
    ) -> Result<U256, ContractCallError> {
        let contract = IExchangeRates::new(exchange_rates, &self.provider);
        Ok(contract
            .rateForCurrency(currency_key)
            .block(BlockId::number(block))
            .call()
            .await?
            ._0)
    }
}
