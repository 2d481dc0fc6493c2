//! Process-wide indexing configuration
//!
//! Built once at startup and shared read-only (`Arc<RatesConfig>`) by every
//! handler. Tests build their own instances with alternate mappings.

use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::str::FromStr;

use alloy::primitives::Address;
use tracing::info;

/// AddressResolver used to look up the live ExchangeRates contract
pub const DEFAULT_RESOLVER_ADDRESS: &str = "0x1Cb059b7e74fD21665968C908806143E744D5F30";

/// Name under which ExchangeRates is registered in the resolver
pub const EXCHANGE_RATES_NAME: &str = "ExchangeRates";

/// Synth whose rates are aggregated into time buckets
pub const SNX_SYNTH: &str = "SNX";

/// Synths pegged to one dollar and seeded at 10^18
pub const STABLE_SYNTHS: [&str; 2] = ["sUSD", "nUSD"];

/// Environment variable overriding the resolver address
const ENV_RESOLVER_ADDRESS: &str = "ADDRESS_RESOLVER";

/// Environment variable pointing at the aggregator -> proxy JSON map
const ENV_AGGREGATOR_PROXIES_PATH: &str = "AGGREGATOR_PROXIES_PATH";

#[derive(Debug)]
pub enum ConfigError {
    InvalidAddress(String),
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidAddress(msg) => write!(f, "Invalid address: {}", msg),
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err)
    }
}

#[derive(Debug, Clone)]
pub struct RatesConfig {
    pub resolver_address: Address,
    pub exchange_rates_name: String,
    pub snx_synth: String,
    pub stable_synths: Vec<String>,
    /// Aggregator implementation address -> proxy address registered with ExchangeRates
    aggregator_proxies: HashMap<Address, Address>,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            resolver_address: parse_address(DEFAULT_RESOLVER_ADDRESS)
                .unwrap_or(Address::ZERO),
            exchange_rates_name: EXCHANGE_RATES_NAME.to_string(),
            snx_synth: SNX_SYNTH.to_string(),
            stable_synths: STABLE_SYNTHS.iter().map(|s| s.to_string()).collect(),
            aggregator_proxies: HashMap::new(),
        }
    }
}

impl RatesConfig {
    pub fn with_aggregator_proxies(mut self, proxies: HashMap<Address, Address>) -> Self {
        self.aggregator_proxies = proxies;
        self
    }

    pub fn with_resolver_address(mut self, resolver: Address) -> Self {
        self.resolver_address = resolver;
        self
    }

    /// Load the configuration from environment variables
    ///
    /// * `ADDRESS_RESOLVER` - resolver address (default: mainnet ReadProxyAddressResolver)
    /// * `AGGREGATOR_PROXIES_PATH` - JSON object mapping aggregator to proxy addresses
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(resolver) = env::var(ENV_RESOLVER_ADDRESS) {
            config.resolver_address = parse_address(&resolver)?;
        }

        if let Ok(path) = env::var(ENV_AGGREGATOR_PROXIES_PATH) {
            config.aggregator_proxies = load_aggregator_proxies(Path::new(&path))?;
        }

        info!(
            resolver = %config.resolver_address,
            aggregators = config.aggregator_proxies.len(),
            "Loaded rates config"
        );

        Ok(config)
    }

    /// Proxy address fronting `aggregator`
    pub fn proxy_for(&self, aggregator: &Address) -> Option<Address> {
        self.aggregator_proxies.get(aggregator).copied()
    }

    /// Every aggregator with a known proxy, sorted
    pub fn aggregators(&self) -> Vec<Address> {
        let mut aggregators: Vec<Address> = self.aggregator_proxies.keys().copied().collect();
        aggregators.sort();
        aggregators
    }

    pub fn is_snx(&self, synth: &str) -> bool {
        self.snx_synth == synth
    }
}

fn parse_address(text: &str) -> Result<Address, ConfigError> {
    Address::from_str(text.trim())
        .map_err(|e| ConfigError::InvalidAddress(format!("{}: {}", text, e)))
}

/// Parse an aggregator -> proxy map: `{ "0xaggregator": "0xproxy", ... }`
pub fn parse_aggregator_proxies(json: &str) -> Result<HashMap<Address, Address>, ConfigError> {
    let raw: HashMap<String, String> = serde_json::from_str(json)?;
    raw.iter()
        .map(|(aggregator, proxy)| Ok((parse_address(aggregator)?, parse_address(proxy)?)))
        .collect()
}

pub fn load_aggregator_proxies(path: &Path) -> Result<HashMap<Address, Address>, ConfigError> {
    let json = std::fs::read_to_string(path)?;
    parse_aggregator_proxies(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RatesConfig::default();
        assert_eq!(
            config.resolver_address,
            Address::from_str(DEFAULT_RESOLVER_ADDRESS).unwrap()
        );
        assert_eq!(config.exchange_rates_name, "ExchangeRates");
        assert!(config.is_snx("SNX"));
        assert!(!config.is_snx("sETH"));
        assert_eq!(config.stable_synths, vec!["sUSD", "nUSD"]);
        assert!(config.aggregators().is_empty());
    }

    #[test]
    fn test_parse_aggregator_proxies_is_case_insensitive() {
        let json = r#"{
            "0x00000000000000000000000000000000000000aa": "0x00000000000000000000000000000000000000BB"
        }"#;
        let proxies = parse_aggregator_proxies(json).unwrap();
        let config = RatesConfig::default().with_aggregator_proxies(proxies);

        let aggregator = Address::with_last_byte(0xaa);
        assert_eq!(config.proxy_for(&aggregator), Some(Address::with_last_byte(0xbb)));
        assert_eq!(config.proxy_for(&Address::with_last_byte(0xcc)), None);
    }

    #[test]
    fn test_parse_aggregator_proxies_rejects_bad_address() {
        let json = r#"{ "not-an-address": "0x00000000000000000000000000000000000000bb" }"#;
        assert!(matches!(
            parse_aggregator_proxies(json),
            Err(ConfigError::InvalidAddress(_))
        ));
    }
}
