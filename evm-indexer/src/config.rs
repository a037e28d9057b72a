use std::fmt::Debug;
use std::str::FromStr;

use derive_more::Display;
use ethers::types::Address;

use crate::{ConfirmationDepth, IndexerRepo, RetryPolicy};

#[derive(Debug, Display, PartialEq, Eq)]
pub enum ConfigError {
    #[display("blocks per batch must be at least 1")]
    ZeroBatchSize,
    #[display("invalid contract address: {_0}")]
    InvalidContractAddress(String),
    #[display("invalid JSON-RPC url: {_0}")]
    InvalidJsonRpcUrl(String),
    #[display("missing environment variable: {_0}")]
    MissingEnvVar(&'static str),
    #[display("invalid value for environment variable {_0}: {_1}")]
    InvalidEnvVar(&'static str, String),
}

impl std::error::Error for ConfigError {}

/// Configuration for indexing a single EVM chain.
///
/// # Example
/// ```no_run
/// use evm_indexer::{Config, PostgresRepo};
///
/// let config = Config::new("https://rpc.example.org", PostgresRepo::new("postgres://..."))
///     .with_start_block_number(17_000_000)
///     .with_blocks_per_batch(20)
///     .with_confirmation_blocks(12)
///     .add_contract_address("0xBC4CA0EdA7647A8aB7C2061c2E118A18a936f13D");
/// ```
#[derive(Clone)]
pub struct Config {
    pub json_rpc_url: String,
    pub repo: IndexerRepo,
    /// Only used while the watermark is still at its initial value
    pub start_block_number: u64,
    pub blocks_per_batch: u64,
    pub confirmation_depth: ConfirmationDepth,
    /// Logs are restricted to these contracts when non-empty
    pub contract_addresses: Vec<String>,
    pub polling_interval_ms: u64,
    pub batch_interval_ms: u64,
    pub retry_policy: RetryPolicy,
}

impl Config {
    pub fn new(json_rpc_url: &str, repo: IndexerRepo) -> Self {
        Self {
            json_rpc_url: json_rpc_url.to_string(),
            repo,
            start_block_number: 0,
            blocks_per_batch: 10,
            confirmation_depth: ConfirmationDepth::default(),
            contract_addresses: vec![],
            polling_interval_ms: 5_000,
            batch_interval_ms: 100,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_start_block_number(mut self, start_block_number: u64) -> Self {
        self.start_block_number = start_block_number;

        self
    }

    pub fn with_blocks_per_batch(mut self, blocks_per_batch: u64) -> Self {
        self.blocks_per_batch = blocks_per_batch;

        self
    }

    pub fn with_confirmation_blocks(mut self, confirmation_blocks: u64) -> Self {
        self.confirmation_depth = ConfirmationDepth::new(confirmation_blocks);

        self
    }

    pub fn add_contract_address(mut self, contract_address: &str) -> Self {
        self.contract_addresses.push(contract_address.trim().to_string());

        self
    }

    /// How long to wait for new confirmed blocks once caught up
    pub fn with_polling_interval_ms(mut self, polling_interval_ms: u64) -> Self {
        self.polling_interval_ms = polling_interval_ms;

        self
    }

    /// Pause between successful batches to avoid saturating the RPC endpoint
    pub fn with_batch_interval_ms(mut self, batch_interval_ms: u64) -> Self {
        self.batch_interval_ms = batch_interval_ms;

        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;

        self
    }

    /// Reads `RPC_URL`, `DATABASE_URL`, `START_BLOCK`, `BATCH_SIZE`,
    /// `CONFIRMATION_BLOCKS` and `CONTRACTS_TO_INDEX` from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let required = |name| {
            var(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::MissingEnvVar(name))
        };
        let number = |name, default| match var(name) {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidEnvVar(name, value)),
            None => Ok(default),
        };

        let json_rpc_url = required("RPC_URL")?;
        let database_url = required("DATABASE_URL")?;

        let config = Config::new(&json_rpc_url, IndexerRepo::new(&database_url))
            .with_start_block_number(number("START_BLOCK", 0)?)
            .with_blocks_per_batch(number("BATCH_SIZE", 10)?)
            .with_confirmation_blocks(number("CONFIRMATION_BLOCKS", 12)?);

        let contract_addresses = var("CONTRACTS_TO_INDEX").unwrap_or_default();

        Ok(parse_contract_addresses(&contract_addresses)
            .iter()
            .fold(config, |config, address| config.add_contract_address(address)))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.blocks_per_batch == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }

        self.get_contract_addresses().map(|_| ())
    }

    pub fn get_contract_addresses(&self) -> Result<Vec<Address>, ConfigError> {
        self.contract_addresses
            .iter()
            .map(|address| {
                Address::from_str(address)
                    .map_err(|_| ConfigError::InvalidContractAddress(address.to_string()))
            })
            .collect()
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("json_rpc_url", &"***")
            .field("start_block_number", &self.start_block_number)
            .field("blocks_per_batch", &self.blocks_per_batch)
            .field("confirmation_blocks", &self.confirmation_depth.value())
            .field("contract_addresses", &self.contract_addresses)
            .field("polling_interval_ms", &self.polling_interval_ms)
            .field("batch_interval_ms", &self.batch_interval_ms)
            .field("retry_policy", &self.retry_policy)
            .finish()
    }
}

/// Splits a comma-separated allow-list, ignoring blank entries.
pub fn parse_contract_addresses(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PostgresRepo;

    fn config() -> Config {
        Config::new(
            "http://localhost:8545",
            PostgresRepo::new("postgres://localhost/evm_indexer"),
        )
    }

    #[test]
    fn defaults_match_the_documented_schedule() {
        let config = config();

        assert_eq!(config.blocks_per_batch, 10);
        assert_eq!(config.confirmation_depth.value(), 12);
        assert_eq!(config.polling_interval_ms, 5_000);
        assert_eq!(config.batch_interval_ms, 100);
        assert!(config.contract_addresses.is_empty());
    }

    #[test]
    fn rejects_empty_batches() {
        let config = config().with_blocks_per_batch(0);

        assert_eq!(config.validate(), Err(ConfigError::ZeroBatchSize));
    }

    #[test]
    fn rejects_malformed_contract_addresses() {
        let config = config().add_contract_address("0xnot-an-address");

        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidContractAddress(
                "0xnot-an-address".to_string()
            ))
        );
    }

    #[test]
    fn parses_contract_addresses() {
        let config = config()
            .add_contract_address(" 0xBC4CA0EdA7647A8aB7C2061c2E118A18a936f13D ")
            .add_contract_address("0x8a90CAb2b38dba80c64b7734e58Ee1dB38B8993e");

        assert!(config.validate().is_ok());
        assert_eq!(config.get_contract_addresses().unwrap().len(), 2);
    }

    #[test]
    fn splits_comma_separated_allow_lists() {
        assert_eq!(
            parse_contract_addresses("0xa, 0xb ,,"),
            vec!["0xa".to_string(), "0xb".to_string()]
        );
        assert!(parse_contract_addresses("").is_empty());
    }

    fn vars(vars: &[(&'static str, &str)]) -> impl Fn(&'static str) -> Option<String> {
        let vars: Vec<(&'static str, String)> =
            vars.iter().map(|(name, value)| (*name, value.to_string())).collect();

        move |name| vars.iter().find(|(n, _)| *n == name).map(|(_, value)| value.clone())
    }

    #[test]
    fn loads_from_environment_variables() {
        let config = Config::from_vars(vars(&[
            ("RPC_URL", "http://localhost:8545"),
            ("DATABASE_URL", "postgres://localhost/evm_indexer"),
            ("START_BLOCK", "17000000"),
            ("BATCH_SIZE", "25"),
            ("CONTRACTS_TO_INDEX", "0xBC4CA0EdA7647A8aB7C2061c2E118A18a936f13D,"),
        ]))
        .unwrap();

        assert_eq!(config.start_block_number, 17_000_000);
        assert_eq!(config.blocks_per_batch, 25);
        assert_eq!(config.confirmation_depth.value(), 12);
        assert_eq!(config.contract_addresses.len(), 1);
    }

    #[test]
    fn requires_the_rpc_and_database_urls() {
        let result = Config::from_vars(vars(&[("RPC_URL", "http://localhost:8545")]));

        assert_eq!(result.unwrap_err(), ConfigError::MissingEnvVar("DATABASE_URL"));
    }

    #[test]
    fn rejects_non_numeric_environment_variables() {
        let result = Config::from_vars(vars(&[
            ("RPC_URL", "http://localhost:8545"),
            ("DATABASE_URL", "postgres://localhost/evm_indexer"),
            ("BATCH_SIZE", "ten"),
        ]));

        assert_eq!(
            result.unwrap_err(),
            ConfigError::InvalidEnvVar("BATCH_SIZE", "ten".to_string())
        );
    }

    #[test]
    fn hides_the_json_rpc_url_when_logged() {
        let config = Config::new(
            "https://mainnet.example.org/v2/secret-key",
            PostgresRepo::new("postgres://localhost/evm_indexer"),
        );

        assert!(!format!("{config:?}").contains("secret-key"));
    }
}
