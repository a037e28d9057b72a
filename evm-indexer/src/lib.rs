//! Continuously index blocks, transactions and event logs of an EVM chain
//! into Postgres, advancing a single "last indexed block" watermark.
//!
//! The pipeline has three parts:
//! - [`ChainReader`] normalizes JSON-RPC responses into [`Block`],
//!   [`Transaction`] and [`EventLog`] records.
//! - [`Repo`] (implemented by [`PostgresRepo`]) commits a block's records and
//!   the watermark atomically.
//! - [`Scheduler`] drives the indexing loop with confirmation-depth safety,
//!   per-call retries and batch-level backoff.

mod backoff;
mod blocks;
pub mod chain_reader;
mod chain_reorg;
mod config;
mod diesel;
mod event_logs;
mod hashes;
mod indexer_state;
mod repos;
pub mod retry;
pub mod scheduler;
mod transactions;

pub use backoff::{
    batch_backoff_delay, EXTENDED_COOLDOWN, HEALTHY_CONSECUTIVE_ERROR_LIMIT,
    MAX_CONSECUTIVE_ERRORS_BEFORE_COOLDOWN,
};
pub use blocks::Block;
pub use chain_reader::{ChainReader, ChainReaderError, JsonRpc};
pub use chain_reorg::ConfirmationDepth;
pub use config::{parse_contract_addresses, Config, ConfigError};
pub use event_logs::EventLog;
pub use indexer_state::IndexerState;
pub use repos::{Repo, RepoError, RepoMigrations, SQLikeMigrations};
pub use retry::RetryPolicy;
pub use scheduler::{
    HealthStatus, IndexingError, IndexingProgress, Scheduler, SchedulerHandle, StopSignal,
};
pub use transactions::Transaction;

pub use ethers::types::{Address, U256};

#[cfg(feature = "postgres")]
pub use repos::{PostgresRepo, PostgresRepoConn, PostgresRepoPool};

#[cfg(feature = "postgres")]
pub type IndexerRepo = PostgresRepo;

#[cfg(feature = "postgres")]
pub type IndexerRepoPool = PostgresRepoPool;

#[cfg(feature = "postgres")]
pub type IndexerRepoConn<'a> = PostgresRepoConn<'a>;

#[cfg(feature = "postgres")]
pub use diesel_async::AsyncConnection as IndexerRepoAsyncConnection;

use derive_more::Display;

/// Failures that prevent the indexer from starting.
/// Once running, the scheduler absorbs every error into its backoff loop.
#[derive(Debug, Display)]
pub enum IndexerError {
    #[display("Config Error: {_0}")]
    Config(ConfigError),
    #[display("Repo Error: {_0}")]
    Repo(RepoError),
}

impl std::error::Error for IndexerError {}

impl From<ConfigError> for IndexerError {
    fn from(value: ConfigError) -> Self {
        IndexerError::Config(value)
    }
}

impl From<RepoError> for IndexerError {
    fn from(value: RepoError) -> Self {
        IndexerError::Repo(value)
    }
}
