use std::fmt::Debug;

use derive_more::Display;
use futures_core::future::BoxFuture;

use crate::{Block, EventLog, IndexerState, Transaction};

#[derive(Debug, Display, PartialEq, Eq)]
pub enum RepoError {
    #[display("not connected to the database: {_0}")]
    NotConnected(String),
    #[display("invalid record: {_0}")]
    InvalidRecord(String),
    #[display("{_0}")]
    Unknown(String),
}

impl std::error::Error for RepoError {}

/// Owns the relational schema and every write to it.
///
/// No operation retries: failures are returned as they are and left to the
/// scheduler's backoff.
#[async_trait::async_trait]
pub trait Repo: Sync + Send + RepoMigrations + Clone + Debug {
    type Pool;
    type Conn<'a>;

    async fn get_pool(&self, max_size: u32) -> Result<Self::Pool, RepoError>;
    async fn get_conn<'a>(pool: &'a Self::Pool) -> Result<Self::Conn<'a>, RepoError>;

    async fn run_in_transaction<'a, F>(
        conn: &mut Self::Conn<'a>,
        repo_ops: F,
    ) -> Result<(), RepoError>
    where
        F: for<'b> FnOnce(&'b mut Self::Conn<'a>) -> BoxFuture<'b, Result<(), RepoError>>
            + Send
            + Sync
            + 'a;

    async fn migrate<'a>(conn: &mut Self::Conn<'a>) -> Result<(), RepoError>;

    /// Upserts the block, upserts its transactions, inserts its logs and
    /// advances the watermark to the block's number. All or nothing.
    async fn commit_block<'a>(
        conn: &mut Self::Conn<'a>,
        block: &Block,
        transactions: &[Transaction],
        event_logs: &[EventLog],
    ) -> Result<(), RepoError>;

    /// Defaults to 0 when the watermark row is absent
    async fn get_last_indexed_block<'a>(conn: &mut Self::Conn<'a>) -> Result<u64, RepoError>;
    async fn get_indexer_state<'a>(
        conn: &mut Self::Conn<'a>,
    ) -> Result<Option<IndexerState>, RepoError>;

    async fn get_block_by_number<'a>(
        conn: &mut Self::Conn<'a>,
        block_number: u64,
    ) -> Result<Option<Block>, RepoError>;
    async fn get_transactions_by_block_number<'a>(
        conn: &mut Self::Conn<'a>,
        block_number: u64,
    ) -> Result<Vec<Transaction>, RepoError>;
    async fn get_event_logs_by_block_number<'a>(
        conn: &mut Self::Conn<'a>,
        block_number: u64,
    ) -> Result<Vec<EventLog>, RepoError>;
}

/// Every transaction and log must belong to the block committed with it.
pub(crate) fn ensure_records_belong_to_block(
    block: &Block,
    transactions: &[Transaction],
    event_logs: &[EventLog],
) -> Result<(), RepoError> {
    if let Some(transaction) = transactions.iter().find(|t| t.block_number != block.number) {
        return Err(RepoError::InvalidRecord(format!(
            "transaction {} belongs to block {}, not {}",
            transaction.hash, transaction.block_number, block.number
        )));
    }

    if let Some(event_log) = event_logs.iter().find(|l| l.block_number != block.number) {
        return Err(RepoError::InvalidRecord(format!(
            "log {}:{} belongs to block {}, not {}",
            event_log.transaction_hash, event_log.log_index, event_log.block_number, block.number
        )));
    }

    Ok(())
}

pub trait RepoMigrations {
    fn create_blocks_migration() -> &'static [&'static str];
    fn create_transactions_migration() -> &'static [&'static str];
    fn create_event_logs_migration() -> &'static [&'static str];
    fn create_indexer_state_migration() -> &'static [&'static str];

    fn get_internal_migrations() -> Vec<&'static str> {
        [
            Self::create_blocks_migration(),
            Self::create_transactions_migration(),
            Self::create_event_logs_migration(),
            Self::create_indexer_state_migration(),
        ]
        .concat()
    }
}

pub struct SQLikeMigrations;

impl SQLikeMigrations {
    pub fn create_blocks() -> &'static [&'static str] {
        &[
            "CREATE TABLE IF NOT EXISTS blocks (
                number BIGINT PRIMARY KEY,
                hash VARCHAR NOT NULL,
                parent_hash VARCHAR NOT NULL,
                timestamp BIGINT NOT NULL,
                gas_limit TEXT NOT NULL,
                gas_used TEXT NOT NULL,
                miner VARCHAR NOT NULL,
                difficulty TEXT,
                total_difficulty TEXT,
                size BIGINT,
                extra_data TEXT,
                base_fee_per_gas TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
            "CREATE INDEX IF NOT EXISTS blocks_timestamp_index ON blocks(timestamp)",
            "CREATE INDEX IF NOT EXISTS blocks_miner_index ON blocks(miner)",
        ]
    }

    pub fn create_transactions() -> &'static [&'static str] {
        &[
            "CREATE TABLE IF NOT EXISTS transactions (
                hash VARCHAR PRIMARY KEY,
                block_number BIGINT NOT NULL REFERENCES blocks(number),
                block_hash VARCHAR NOT NULL,
                transaction_index INTEGER NOT NULL,
                from_address VARCHAR NOT NULL,
                to_address VARCHAR,
                value TEXT NOT NULL,
                gas_limit TEXT NOT NULL,
                gas_used TEXT,
                gas_price TEXT,
                max_fee_per_gas TEXT,
                max_priority_fee_per_gas TEXT,
                nonce TEXT NOT NULL,
                input_data TEXT,
                status INTEGER,
                transaction_type INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
            "CREATE INDEX IF NOT EXISTS transactions_block_number_index
            ON transactions(block_number)",
            "CREATE INDEX IF NOT EXISTS transactions_from_address_index
            ON transactions(from_address)",
            "CREATE INDEX IF NOT EXISTS transactions_to_address_index
            ON transactions(to_address)",
        ]
    }

    pub fn create_event_logs() -> &'static [&'static str] {
        &[
            "CREATE TABLE IF NOT EXISTS event_logs (
                id BIGSERIAL PRIMARY KEY,
                transaction_hash VARCHAR NOT NULL,
                block_number BIGINT NOT NULL,
                block_hash VARCHAR NOT NULL,
                log_index INTEGER NOT NULL,
                address VARCHAR NOT NULL,
                topic0 VARCHAR,
                topic1 VARCHAR,
                topic2 VARCHAR,
                topic3 VARCHAR,
                data TEXT NOT NULL,
                removed BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
            "CREATE UNIQUE INDEX IF NOT EXISTS event_logs_transaction_hash_log_index_index
            ON event_logs(transaction_hash, log_index)",
            "CREATE INDEX IF NOT EXISTS event_logs_block_number_index
            ON event_logs(block_number)",
            "CREATE INDEX IF NOT EXISTS event_logs_address_topic0_index
            ON event_logs(address, topic0)",
        ]
    }

    pub fn create_indexer_state() -> &'static [&'static str] {
        &[
            "CREATE TABLE IF NOT EXISTS indexer_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                last_indexed_block BIGINT NOT NULL DEFAULT 0,
                last_updated TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
            "INSERT INTO indexer_state (id, last_indexed_block)
            VALUES (1, 0) ON CONFLICT (id) DO NOTHING",
        ]
    }
}
