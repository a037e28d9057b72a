//! Storage shapes of the indexed records.
//!
//! 256-bit quantities are stored as decimal TEXT and parsed back on read;
//! a value that fails to parse surfaces as [`RepoError::InvalidRecord`].

use chrono::{DateTime, Utc};
use diesel::{Insertable, Queryable, Selectable};
use ethers::types::U256;

use crate::diesel::schema::{blocks, event_logs, indexer_state, transactions};
use crate::{Block, EventLog, IndexerState, RepoError, Transaction};

#[derive(Debug, Insertable, Queryable, Selectable)]
#[diesel(table_name = blocks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BlockRow {
    number: i64,
    hash: String,
    parent_hash: String,
    timestamp: i64,
    gas_limit: String,
    gas_used: String,
    miner: String,
    difficulty: Option<String>,
    total_difficulty: Option<String>,
    size: Option<i64>,
    extra_data: Option<String>,
    base_fee_per_gas: Option<String>,
}

impl From<&Block> for BlockRow {
    fn from(block: &Block) -> Self {
        Self {
            number: block.number as i64,
            hash: block.hash.clone(),
            parent_hash: block.parent_hash.clone(),
            timestamp: block.timestamp as i64,
            gas_limit: block.gas_limit.to_string(),
            gas_used: block.gas_used.to_string(),
            miner: block.miner.clone(),
            difficulty: block.difficulty.as_ref().map(U256::to_string),
            total_difficulty: block.total_difficulty.as_ref().map(U256::to_string),
            size: block.size.map(|size| size as i64),
            extra_data: block.extra_data.clone(),
            base_fee_per_gas: block.base_fee_per_gas.as_ref().map(U256::to_string),
        }
    }
}

impl TryFrom<BlockRow> for Block {
    type Error = RepoError;

    fn try_from(row: BlockRow) -> Result<Self, Self::Error> {
        Ok(Self {
            number: to_u64(row.number, "blocks.number")?,
            hash: row.hash,
            parent_hash: row.parent_hash,
            timestamp: to_u64(row.timestamp, "blocks.timestamp")?,
            gas_limit: parse_u256(&row.gas_limit, "blocks.gas_limit")?,
            gas_used: parse_u256(&row.gas_used, "blocks.gas_used")?,
            miner: row.miner,
            difficulty: parse_optional_u256(row.difficulty, "blocks.difficulty")?,
            total_difficulty: parse_optional_u256(row.total_difficulty, "blocks.total_difficulty")?,
            size: row.size.map(|size| to_u64(size, "blocks.size")).transpose()?,
            extra_data: row.extra_data,
            base_fee_per_gas: parse_optional_u256(row.base_fee_per_gas, "blocks.base_fee_per_gas")?,
        })
    }
}

#[derive(Debug, Insertable, Queryable, Selectable)]
#[diesel(table_name = transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TransactionRow {
    hash: String,
    block_number: i64,
    block_hash: String,
    transaction_index: i32,
    from_address: String,
    to_address: Option<String>,
    value: String,
    gas_limit: String,
    gas_used: Option<String>,
    gas_price: Option<String>,
    max_fee_per_gas: Option<String>,
    max_priority_fee_per_gas: Option<String>,
    nonce: String,
    input_data: Option<String>,
    status: Option<i32>,
    transaction_type: i32,
}

impl From<&Transaction> for TransactionRow {
    fn from(transaction: &Transaction) -> Self {
        Self {
            hash: transaction.hash.clone(),
            block_number: transaction.block_number as i64,
            block_hash: transaction.block_hash.clone(),
            transaction_index: transaction.transaction_index as i32,
            from_address: transaction.from_address.clone(),
            to_address: transaction.to_address.clone(),
            value: transaction.value.to_string(),
            gas_limit: transaction.gas_limit.to_string(),
            gas_used: transaction.gas_used.as_ref().map(U256::to_string),
            gas_price: transaction.gas_price.as_ref().map(U256::to_string),
            max_fee_per_gas: transaction.max_fee_per_gas.as_ref().map(U256::to_string),
            max_priority_fee_per_gas: transaction
                .max_priority_fee_per_gas
                .as_ref()
                .map(U256::to_string),
            nonce: transaction.nonce.to_string(),
            input_data: transaction.input_data.clone(),
            status: transaction.status.map(|status| status as i32),
            transaction_type: transaction.transaction_type as i32,
        }
    }
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = RepoError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            hash: row.hash,
            block_number: to_u64(row.block_number, "transactions.block_number")?,
            block_hash: row.block_hash,
            transaction_index: to_u32(row.transaction_index, "transactions.transaction_index")?,
            from_address: row.from_address,
            to_address: row.to_address,
            value: parse_u256(&row.value, "transactions.value")?,
            gas_limit: parse_u256(&row.gas_limit, "transactions.gas_limit")?,
            gas_used: parse_optional_u256(row.gas_used, "transactions.gas_used")?,
            gas_price: parse_optional_u256(row.gas_price, "transactions.gas_price")?,
            max_fee_per_gas: parse_optional_u256(row.max_fee_per_gas, "transactions.max_fee_per_gas")?,
            max_priority_fee_per_gas: parse_optional_u256(
                row.max_priority_fee_per_gas,
                "transactions.max_priority_fee_per_gas",
            )?,
            nonce: parse_u256(&row.nonce, "transactions.nonce")?,
            input_data: row.input_data,
            status: row
                .status
                .map(|status| to_u32(status, "transactions.status").map(u64::from))
                .transpose()?,
            transaction_type: to_u32(row.transaction_type, "transactions.transaction_type")?.into(),
        })
    }
}

#[derive(Debug, Insertable, Queryable, Selectable)]
#[diesel(table_name = event_logs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EventLogRow {
    transaction_hash: String,
    block_number: i64,
    block_hash: String,
    log_index: i32,
    address: String,
    topic0: Option<String>,
    topic1: Option<String>,
    topic2: Option<String>,
    topic3: Option<String>,
    data: String,
    removed: bool,
}

impl From<&EventLog> for EventLogRow {
    fn from(event_log: &EventLog) -> Self {
        Self {
            transaction_hash: event_log.transaction_hash.clone(),
            block_number: event_log.block_number as i64,
            block_hash: event_log.block_hash.clone(),
            log_index: event_log.log_index as i32,
            address: event_log.address.clone(),
            topic0: event_log.topic0.clone(),
            topic1: event_log.topic1.clone(),
            topic2: event_log.topic2.clone(),
            topic3: event_log.topic3.clone(),
            data: event_log.data.clone(),
            removed: event_log.removed,
        }
    }
}

impl TryFrom<EventLogRow> for EventLog {
    type Error = RepoError;

    fn try_from(row: EventLogRow) -> Result<Self, Self::Error> {
        Ok(Self {
            transaction_hash: row.transaction_hash,
            block_number: to_u64(row.block_number, "event_logs.block_number")?,
            block_hash: row.block_hash,
            log_index: to_u32(row.log_index, "event_logs.log_index")?,
            address: row.address,
            topic0: row.topic0,
            topic1: row.topic1,
            topic2: row.topic2,
            topic3: row.topic3,
            data: row.data,
            removed: row.removed,
        })
    }
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = indexer_state)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct IndexerStateRow {
    last_indexed_block: i64,
    last_updated: DateTime<Utc>,
}

impl TryFrom<IndexerStateRow> for IndexerState {
    type Error = RepoError;

    fn try_from(row: IndexerStateRow) -> Result<Self, Self::Error> {
        Ok(Self {
            last_indexed_block: to_u64(row.last_indexed_block, "indexer_state.last_indexed_block")?,
            last_updated: row.last_updated,
        })
    }
}

fn parse_u256(value: &str, column: &str) -> Result<U256, RepoError> {
    U256::from_dec_str(value)
        .map_err(|_| RepoError::InvalidRecord(format!("{column} is not a 256-bit decimal: {value}")))
}

fn parse_optional_u256(value: Option<String>, column: &str) -> Result<Option<U256>, RepoError> {
    value.map(|value| parse_u256(&value, column)).transpose()
}

fn to_u64(value: i64, column: &str) -> Result<u64, RepoError> {
    u64::try_from(value).map_err(|_| RepoError::InvalidRecord(format!("{column} is negative")))
}

fn to_u32(value: i32, column: &str) -> Result<u32, RepoError> {
    u32::try_from(value).map_err(|_| RepoError::InvalidRecord(format!("{column} is negative")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> Block {
        Block {
            number: 18_115_958,
            hash: format!("0x{:064x}", 18_115_958),
            parent_hash: format!("0x{:064x}", 18_115_957),
            timestamp: 1_695_000_000,
            gas_limit: U256::from(30_000_000u64),
            gas_used: U256::MAX,
            miner: format!("0x{:040x}", 0xfee),
            difficulty: Some(U256::zero()),
            total_difficulty: None,
            size: Some(1_234),
            extra_data: Some("0xbeef".to_string()),
            base_fee_per_gas: Some(U256::from(7u64)),
        }
    }

    #[test]
    fn stores_256_bit_quantities_as_decimal_text() {
        let row = BlockRow::from(&block());

        assert_eq!(row.gas_used, U256::MAX.to_string());
        assert_eq!(row.gas_limit, "30000000");
        assert_eq!(row.total_difficulty, None);
    }

    #[test]
    fn restores_blocks_from_rows() {
        let block = block();

        assert_eq!(Block::try_from(BlockRow::from(&block)), Ok(block));
    }

    #[test]
    fn rejects_rows_with_malformed_quantities() {
        let mut row = BlockRow::from(&block());
        row.gas_limit = "0x1c9c380".to_string();

        assert!(matches!(
            Block::try_from(row),
            Err(RepoError::InvalidRecord(_))
        ));
    }
}
