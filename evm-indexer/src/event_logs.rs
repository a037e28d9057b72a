use ethers::types::Log;

use crate::chain_reader::ChainReaderError;
use crate::hashes::Hashes;

/// An event log, identified by `(transaction_hash, log_index)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventLog {
    pub transaction_hash: String,
    pub block_number: u64,
    pub block_hash: String,
    pub log_index: u32,
    pub address: String,
    /// The event signature hash
    pub topic0: Option<String>,
    pub topic1: Option<String>,
    pub topic2: Option<String>,
    pub topic3: Option<String>,
    pub data: String,
    /// Reorg marker as reported by the node.
    /// Confirmed logs are never removed so this stays false in practice.
    pub removed: bool,
}

impl EventLog {
    pub fn new(log: &Log) -> Result<Self, ChainReaderError> {
        let missing = |field: &str| ChainReaderError::InvalidResponse(format!("log without {field}"));
        let topic = |index: usize| log.topics.get(index).map(Hashes::h256_to_string);

        Ok(Self {
            transaction_hash: Hashes::h256_to_string(
                &log.transaction_hash.ok_or_else(|| missing("transaction hash"))?,
            ),
            block_number: log.block_number.ok_or_else(|| missing("block number"))?.as_u64(),
            block_hash: Hashes::h256_to_string(&log.block_hash.ok_or_else(|| missing("block hash"))?),
            log_index: log.log_index.ok_or_else(|| missing("log index"))?.as_u32(),
            address: Hashes::h160_to_string(&log.address),
            topic0: topic(0),
            topic1: topic(1),
            topic2: topic(2),
            topic3: topic(3),
            data: Hashes::bytes_to_string(&log.data),
            removed: log.removed.unwrap_or(false),
        })
    }
}
