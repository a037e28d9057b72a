use chrono::{DateTime, Utc};

/// The single persisted resume position of the indexer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexerState {
    pub last_indexed_block: u64,
    pub last_updated: DateTime<Utc>,
}

impl IndexerState {
    /// Watermark value before anything has been indexed
    pub const INITIAL_BLOCK_NUMBER: u64 = 0;

    /// Where indexing resumes: `start_block_number` on a fresh watermark,
    /// the block after the watermark otherwise.
    pub fn next_block_number(last_indexed_block: u64, start_block_number: u64) -> u64 {
        if last_indexed_block == Self::INITIAL_BLOCK_NUMBER {
            start_block_number
        } else {
            last_indexed_block + 1
        }
    }
}
