use ethers::types::{Block as EthersBlock, Transaction as EthersTransaction, U256};

use crate::chain_reader::ChainReaderError;
use crate::hashes::Hashes;

/// A block header as indexed.
/// Re-indexing the same `number` overwrites every other field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub number: u64,
    pub hash: String,
    pub parent_hash: String,
    pub timestamp: u64,
    pub gas_limit: U256,
    pub gas_used: U256,
    pub miner: String,
    pub difficulty: Option<U256>,
    pub total_difficulty: Option<U256>,
    pub size: Option<u64>,
    pub extra_data: Option<String>,
    pub base_fee_per_gas: Option<U256>,
}

impl Block {
    pub fn new(block: &EthersBlock<EthersTransaction>) -> Result<Self, ChainReaderError> {
        let number = block
            .number
            .ok_or_else(|| ChainReaderError::InvalidResponse("block without number".to_string()))?
            .as_u64();

        Ok(Self {
            number,
            // Only pending blocks come without a hash
            hash: block.hash.as_ref().map(Hashes::h256_to_string).unwrap_or_default(),
            parent_hash: Hashes::h256_to_string(&block.parent_hash),
            timestamp: u256_to_u64(block.timestamp, "timestamp", number)?,
            gas_limit: block.gas_limit,
            gas_used: block.gas_used,
            miner: block.author.as_ref().map(Hashes::h160_to_string).unwrap_or_default(),
            difficulty: Some(block.difficulty),
            total_difficulty: block.total_difficulty,
            size: block.size.map(|size| u256_to_u64(size, "size", number)).transpose()?,
            extra_data: Some(Hashes::bytes_to_string(&block.extra_data)),
            base_fee_per_gas: block.base_fee_per_gas,
        })
    }
}

fn u256_to_u64(value: U256, field: &str, block_number: u64) -> Result<u64, ChainReaderError> {
    if value.bits() > 64 {
        Err(ChainReaderError::InvalidResponse(format!(
            "block {block_number} has an out of range {field}: {value}"
        )))
    } else {
        Ok(value.as_u64())
    }
}
