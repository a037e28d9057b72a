use ethers::types::{
    Address, Block, Bytes, Log, Transaction, TransactionReceipt, H256, U256, U64,
};

pub const TRANSFER_EVENT_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

pub fn random_address() -> Address {
    Address::from(rand::random::<[u8; 20]>())
}

pub fn ethers_block_hash(number: u64) -> H256 {
    H256::from_low_u64_be(number)
}

/// Encodes the block number and in-block position so lookups by hash can be answered.
pub fn ethers_transaction_hash(block_number: u64, transaction_index: u32) -> H256 {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&block_number.to_be_bytes());
    bytes[27] = 0xaa;
    bytes[28..].copy_from_slice(&transaction_index.to_be_bytes());

    H256(bytes)
}

pub fn decode_transaction_hash(hash: H256) -> (u64, u32) {
    let mut block_number = [0u8; 8];
    block_number.copy_from_slice(&hash.0[..8]);
    let mut transaction_index = [0u8; 4];
    transaction_index.copy_from_slice(&hash.0[28..]);

    (u64::from_be_bytes(block_number), u32::from_be_bytes(transaction_index))
}

pub fn ethers_block(number: u64, transactions_count: u32) -> Block<Transaction> {
    Block {
        number: Some(U64::from(number)),
        hash: Some(ethers_block_hash(number)),
        parent_hash: ethers_block_hash(number.saturating_sub(1)),
        timestamp: U256::from(1_700_000_000 + number * 12),
        gas_limit: U256::from(30_000_000u64),
        gas_used: U256::from(21_000u64) * U256::from(transactions_count),
        author: Some(Address::from_low_u64_be(0xfee)),
        difficulty: U256::zero(),
        total_difficulty: Some(U256::from_dec_str("58750003716598352816469").unwrap()),
        size: Some(U256::from(1_234u64)),
        base_fee_per_gas: Some(U256::from(7_000_000_000u64)),
        transactions: (0..transactions_count)
            .map(|index| ethers_transaction(number, index))
            .collect(),
        ..Default::default()
    }
}

pub fn ethers_transaction(block_number: u64, transaction_index: u32) -> Transaction {
    Transaction {
        hash: ethers_transaction_hash(block_number, transaction_index),
        nonce: U256::from(transaction_index),
        block_hash: Some(ethers_block_hash(block_number)),
        block_number: Some(U64::from(block_number)),
        transaction_index: Some(U64::from(transaction_index)),
        from: Address::from_low_u64_be(0xb518),
        to: Some(Address::from_low_u64_be(0x7dfd)),
        value: U256::MAX,
        gas_price: Some(U256::from(7_500_000_000u64)),
        gas: U256::from(21_000u64),
        input: Bytes::from(vec![0xa9, 0x05, 0x9c, 0xbb]),
        transaction_type: Some(U64::from(2)),
        max_fee_per_gas: Some(U256::from(9_000_000_000u64)),
        max_priority_fee_per_gas: Some(U256::from(500_000_000u64)),
        ..Default::default()
    }
}

pub fn ethers_receipt(block_number: u64, transaction_index: u32) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: ethers_transaction_hash(block_number, transaction_index),
        transaction_index: U64::from(transaction_index),
        block_hash: Some(ethers_block_hash(block_number)),
        block_number: Some(U64::from(block_number)),
        gas_used: Some(U256::from(21_000u64)),
        status: Some(U64::from(1)),
        ..Default::default()
    }
}

pub fn ethers_log(block_number: u64, transaction_index: u32, address: Address) -> Log {
    Log {
        address,
        topics: vec![TRANSFER_EVENT_TOPIC.parse().unwrap()],
        data: Bytes::from(vec![0x06, 0x7d]),
        block_hash: Some(ethers_block_hash(block_number)),
        block_number: Some(U64::from(block_number)),
        transaction_hash: Some(ethers_transaction_hash(block_number, transaction_index)),
        transaction_index: Some(U64::from(transaction_index)),
        log_index: Some(U256::from(transaction_index)),
        removed: Some(false),
        ..Default::default()
    }
}
