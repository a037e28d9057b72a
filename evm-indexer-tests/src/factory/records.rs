use evm_indexer::{Block, EventLog, Transaction, U256};

pub fn block(number: u64) -> Block {
    Block {
        number,
        hash: block_hash(number),
        parent_hash: block_hash(number.saturating_sub(1)),
        timestamp: 1_700_000_000 + number * 12,
        gas_limit: U256::from(30_000_000u64),
        gas_used: U256::from(21_000u64 * 2),
        miner: "0x95222290dd7278aa3ddd389cc1e1d165cc4bafe5".to_string(),
        difficulty: Some(U256::zero()),
        total_difficulty: Some(U256::from_dec_str("58750003716598352816469").unwrap()),
        size: Some(1_234),
        extra_data: Some("0x6265617665726275696c642e6f7267".to_string()),
        base_fee_per_gas: Some(U256::from(7_000_000_000u64)),
    }
}

pub fn transaction(block: &Block, transaction_index: u32) -> Transaction {
    Transaction {
        hash: transaction_hash(block.number, transaction_index),
        block_number: block.number,
        block_hash: block.hash.clone(),
        transaction_index,
        from_address: "0xb518b3136e491101f22b77f385fe22269c515188".to_string(),
        to_address: Some("0x7dfd6013cf8d92b751e63d481b51fe0e4c5abf5e".to_string()),
        value: U256::exp10(18),
        gas_limit: U256::from(21_000u64),
        gas_used: Some(U256::from(21_000u64)),
        gas_price: Some(U256::from(7_500_000_000u64)),
        max_fee_per_gas: Some(U256::from(9_000_000_000u64)),
        max_priority_fee_per_gas: Some(U256::from(500_000_000u64)),
        nonce: U256::from(transaction_index),
        input_data: Some("0x".to_string()),
        status: Some(1),
        transaction_type: 2,
    }
}

pub fn event_log(transaction: &Transaction, log_index: u32) -> EventLog {
    EventLog {
        transaction_hash: transaction.hash.clone(),
        block_number: transaction.block_number,
        block_hash: transaction.block_hash.clone(),
        log_index,
        address: "0x8a90cab2b38dba80c64b7734e58ee1db38b8993e".to_string(),
        topic0: Some(
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef".to_string(),
        ),
        topic1: Some(
            "0x000000000000000000000000b518b3136e491101f22b77f385fe22269c515188".to_string(),
        ),
        topic2: Some(
            "0x0000000000000000000000007dfd6013cf8d92b751e63d481b51fe0e4c5abf5e".to_string(),
        ),
        topic3: None,
        data: "0x000000000000000000000000000000000000000000000000000000000000067d".to_string(),
        removed: false,
    }
}

/// A block with `transactions_count` transactions, each emitting one log.
pub fn block_with_records(
    number: u64,
    transactions_count: u32,
) -> (Block, Vec<Transaction>, Vec<EventLog>) {
    let block = block(number);
    let transactions: Vec<_> = (0..transactions_count).map(|i| transaction(&block, i)).collect();
    let event_logs = transactions.iter().zip(0..).map(|(t, i)| event_log(t, i)).collect();

    (block, transactions, event_logs)
}

fn block_hash(number: u64) -> String {
    format!("0x{number:064x}")
}

fn transaction_hash(block_number: u64, transaction_index: u32) -> String {
    format!("0x{block_number:016x}{:040x}{transaction_index:08x}", 0xaa)
}
