use ethers::types::{Transaction as EthersTransaction, TransactionReceipt, U256};

use crate::hashes::Hashes;
use crate::Block;

/// A transaction joined with the post-execution fields of its receipt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub hash: String,
    pub block_number: u64,
    pub block_hash: String,
    pub transaction_index: u32,
    pub from_address: String,
    /// Absent for contract creations
    pub to_address: Option<String>,
    pub value: U256,
    pub gas_limit: U256,
    pub gas_used: Option<U256>,
    pub gas_price: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
    pub nonce: U256,
    pub input_data: Option<String>,
    pub status: Option<u64>,
    pub transaction_type: u64,
}

impl Transaction {
    pub fn new(
        transaction: &EthersTransaction,
        receipt: &TransactionReceipt,
        block: &Block,
        position: usize,
    ) -> Self {
        let transaction_index = transaction
            .transaction_index
            .map(|index| index.as_u32())
            .unwrap_or(position as u32);

        Self {
            hash: Hashes::h256_to_string(&transaction.hash),
            block_number: block.number,
            block_hash: block.hash.clone(),
            transaction_index,
            from_address: Hashes::h160_to_string(&transaction.from),
            to_address: transaction.to.as_ref().map(Hashes::h160_to_string),
            value: transaction.value,
            gas_limit: transaction.gas,
            gas_used: receipt.gas_used,
            gas_price: transaction.gas_price,
            max_fee_per_gas: transaction.max_fee_per_gas,
            max_priority_fee_per_gas: transaction.max_priority_fee_per_gas,
            nonce: transaction.nonce,
            input_data: Some(Hashes::bytes_to_string(&transaction.input)),
            status: receipt.status.map(|status| status.as_u64()),
            transaction_type: transaction.transaction_type.map(|t| t.as_u64()).unwrap_or(0),
        }
    }
}
