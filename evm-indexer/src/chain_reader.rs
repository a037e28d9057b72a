//! Thin adapter over a node's JSON-RPC endpoint.
//!
//! Holds no state and performs no retries: every call maps one request (or one
//! small group of requests) to normalized records, or fails with a
//! [`ChainReaderError`] the scheduler can classify.

mod error;
mod json_rpc;

pub use error::ChainReaderError;
pub use json_rpc::{new_http, JsonRpc};

use std::sync::Arc;

use ethers::types::{Address, Block as EthersBlock, Filter, Transaction as EthersTransaction, U64};
use tracing::warn;

use crate::{Block, EventLog, Transaction};

#[derive(Clone, Debug)]
pub struct ChainReader<J: JsonRpc> {
    json_rpc: Arc<J>,
}

impl<J: JsonRpc> ChainReader<J> {
    pub fn new(json_rpc: J) -> Self {
        Self {
            json_rpc: Arc::new(json_rpc),
        }
    }

    pub async fn get_latest_block_number(&self) -> Result<u64, ChainReaderError> {
        let block_number = self.json_rpc.get_block_number().await?;

        Ok(block_number.as_u64())
    }

    pub async fn get_block(&self, block_number: u64) -> Result<Block, ChainReaderError> {
        let block = self.fetch_block(block_number).await?;

        Block::new(&block)
    }

    /// Transactions of the block in their in-block order, each joined with its receipt.
    /// Transactions the node cannot return a receipt for are skipped.
    pub async fn get_transactions(
        &self,
        block_number: u64,
    ) -> Result<Vec<Transaction>, ChainReaderError> {
        let ethers_block = self.fetch_block(block_number).await?;
        let block = Block::new(&ethers_block)?;

        let mut transactions = Vec::with_capacity(ethers_block.transactions.len());

        let hashes = ethers_block.transactions.iter().map(|tx| tx.hash);

        for (position, hash) in hashes.enumerate() {
            let transaction = self.json_rpc.get_transaction(hash).await?;
            let receipt = self.json_rpc.get_transaction_receipt(hash).await?;

            match (transaction, receipt) {
                (Some(transaction), Some(receipt)) => {
                    transactions.push(Transaction::new(&transaction, &receipt, &block, position))
                }
                _ => warn!(
                    block_number,
                    transaction_hash = ?hash,
                    "Skipping transaction the node returned no receipt for"
                ),
            }
        }

        Ok(transactions)
    }

    /// Event logs emitted in the block, restricted to `contract_addresses` unless empty.
    pub async fn get_event_logs(
        &self,
        block_number: u64,
        contract_addresses: &[Address],
    ) -> Result<Vec<EventLog>, ChainReaderError> {
        let filter = logs_filter(block_number, contract_addresses);
        let logs = self.json_rpc.get_logs(&filter).await?;

        logs.iter().map(EventLog::new).collect()
    }

    async fn fetch_block(
        &self,
        block_number: u64,
    ) -> Result<EthersBlock<EthersTransaction>, ChainReaderError> {
        self.json_rpc
            .get_block_with_txs(U64::from(block_number))
            .await?
            .ok_or(ChainReaderError::NotFound(block_number))
    }
}

fn logs_filter(block_number: u64, contract_addresses: &[Address]) -> Filter {
    let filter = Filter::new().from_block(block_number).to_block(block_number);

    if contract_addresses.is_empty() {
        filter
    } else {
        filter.address(contract_addresses.to_vec())
    }
}
