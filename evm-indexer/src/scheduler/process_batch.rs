use std::ops::RangeInclusive;

use ethers::types::Address;
use tracing::debug;

use super::{IndexingError, StopSignal};
use crate::chain_reader::{ChainReader, JsonRpc};
use crate::retry::{execute_with_retry, RetryPolicy};
use crate::{ConfirmationDepth, IndexerRepo, IndexerRepoConn, Repo};

/// The inclusive range of blocks the next batch covers, or `None` while
/// `current_block` is not yet confirmed.
pub fn next_batch(
    current_block: u64,
    latest_network_block: u64,
    confirmation_depth: ConfirmationDepth,
    blocks_per_batch: u64,
) -> Option<RangeInclusive<u64>> {
    let target_block = confirmation_depth.deduct_from(latest_network_block)?;

    if current_block > target_block {
        return None;
    }

    let end_block = current_block
        .saturating_add(blocks_per_batch.saturating_sub(1))
        .min(target_block);

    Some(current_block..=end_block)
}

pub struct BlockIndexer<'r, J: JsonRpc> {
    pub chain_reader: &'r ChainReader<J>,
    pub contract_addresses: &'r [Address],
    pub retry_policy: &'r RetryPolicy,
    pub stop_signal: &'r StopSignal,
}

impl<'r, J: JsonRpc> BlockIndexer<'r, J> {
    pub async fn get_latest_block_number(&self) -> Result<u64, IndexingError> {
        let chain_reader = self.chain_reader;

        execute_with_retry(
            "get_latest_block_number",
            self.retry_policy,
            self.stop_signal,
            move || chain_reader.get_latest_block_number(),
        )
        .await
    }

    /// Fetches the block, its transactions and its logs, then commits them together.
    /// Nothing is written unless all three fetches succeed.
    pub async fn index_block<'a>(
        &self,
        conn: &mut IndexerRepoConn<'a>,
        block_number: u64,
    ) -> Result<(), IndexingError> {
        let chain_reader = self.chain_reader;
        let contract_addresses = self.contract_addresses;

        let block = execute_with_retry("get_block", self.retry_policy, self.stop_signal, move || {
            chain_reader.get_block(block_number)
        })
        .await?;

        let transactions = execute_with_retry(
            "get_transactions",
            self.retry_policy,
            self.stop_signal,
            move || chain_reader.get_transactions(block_number),
        )
        .await?;

        let event_logs = execute_with_retry(
            "get_event_logs",
            self.retry_policy,
            self.stop_signal,
            move || chain_reader.get_event_logs(block_number, contract_addresses),
        )
        .await?;

        IndexerRepo::commit_block(conn, &block, &transactions, &event_logs).await?;

        debug!(
            block_number,
            transactions = transactions.len(),
            event_logs = event_logs.len(),
            "Indexed block"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_a_full_batch_when_far_behind() {
        assert_eq!(next_batch(100, 10_000, ConfirmationDepth::new(12), 10), Some(100..=109));
    }

    #[test]
    fn stops_at_the_confirmed_block() {
        assert_eq!(next_batch(980, 1_000, ConfirmationDepth::new(12), 10), Some(980..=988));
        assert_eq!(next_batch(100, 104, ConfirmationDepth::new(0), 5), Some(100..=104));
    }

    #[test]
    fn waits_once_caught_up() {
        assert_eq!(next_batch(989, 1_000, ConfirmationDepth::new(12), 10), None);
    }

    #[test]
    fn waits_while_the_chain_is_shorter_than_the_confirmation_depth() {
        assert_eq!(next_batch(0, 5, ConfirmationDepth::new(12), 10), None);
    }

    #[test]
    fn indexes_single_blocks() {
        assert_eq!(next_batch(42, 1_000, ConfirmationDepth::new(0), 1), Some(42..=42));
    }
}
