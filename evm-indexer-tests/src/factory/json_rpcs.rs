use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use ethers::providers::ProviderError;
use ethers::types::{
    Address, Block, Filter, Log, Transaction, TransactionReceipt, TxHash, ValueOrArray, U64,
};
use evm_indexer::{JsonRpc, StopSignal};

use super::chain::{decode_transaction_hash, ethers_block, ethers_log, ethers_receipt, ethers_transaction};

/// Every call fails with `message`.
pub fn failing_json_rpc(message: &'static str) -> impl JsonRpc {
    #[derive(Clone)]
    struct FailingJsonRpc(&'static str);

    impl FailingJsonRpc {
        fn error(&self) -> ProviderError {
            ProviderError::CustomError(self.0.to_string())
        }
    }

    #[async_trait::async_trait]
    impl JsonRpc for FailingJsonRpc {
        async fn get_block_number(&self) -> Result<U64, ProviderError> {
            Err(self.error())
        }

        async fn get_block_with_txs(
            &self,
            _block_number: U64,
        ) -> Result<Option<Block<Transaction>>, ProviderError> {
            Err(self.error())
        }

        async fn get_transaction(&self, _hash: TxHash) -> Result<Option<Transaction>, ProviderError> {
            Err(self.error())
        }

        async fn get_transaction_receipt(
            &self,
            _hash: TxHash,
        ) -> Result<Option<TransactionReceipt>, ProviderError> {
            Err(self.error())
        }

        async fn get_logs(&self, _filter: &Filter) -> Result<Vec<Log>, ProviderError> {
            Err(self.error())
        }
    }

    FailingJsonRpc(message)
}

#[derive(Debug, Default)]
struct ChainState {
    head: u64,
    transactions_per_block: u32,
    log_emitter: Address,
    head_read_failures: VecDeque<&'static str>,
    missing_receipts: HashSet<TxHash>,
    stop_after_head_reads: Option<(u32, StopSignal)>,
    stop_on_log_request: Option<(u64, StopSignal)>,
    head_reads: u32,
    requested_blocks: Vec<u64>,
    requested_log_blocks: Vec<u64>,
}

/// An in-memory chain up to `head`, recording the calls made against it.
#[derive(Clone, Debug)]
pub struct ChainJsonRpc {
    state: Arc<Mutex<ChainState>>,
}

impl ChainJsonRpc {
    pub fn new(head: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChainState {
                head,
                transactions_per_block: 2,
                log_emitter: Address::from_low_u64_be(0xc0ffee),
                ..Default::default()
            })),
        }
    }

    pub fn with_transactions_per_block(self, transactions_per_block: u32) -> Self {
        self.state.lock().unwrap().transactions_per_block = transactions_per_block;

        self
    }

    pub fn with_log_emitter(self, log_emitter: Address) -> Self {
        self.state.lock().unwrap().log_emitter = log_emitter;

        self
    }

    /// The next head reads fail with these messages, in order.
    pub fn with_head_read_failures(self, messages: &[&'static str]) -> Self {
        self.state.lock().unwrap().head_read_failures.extend(messages);

        self
    }

    pub fn without_receipt_for(self, hash: TxHash) -> Self {
        self.state.lock().unwrap().missing_receipts.insert(hash);

        self
    }

    /// Raises `stop_signal` on the `head_reads`-th head read. That read still succeeds.
    pub fn stop_after_head_reads(&self, head_reads: u32, stop_signal: StopSignal) {
        self.state.lock().unwrap().stop_after_head_reads = Some((head_reads, stop_signal));
    }

    /// Raises `stop_signal` when the logs of `block_number` are requested.
    /// That request still succeeds.
    pub fn stop_on_log_request(&self, block_number: u64, stop_signal: StopSignal) {
        self.state.lock().unwrap().stop_on_log_request = Some((block_number, stop_signal));
    }

    pub fn head_reads(&self) -> u32 {
        self.state.lock().unwrap().head_reads
    }

    pub fn requested_blocks(&self) -> Vec<u64> {
        self.state.lock().unwrap().requested_blocks.clone()
    }

    pub fn requested_log_blocks(&self) -> Vec<u64> {
        self.state.lock().unwrap().requested_log_blocks.clone()
    }
}

#[async_trait::async_trait]
impl JsonRpc for ChainJsonRpc {
    async fn get_block_number(&self) -> Result<U64, ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.head_reads += 1;

        if let Some(message) = state.head_read_failures.pop_front() {
            return Err(ProviderError::CustomError(message.to_string()));
        }

        if let Some((head_reads, stop_signal)) = &state.stop_after_head_reads {
            if state.head_reads >= *head_reads {
                stop_signal.stop();
            }
        }

        Ok(U64::from(state.head))
    }

    async fn get_block_with_txs(
        &self,
        block_number: U64,
    ) -> Result<Option<Block<Transaction>>, ProviderError> {
        let mut state = self.state.lock().unwrap();
        let block_number = block_number.as_u64();
        state.requested_blocks.push(block_number);

        Ok((block_number <= state.head)
            .then(|| ethers_block(block_number, state.transactions_per_block)))
    }

    async fn get_transaction(&self, hash: TxHash) -> Result<Option<Transaction>, ProviderError> {
        let state = self.state.lock().unwrap();
        let (block_number, transaction_index) = decode_transaction_hash(hash);

        Ok((block_number <= state.head && transaction_index < state.transactions_per_block)
            .then(|| ethers_transaction(block_number, transaction_index)))
    }

    async fn get_transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<TransactionReceipt>, ProviderError> {
        let state = self.state.lock().unwrap();
        let (block_number, transaction_index) = decode_transaction_hash(hash);

        if state.missing_receipts.contains(&hash) {
            return Ok(None);
        }

        Ok((block_number <= state.head).then(|| ethers_receipt(block_number, transaction_index)))
    }

    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ProviderError> {
        let mut state = self.state.lock().unwrap();
        let from_block = filter.get_from_block().unwrap_or_default().as_u64();
        let to_block = filter.get_to_block().unwrap_or_default().as_u64();

        let emits = match &filter.address {
            None => true,
            Some(ValueOrArray::Value(address)) => *address == state.log_emitter,
            Some(ValueOrArray::Array(addresses)) => addresses.contains(&state.log_emitter),
        };

        let mut logs = vec![];
        for block_number in from_block..=to_block {
            state.requested_log_blocks.push(block_number);

            if let Some((stop_block_number, stop_signal)) = &state.stop_on_log_request {
                if *stop_block_number == block_number {
                    stop_signal.stop();
                }
            }

            if emits && block_number <= state.head {
                logs.extend((0..state.transactions_per_block).map(|transaction_index| {
                    ethers_log(block_number, transaction_index, state.log_emitter)
                }));
            }
        }

        Ok(logs)
    }
}
