use ethers::prelude::Middleware;
use ethers::providers::{Http, Provider, ProviderError};
use ethers::types::{
    Block, BlockNumber, Filter, Log, Transaction, TransactionReceipt, TxHash, U64,
};

/// The JSON-RPC calls the indexer makes against a node.
#[async_trait::async_trait]
pub trait JsonRpc: Clone + Sync + Send + 'static {
    async fn get_block_number(&self) -> Result<U64, ProviderError>;
    async fn get_block_with_txs(
        &self,
        block_number: U64,
    ) -> Result<Option<Block<Transaction>>, ProviderError>;
    async fn get_transaction(&self, hash: TxHash) -> Result<Option<Transaction>, ProviderError>;
    async fn get_transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<TransactionReceipt>, ProviderError>;
    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ProviderError>;
}

#[async_trait::async_trait]
impl JsonRpc for Provider<Http> {
    async fn get_block_number(&self) -> Result<U64, ProviderError> {
        Middleware::get_block_number(self).await
    }

    async fn get_block_with_txs(
        &self,
        block_number: U64,
    ) -> Result<Option<Block<Transaction>>, ProviderError> {
        Middleware::get_block_with_txs(self, BlockNumber::Number(block_number)).await
    }

    async fn get_transaction(&self, hash: TxHash) -> Result<Option<Transaction>, ProviderError> {
        Middleware::get_transaction(self, hash).await
    }

    async fn get_transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<TransactionReceipt>, ProviderError> {
        Middleware::get_transaction_receipt(self, hash).await
    }

    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ProviderError> {
        Middleware::get_logs(self, filter).await
    }
}

pub fn new_http(json_rpc_url: &str) -> Result<Provider<Http>, String> {
    Provider::<Http>::try_from(json_rpc_url).map_err(|error| error.to_string())
}
