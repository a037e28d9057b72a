//! The indexing loop.
//!
//! A [`Scheduler`] walks the chain from its watermark towards the confirmed
//! head one batch at a time, committing blocks in strictly increasing order.
//! It never gives up on errors: failed batches are retried after a progressive
//! backoff until a stop is requested through its [`SchedulerHandle`].

mod error;
mod process_batch;
mod status;

pub use error::IndexingError;
pub use process_batch::next_batch;
pub use status::{HealthStatus, IndexingProgress};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ethers::providers::{Http, Provider};
use ethers::types::Address;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::backoff::{batch_backoff_delay, needs_extended_cooldown, EXTENDED_COOLDOWN};
use crate::chain_reader::{new_http, ChainReader, JsonRpc};
use crate::{
    Config, ConfigError, ConfirmationDepth, IndexerError, IndexerRepo, IndexerRepoConn,
    IndexerState, Repo, RepoError,
};
use process_batch::BlockIndexer;
use status::SchedulerStatus;

/// Cooperative cancellation flag shared between the loop and its handles.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

enum BatchOutcome {
    CaughtUp,
    Indexed(u64, u64),
}

/// What the loop does after a batch fails.
#[derive(Debug, PartialEq, Eq)]
enum Recovery {
    Stop,
    /// The connection is gone; the caller has to provide a new one
    Reconnect(RepoError),
    BackOff(IndexingError),
}

impl From<IndexingError> for Recovery {
    fn from(error: IndexingError) -> Self {
        match error {
            IndexingError::Cancelled => Recovery::Stop,
            IndexingError::Repo(error @ RepoError::NotConnected(_)) => Recovery::Reconnect(error),
            error => Recovery::BackOff(error),
        }
    }
}

pub struct Scheduler<J: JsonRpc> {
    config: Config,
    chain_reader: ChainReader<J>,
    contract_addresses: Vec<Address>,
    stop_signal: StopSignal,
    status: Arc<SchedulerStatus>,
    current_block: Option<u64>,
    consecutive_errors: u32,
}

impl Scheduler<Provider<Http>> {
    pub fn from_config(config: Config) -> Result<Self, IndexerError> {
        let json_rpc = new_http(&config.json_rpc_url).map_err(ConfigError::InvalidJsonRpcUrl)?;

        Self::new(config, json_rpc)
    }
}

impl<J: JsonRpc> Scheduler<J> {
    pub fn new(config: Config, json_rpc: J) -> Result<Self, IndexerError> {
        config.validate()?;
        let contract_addresses = config.get_contract_addresses()?;

        Ok(Self {
            config,
            chain_reader: ChainReader::new(json_rpc),
            contract_addresses,
            stop_signal: StopSignal::new(),
            status: Arc::new(SchedulerStatus::default()),
            current_block: None,
            consecutive_errors: 0,
        })
    }

    pub fn handle(&self) -> SchedulerHandle<J> {
        SchedulerHandle {
            stop_signal: self.stop_signal.clone(),
            status: self.status.clone(),
            chain_reader: self.chain_reader.clone(),
            confirmation_depth: self.config.confirmation_depth,
        }
    }

    /// Indexes until stopped, reconnecting to the database whenever the
    /// connection is lost. Only fails if the connection pool cannot be built.
    pub async fn run(&mut self) -> Result<(), IndexerError> {
        let pool = self.config.repo.get_pool(1).await?;

        self.status.set_running(true);
        info!(config = ?self.config, "Starting indexer");

        while !self.stop_signal.is_stopped() {
            let result = match IndexerRepo::get_conn(&pool).await {
                Ok(mut conn) => self.index_until_stopped(&mut conn).await,
                Err(error) => Err(error),
            };

            if let Err(error) = result {
                self.back_off(&IndexingError::Repo(error)).await;
            }
        }

        self.status.set_running(false);
        info!("Indexer stopped");

        Ok(())
    }

    /// Like [`Scheduler::run`] over a caller-provided connection.
    /// Returns [`RepoError::NotConnected`] if that connection is lost.
    pub async fn run_with_conn<'a>(
        &mut self,
        conn: &mut IndexerRepoConn<'a>,
    ) -> Result<(), RepoError> {
        self.status.set_running(true);
        let result = self.index_until_stopped(conn).await;
        self.status.set_running(false);

        result
    }

    async fn index_until_stopped<'a>(
        &mut self,
        conn: &mut IndexerRepoConn<'a>,
    ) -> Result<(), RepoError> {
        while !self.stop_signal.is_stopped() {
            match self.process_next_batch(conn).await {
                Ok(BatchOutcome::CaughtUp) => {
                    sleep(Duration::from_millis(self.config.polling_interval_ms)).await;
                }
                Ok(BatchOutcome::Indexed(from_block, to_block)) => {
                    if self.consecutive_errors > 0 {
                        info!(
                            consecutive_errors = self.consecutive_errors,
                            "Indexing recovered"
                        );
                    }
                    self.consecutive_errors = 0;
                    self.status.set_consecutive_errors(0);
                    info!(from_block, to_block, "Indexed batch");

                    sleep(Duration::from_millis(self.config.batch_interval_ms)).await;
                }
                Err(error) => match Recovery::from(error) {
                    Recovery::Stop => break,
                    Recovery::Reconnect(error) => return Err(error),
                    Recovery::BackOff(error) => self.back_off(&error).await,
                },
            }
        }

        Ok(())
    }

    async fn process_next_batch<'a>(
        &mut self,
        conn: &mut IndexerRepoConn<'a>,
    ) -> Result<BatchOutcome, IndexingError> {
        let current_block = match self.current_block {
            Some(current_block) => current_block,
            None => self.resume_position(conn).await?,
        };

        let block_indexer = BlockIndexer {
            chain_reader: &self.chain_reader,
            contract_addresses: &self.contract_addresses,
            retry_policy: &self.config.retry_policy,
            stop_signal: &self.stop_signal,
        };

        let latest_block_number = block_indexer.get_latest_block_number().await?;

        let Some(batch) = next_batch(
            current_block,
            latest_block_number,
            self.config.confirmation_depth,
            self.config.blocks_per_batch,
        ) else {
            debug!(current_block, latest_block_number, "Waiting for confirmations");
            return Ok(BatchOutcome::CaughtUp);
        };

        let (from_block, to_block) = (*batch.start(), *batch.end());

        for block_number in batch {
            if self.stop_signal.is_stopped() {
                return Err(IndexingError::Cancelled);
            }

            block_indexer.index_block(conn, block_number).await?;
            self.current_block = Some(block_number + 1);
        }

        Ok(BatchOutcome::Indexed(from_block, to_block))
    }

    async fn resume_position<'a>(
        &mut self,
        conn: &mut IndexerRepoConn<'a>,
    ) -> Result<u64, IndexingError> {
        let last_indexed_block = IndexerRepo::get_last_indexed_block(conn).await?;
        let current_block =
            IndexerState::next_block_number(last_indexed_block, self.config.start_block_number);

        info!(last_indexed_block, current_block, "Resuming indexing");
        self.current_block = Some(current_block);

        Ok(current_block)
    }

    async fn back_off(&mut self, error: &IndexingError) {
        // The watermark is the source of truth after a failed batch
        self.current_block = None;
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        self.status.set_consecutive_errors(self.consecutive_errors);

        let delay = batch_backoff_delay(self.consecutive_errors);
        error!(
            %error,
            consecutive_errors = self.consecutive_errors,
            delay_ms = delay.as_millis() as u64,
            "Indexing batch failed"
        );
        sleep(delay).await;

        if needs_extended_cooldown(self.consecutive_errors) {
            warn!(
                consecutive_errors = self.consecutive_errors,
                cooldown_secs = EXTENDED_COOLDOWN.as_secs(),
                "Too many consecutive errors, cooling down"
            );
            sleep(EXTENDED_COOLDOWN).await;
        }
    }
}

/// Read-only view of a running [`Scheduler`] that can also request it to stop.
#[derive(Clone, Debug)]
pub struct SchedulerHandle<J: JsonRpc> {
    stop_signal: StopSignal,
    status: Arc<SchedulerStatus>,
    chain_reader: ChainReader<J>,
    confirmation_depth: ConfirmationDepth,
}

impl<J: JsonRpc> SchedulerHandle<J> {
    /// Takes effect at the next stop check; in-flight calls are not interrupted.
    pub fn stop(&self) {
        info!("Stop requested");
        self.stop_signal.stop();
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop_signal.clone()
    }

    pub fn health(&self) -> HealthStatus {
        self.status.health()
    }

    pub async fn progress<'a>(
        &self,
        conn: &mut IndexerRepoConn<'a>,
    ) -> Result<IndexingProgress, IndexingError> {
        let last_indexed_block = IndexerRepo::get_last_indexed_block(conn).await?;
        let latest_network_block = self.chain_reader.get_latest_block_number().await?;

        Ok(IndexingProgress::new(
            last_indexed_block,
            latest_network_block,
            self.confirmation_depth,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChainReaderError;

    #[test]
    fn hands_lost_connections_back_for_reconnecting() {
        let error = IndexingError::Repo(RepoError::NotConnected(
            "server closed the connection".to_string(),
        ));

        assert_eq!(
            Recovery::from(error),
            Recovery::Reconnect(RepoError::NotConnected(
                "server closed the connection".to_string()
            ))
        );
    }

    #[test]
    fn backs_off_on_every_other_failure() {
        let repo_error = IndexingError::Repo(RepoError::Unknown("deadlock detected".to_string()));
        let chain_error = IndexingError::ChainReader(ChainReaderError::NotFound(42));

        assert_eq!(
            Recovery::from(repo_error),
            Recovery::BackOff(IndexingError::Repo(RepoError::Unknown(
                "deadlock detected".to_string()
            )))
        );
        assert_eq!(
            Recovery::from(chain_error),
            Recovery::BackOff(IndexingError::ChainReader(ChainReaderError::NotFound(42)))
        );
    }

    #[test]
    fn stops_once_cancelled() {
        assert_eq!(Recovery::from(IndexingError::Cancelled), Recovery::Stop);
    }

    #[test]
    fn stop_signal_is_shared_between_clones() {
        let stop_signal = StopSignal::new();
        let handle_signal = stop_signal.clone();

        handle_signal.stop();

        assert!(stop_signal.is_stopped());
    }
}
