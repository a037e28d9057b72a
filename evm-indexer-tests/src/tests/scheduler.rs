#[cfg(test)]
mod tests {
    use evm_indexer::{
        Config, HealthStatus, IndexerError, IndexerRepo, IndexingProgress, Repo, RetryPolicy,
        Scheduler,
    };

    use crate::factory::ChainJsonRpc;
    use crate::test_runner;

    fn config(start_block_number: u64, blocks_per_batch: u64, confirmation_blocks: u64) -> Config {
        Config::new("http://localhost:8545", test_runner::new_repo())
            .with_start_block_number(start_block_number)
            .with_blocks_per_batch(blocks_per_batch)
            .with_confirmation_blocks(confirmation_blocks)
            .with_polling_interval_ms(0)
            .with_batch_interval_ms(0)
            .with_retry_policy(RetryPolicy::immediate())
    }

    #[tokio::test]
    pub async fn indexes_a_batch_up_to_the_chain_head() {
        let pool = test_runner::get_pool().await;

        test_runner::run_test(&pool, |mut conn| async move {
            let json_rpc = ChainJsonRpc::new(104);
            let mut scheduler = Scheduler::new(config(100, 5, 0), json_rpc.clone()).unwrap();
            let handle = scheduler.handle();
            json_rpc.stop_after_head_reads(2, handle.stop_signal());

            scheduler.run_with_conn(&mut conn).await.unwrap();

            assert_eq!(json_rpc.requested_log_blocks(), vec![100, 101, 102, 103, 104]);
            assert_eq!(IndexerRepo::get_last_indexed_block(&mut conn).await, Ok(104));
            for block_number in 100..=104 {
                let block = IndexerRepo::get_block_by_number(&mut conn, block_number).await;
                let transactions =
                    IndexerRepo::get_transactions_by_block_number(&mut conn, block_number).await;

                assert!(matches!(block, Ok(Some(_))));
                assert_eq!(transactions.unwrap().len(), 2);
            }
            assert_eq!(handle.health(), HealthStatus::new(false, 0));
            assert_eq!(
                handle.progress(&mut conn).await,
                Ok(IndexingProgress {
                    last_indexed_block: 104,
                    latest_network_block: 104,
                    blocks_remaining: 0,
                })
            );
        })
        .await;
    }

    #[tokio::test]
    pub async fn never_requests_blocks_within_the_confirmation_depth() {
        let pool = test_runner::get_pool().await;

        test_runner::run_test(&pool, |mut conn| async move {
            let json_rpc = ChainJsonRpc::new(1_000).with_transactions_per_block(1);
            let mut scheduler = Scheduler::new(config(980, 5, 12), json_rpc.clone()).unwrap();
            json_rpc.stop_after_head_reads(3, scheduler.handle().stop_signal());

            scheduler.run_with_conn(&mut conn).await.unwrap();

            let requested_blocks = json_rpc.requested_blocks();
            assert_eq!(requested_blocks.iter().max(), Some(&988));
            assert_eq!(requested_blocks.iter().min(), Some(&980));
            assert_eq!(json_rpc.requested_log_blocks(), (980..=988).collect::<Vec<_>>());
            assert_eq!(IndexerRepo::get_last_indexed_block(&mut conn).await, Ok(988));
        })
        .await;
    }

    #[tokio::test]
    pub async fn waits_while_caught_up() {
        let pool = test_runner::get_pool().await;

        test_runner::run_test(&pool, |mut conn| async move {
            let json_rpc = ChainJsonRpc::new(5);
            let mut scheduler = Scheduler::new(config(300, 10, 12), json_rpc.clone()).unwrap();
            json_rpc.stop_after_head_reads(3, scheduler.handle().stop_signal());

            scheduler.run_with_conn(&mut conn).await.unwrap();

            assert_eq!(json_rpc.head_reads(), 3);
            assert!(json_rpc.requested_blocks().is_empty());
        })
        .await;
    }

    #[tokio::test]
    pub async fn retries_transient_head_reads_in_place() {
        let pool = test_runner::get_pool().await;

        test_runner::run_test(&pool, |mut conn| async move {
            let json_rpc = ChainJsonRpc::new(404)
                .with_head_read_failures(&["503 Service Unavailable", "request timed out"]);
            let mut scheduler = Scheduler::new(config(400, 5, 0), json_rpc.clone()).unwrap();
            let handle = scheduler.handle();
            // Two failed reads, the batch read, then the read that stops the loop
            json_rpc.stop_after_head_reads(4, handle.stop_signal());

            scheduler.run_with_conn(&mut conn).await.unwrap();

            assert_eq!(json_rpc.requested_log_blocks(), vec![400, 401, 402, 403, 404]);
            assert_eq!(handle.health().consecutive_errors, 0);
        })
        .await;
    }

    #[tokio::test]
    pub async fn backs_off_and_recovers_from_failed_batches() {
        let pool = test_runner::get_pool().await;

        test_runner::run_test(&pool, |mut conn| async move {
            let json_rpc = ChainJsonRpc::new(504).with_head_read_failures(&["invalid argument 0"]);
            let mut scheduler = Scheduler::new(config(500, 5, 0), json_rpc.clone()).unwrap();
            let handle = scheduler.handle();
            json_rpc.stop_after_head_reads(3, handle.stop_signal());

            scheduler.run_with_conn(&mut conn).await.unwrap();

            assert_eq!(json_rpc.requested_log_blocks(), vec![500, 501, 502, 503, 504]);
            assert_eq!(IndexerRepo::get_last_indexed_block(&mut conn).await, Ok(504));
            assert_eq!(handle.health(), HealthStatus::new(false, 0));
        })
        .await;
    }

    #[tokio::test]
    pub async fn stops_between_blocks_of_a_batch() {
        let pool = test_runner::get_pool().await;

        test_runner::run_test(&pool, |mut conn| async move {
            let json_rpc = ChainJsonRpc::new(704);
            let mut scheduler = Scheduler::new(config(700, 5, 0), json_rpc.clone()).unwrap();
            let handle = scheduler.handle();
            json_rpc.stop_on_log_request(702, handle.stop_signal());

            scheduler.run_with_conn(&mut conn).await.unwrap();

            assert_eq!(json_rpc.head_reads(), 1);
            assert_eq!(json_rpc.requested_log_blocks(), vec![700, 701, 702]);
            assert_eq!(json_rpc.requested_blocks().iter().max(), Some(&702));
            assert_eq!(IndexerRepo::get_last_indexed_block(&mut conn).await, Ok(702));
            assert_eq!(
                IndexerRepo::get_block_by_number(&mut conn, 703).await,
                Ok(None)
            );
            assert_eq!(handle.health(), HealthStatus::new(false, 0));
        })
        .await;
    }

    #[tokio::test]
    pub async fn resumes_after_the_watermark() {
        let pool = test_runner::get_pool().await;

        test_runner::run_test(&pool, |mut conn| async move {
            let json_rpc = ChainJsonRpc::new(612);

            let mut first_run = Scheduler::new(config(600, 1, 0), json_rpc.clone()).unwrap();
            json_rpc.stop_after_head_reads(2, first_run.handle().stop_signal());
            first_run.run_with_conn(&mut conn).await.unwrap();

            assert_eq!(IndexerRepo::get_last_indexed_block(&mut conn).await, Ok(600));

            let head_reads = json_rpc.head_reads();
            let mut second_run = Scheduler::new(config(600, 5, 0), json_rpc.clone()).unwrap();
            json_rpc.stop_after_head_reads(head_reads + 2, second_run.handle().stop_signal());
            second_run.run_with_conn(&mut conn).await.unwrap();

            assert_eq!(json_rpc.requested_log_blocks(), vec![600, 601, 602, 603, 604, 605]);
            assert_eq!(IndexerRepo::get_last_indexed_block(&mut conn).await, Ok(605));
        })
        .await;
    }

    #[test]
    fn rejects_invalid_configs() {
        let config = Config::new(
            "http://localhost:8545",
            IndexerRepo::new("postgres://localhost/evm_indexer"),
        )
        .with_blocks_per_batch(0);

        let result = Scheduler::new(config, ChainJsonRpc::new(0));

        assert!(matches!(result, Err(IndexerError::Config(_))));
    }
}
