#[cfg(test)]
mod commit_block {
    use evm_indexer::{IndexerRepo, Repo, RepoError, U256};

    use crate::{factory, test_runner};

    #[tokio::test]
    pub async fn commits_block_records_and_advances_the_watermark() {
        let pool = test_runner::get_pool().await;

        test_runner::run_test(&pool, |mut conn| async move {
            let (block, transactions, event_logs) = factory::block_with_records(1_000_001, 2);

            IndexerRepo::commit_block(&mut conn, &block, &transactions, &event_logs)
                .await
                .unwrap();

            assert_eq!(
                IndexerRepo::get_last_indexed_block(&mut conn).await,
                Ok(1_000_001)
            );
            assert_eq!(
                IndexerRepo::get_block_by_number(&mut conn, 1_000_001).await,
                Ok(Some(block))
            );
            assert_eq!(
                IndexerRepo::get_transactions_by_block_number(&mut conn, 1_000_001).await,
                Ok(transactions)
            );
            assert_eq!(
                IndexerRepo::get_event_logs_by_block_number(&mut conn, 1_000_001).await,
                Ok(event_logs)
            );
        })
        .await;
    }

    #[tokio::test]
    pub async fn advances_the_watermark_with_every_commit() {
        let pool = test_runner::get_pool().await;

        test_runner::run_test(&pool, |mut conn| async move {
            for block_number in 1_000_010..=1_000_012 {
                let (block, transactions, event_logs) = factory::block_with_records(block_number, 1);

                IndexerRepo::commit_block(&mut conn, &block, &transactions, &event_logs)
                    .await
                    .unwrap();

                assert_eq!(
                    IndexerRepo::get_last_indexed_block(&mut conn).await,
                    Ok(block_number)
                );
            }

            let indexer_state = IndexerRepo::get_indexer_state(&mut conn).await.unwrap().unwrap();
            assert_eq!(indexer_state.last_indexed_block, 1_000_012);
        })
        .await;
    }

    #[tokio::test]
    pub async fn reprocessing_a_block_updates_rows_in_place() {
        let pool = test_runner::get_pool().await;

        test_runner::run_test(&pool, |mut conn| async move {
            let (block, mut transactions, event_logs) = factory::block_with_records(1_000_020, 2);

            IndexerRepo::commit_block(&mut conn, &block, &transactions, &event_logs)
                .await
                .unwrap();

            transactions[0].gas_used = Some(U256::from(50_000u64));
            transactions[0].status = Some(0);

            IndexerRepo::commit_block(&mut conn, &block, &transactions, &event_logs)
                .await
                .unwrap();

            assert_eq!(
                IndexerRepo::get_transactions_by_block_number(&mut conn, 1_000_020).await,
                Ok(transactions)
            );
            assert_eq!(
                IndexerRepo::get_event_logs_by_block_number(&mut conn, 1_000_020).await,
                Ok(event_logs)
            );
            assert_eq!(
                IndexerRepo::get_last_indexed_block(&mut conn).await,
                Ok(1_000_020)
            );
        })
        .await;
    }

    #[tokio::test]
    pub async fn reprocessing_a_block_overwrites_its_header() {
        let pool = test_runner::get_pool().await;

        test_runner::run_test(&pool, |mut conn| async move {
            let (mut block, _, _) = factory::block_with_records(1_000_030, 0);

            IndexerRepo::commit_block(&mut conn, &block, &[], &[]).await.unwrap();

            block.gas_used = U256::from(1u64);
            block.extra_data = None;
            IndexerRepo::commit_block(&mut conn, &block, &[], &[]).await.unwrap();

            assert_eq!(
                IndexerRepo::get_block_by_number(&mut conn, 1_000_030).await,
                Ok(Some(block))
            );
        })
        .await;
    }

    #[tokio::test]
    pub async fn writes_nothing_when_any_step_fails() {
        let pool = test_runner::get_pool().await;

        test_runner::run_test(&pool, |mut conn| async move {
            let watermark = IndexerRepo::get_last_indexed_block(&mut conn).await.unwrap();
            let (block, transactions, _) = factory::block_with_records(1_000_040, 1);
            // The same row cannot be upserted twice by one statement
            let duplicated_transactions = vec![transactions[0].clone(), transactions[0].clone()];

            let result =
                IndexerRepo::commit_block(&mut conn, &block, &duplicated_transactions, &[]).await;

            assert!(result.is_err());
            assert_eq!(
                IndexerRepo::get_block_by_number(&mut conn, 1_000_040).await,
                Ok(None)
            );
            assert_eq!(
                IndexerRepo::get_transactions_by_block_number(&mut conn, 1_000_040).await,
                Ok(vec![])
            );
            assert_eq!(
                IndexerRepo::get_last_indexed_block(&mut conn).await,
                Ok(watermark)
            );
        })
        .await;
    }

    #[tokio::test]
    pub async fn rejects_records_of_other_blocks() {
        let pool = test_runner::get_pool().await;

        test_runner::run_test(&pool, |mut conn| async move {
            let (block, _, _) = factory::block_with_records(1_000_050, 0);
            let (_, other_transactions, _) = factory::block_with_records(1_000_051, 1);

            let result =
                IndexerRepo::commit_block(&mut conn, &block, &other_transactions, &[]).await;

            assert!(matches!(result, Err(RepoError::InvalidRecord(_))));
            assert_eq!(
                IndexerRepo::get_block_by_number(&mut conn, 1_000_050).await,
                Ok(None)
            );
        })
        .await;
    }

    #[tokio::test]
    pub async fn keeps_full_256_bit_precision() {
        let pool = test_runner::get_pool().await;

        test_runner::run_test(&pool, |mut conn| async move {
            let (mut block, mut transactions, _) = factory::block_with_records(1_000_060, 1);
            block.total_difficulty = Some(U256::MAX);
            transactions[0].value = U256::MAX;
            transactions[0].nonce = U256::MAX - U256::one();

            IndexerRepo::commit_block(&mut conn, &block, &transactions, &[]).await.unwrap();

            let stored_block =
                IndexerRepo::get_block_by_number(&mut conn, 1_000_060).await.unwrap().unwrap();
            let stored_transactions =
                IndexerRepo::get_transactions_by_block_number(&mut conn, 1_000_060)
                    .await
                    .unwrap();

            assert_eq!(stored_block.total_difficulty, Some(U256::MAX));
            assert_eq!(stored_transactions[0].value, U256::MAX);
            assert_eq!(stored_transactions[0].nonce, U256::MAX - U256::one());
        })
        .await;
    }
}

#[cfg(test)]
mod lookups {
    use evm_indexer::{IndexerRepo, Repo};

    use crate::test_runner;

    #[tokio::test]
    pub async fn returns_nothing_for_unknown_blocks() {
        let pool = test_runner::get_pool().await;

        test_runner::run_test(&pool, |mut conn| async move {
            assert_eq!(
                IndexerRepo::get_block_by_number(&mut conn, 999_999_999).await,
                Ok(None)
            );
            assert_eq!(
                IndexerRepo::get_transactions_by_block_number(&mut conn, 999_999_999).await,
                Ok(vec![])
            );
            assert_eq!(
                IndexerRepo::get_event_logs_by_block_number(&mut conn, 999_999_999).await,
                Ok(vec![])
            );
        })
        .await;
    }

    #[tokio::test]
    pub async fn migrations_can_be_rerun() {
        let pool = test_runner::get_pool().await;

        test_runner::run_test(&pool, |mut conn| async move {
            assert_eq!(IndexerRepo::migrate(&mut conn).await, Ok(()));
            assert!(IndexerRepo::get_indexer_state(&mut conn).await.unwrap().is_some());
        })
        .await;
    }
}
