mod migrations;
mod rows;

use std::fmt::Debug;

use chrono::Utc;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::{
    sql_query, upsert::excluded, ExpressionMethods, OptionalExtension, QueryDsl,
    SelectableHelper,
};
use diesel_async::pooled_connection::{AsyncDieselConnectionManager, PoolError};
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection, AsyncPgConnection, RunQueryDsl};
use futures_core::future::BoxFuture;
use futures_util::FutureExt;

use super::repo::{ensure_records_belong_to_block, Repo, RepoError, RepoMigrations};
use crate::{Block, EventLog, IndexerState, Transaction};
use rows::{BlockRow, EventLogRow, IndexerStateRow, TransactionRow};

pub type Conn<'a> = bb8::PooledConnection<'a, AsyncDieselConnectionManager<AsyncPgConnection>>;
pub type Pool = bb8::Pool<AsyncDieselConnectionManager<AsyncPgConnection>>;

/// Rows per INSERT statement, kept well under Postgres' bind parameter limit
const MAX_ROWS_PER_INSERT: usize = 1_000;

const INDEXER_STATE_ID: i32 = 1;

impl From<DieselError> for RepoError {
    fn from(value: DieselError) -> Self {
        match value {
            DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, info) => {
                RepoError::NotConnected(info.message().to_string())
            }
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)
            | DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info)
            | DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, info)
            | DieselError::DatabaseError(DatabaseErrorKind::NotNullViolation, info) => {
                RepoError::InvalidRecord(info.message().to_string())
            }
            any_other_error => RepoError::Unknown(any_other_error.to_string()),
        }
    }
}

impl From<PoolError> for RepoError {
    fn from(value: PoolError) -> Self {
        RepoError::NotConnected(value.to_string())
    }
}

impl From<bb8::RunError<PoolError>> for RepoError {
    fn from(value: bb8::RunError<PoolError>) -> Self {
        RepoError::NotConnected(value.to_string())
    }
}

#[derive(Clone)]
pub struct PostgresRepo {
    url: String,
}

impl PostgresRepo {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }
}

impl Debug for PostgresRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresRepo").field("url", &"***").finish()
    }
}

#[async_trait::async_trait]
impl Repo for PostgresRepo {
    type Pool = Pool;
    type Conn<'a> = Conn<'a>;

    async fn get_pool(&self, max_size: u32) -> Result<Pool, RepoError> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&self.url);

        let pool = bb8::Pool::builder().max_size(max_size).build(manager).await?;

        Ok(pool)
    }

    async fn get_conn<'a>(pool: &'a Pool) -> Result<Conn<'a>, RepoError> {
        let conn = pool.get().await?;

        Ok(conn)
    }

    async fn run_in_transaction<'a, F>(conn: &mut Conn<'a>, repo_ops: F) -> Result<(), RepoError>
    where
        F: for<'b> FnOnce(&'b mut Conn<'a>) -> BoxFuture<'b, Result<(), RepoError>>
            + Send
            + Sync
            + 'a,
    {
        conn.transaction::<(), RepoError, _>(|transaction_conn| {
            async move { (repo_ops)(transaction_conn).await }.scope_boxed()
        })
        .await
    }

    async fn migrate<'a>(conn: &mut Conn<'a>) -> Result<(), RepoError> {
        for migration in Self::get_internal_migrations() {
            sql_query(migration).execute(conn).await?;
        }

        Ok(())
    }

    async fn commit_block<'a>(
        conn: &mut Conn<'a>,
        block: &Block,
        transactions: &[Transaction],
        event_logs: &[EventLog],
    ) -> Result<(), RepoError> {
        ensure_records_belong_to_block(block, transactions, event_logs)?;

        let block_number = block.number;
        let block_row = BlockRow::from(block);
        let transaction_rows: Vec<_> = transactions.iter().map(TransactionRow::from).collect();
        let event_log_rows: Vec<_> = event_logs.iter().map(EventLogRow::from).collect();

        Self::run_in_transaction(conn, move |conn| {
            async move {
                Self::upsert_block(conn, &block_row).await?;
                Self::upsert_transactions(conn, &transaction_rows).await?;
                Self::create_event_logs(conn, &event_log_rows).await?;
                Self::update_last_indexed_block(conn, block_number).await
            }
            .boxed()
        })
        .await
    }

    async fn get_last_indexed_block<'a>(conn: &mut Conn<'a>) -> Result<u64, RepoError> {
        let last_indexed_block = Self::get_indexer_state(conn)
            .await?
            .map(|state| state.last_indexed_block)
            .unwrap_or(IndexerState::INITIAL_BLOCK_NUMBER);

        Ok(last_indexed_block)
    }

    async fn get_indexer_state<'a>(conn: &mut Conn<'a>) -> Result<Option<IndexerState>, RepoError> {
        use crate::diesel::schema::indexer_state;

        let row = indexer_state::table
            .filter(indexer_state::id.eq(INDEXER_STATE_ID))
            .select(IndexerStateRow::as_select())
            .first::<IndexerStateRow>(conn)
            .await
            .optional()?;

        row.map(IndexerState::try_from).transpose()
    }

    async fn get_block_by_number<'a>(
        conn: &mut Conn<'a>,
        block_number: u64,
    ) -> Result<Option<Block>, RepoError> {
        use crate::diesel::schema::blocks;

        let row = blocks::table
            .filter(blocks::number.eq(to_i64(block_number)?))
            .select(BlockRow::as_select())
            .first::<BlockRow>(conn)
            .await
            .optional()?;

        row.map(Block::try_from).transpose()
    }

    async fn get_transactions_by_block_number<'a>(
        conn: &mut Conn<'a>,
        block_number: u64,
    ) -> Result<Vec<Transaction>, RepoError> {
        use crate::diesel::schema::transactions;

        let rows = transactions::table
            .filter(transactions::block_number.eq(to_i64(block_number)?))
            .order(transactions::transaction_index.asc())
            .select(TransactionRow::as_select())
            .load::<TransactionRow>(conn)
            .await?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn get_event_logs_by_block_number<'a>(
        conn: &mut Conn<'a>,
        block_number: u64,
    ) -> Result<Vec<EventLog>, RepoError> {
        use crate::diesel::schema::event_logs;

        let rows = event_logs::table
            .filter(event_logs::block_number.eq(to_i64(block_number)?))
            .order(event_logs::log_index.asc())
            .select(EventLogRow::as_select())
            .load::<EventLogRow>(conn)
            .await?;

        rows.into_iter().map(EventLog::try_from).collect()
    }
}

impl PostgresRepo {
    async fn upsert_block<'a>(conn: &mut Conn<'a>, block_row: &BlockRow) -> Result<(), RepoError> {
        use crate::diesel::schema::blocks;

        diesel::insert_into(blocks::table)
            .values(block_row)
            .on_conflict(blocks::number)
            .do_update()
            .set((
                blocks::hash.eq(excluded(blocks::hash)),
                blocks::parent_hash.eq(excluded(blocks::parent_hash)),
                blocks::timestamp.eq(excluded(blocks::timestamp)),
                blocks::gas_limit.eq(excluded(blocks::gas_limit)),
                blocks::gas_used.eq(excluded(blocks::gas_used)),
                blocks::miner.eq(excluded(blocks::miner)),
                blocks::difficulty.eq(excluded(blocks::difficulty)),
                blocks::total_difficulty.eq(excluded(blocks::total_difficulty)),
                blocks::size.eq(excluded(blocks::size)),
                blocks::extra_data.eq(excluded(blocks::extra_data)),
                blocks::base_fee_per_gas.eq(excluded(blocks::base_fee_per_gas)),
                blocks::updated_at.eq(Utc::now()),
            ))
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Only receipt-derived fields change when a transaction is seen again
    async fn upsert_transactions<'a>(
        conn: &mut Conn<'a>,
        transaction_rows: &[TransactionRow],
    ) -> Result<(), RepoError> {
        use crate::diesel::schema::transactions;

        for chunk in transaction_rows.chunks(MAX_ROWS_PER_INSERT) {
            diesel::insert_into(transactions::table)
                .values(chunk)
                .on_conflict(transactions::hash)
                .do_update()
                .set((
                    transactions::gas_used.eq(excluded(transactions::gas_used)),
                    transactions::status.eq(excluded(transactions::status)),
                    transactions::updated_at.eq(Utc::now()),
                ))
                .execute(conn)
                .await?;
        }

        Ok(())
    }

    async fn create_event_logs<'a>(
        conn: &mut Conn<'a>,
        event_log_rows: &[EventLogRow],
    ) -> Result<(), RepoError> {
        use crate::diesel::schema::event_logs;

        for chunk in event_log_rows.chunks(MAX_ROWS_PER_INSERT) {
            diesel::insert_into(event_logs::table)
                .values(chunk)
                .on_conflict((event_logs::transaction_hash, event_logs::log_index))
                .do_nothing()
                .execute(conn)
                .await?;
        }

        Ok(())
    }

    async fn update_last_indexed_block<'a>(
        conn: &mut Conn<'a>,
        block_number: u64,
    ) -> Result<(), RepoError> {
        use crate::diesel::schema::indexer_state;

        let block_number = to_i64(block_number)?;

        diesel::insert_into(indexer_state::table)
            .values((
                indexer_state::id.eq(INDEXER_STATE_ID),
                indexer_state::last_indexed_block.eq(block_number),
                indexer_state::last_updated.eq(Utc::now()),
            ))
            .on_conflict(indexer_state::id)
            .do_update()
            .set((
                indexer_state::last_indexed_block.eq(block_number),
                indexer_state::last_updated.eq(Utc::now()),
            ))
            .execute(conn)
            .await?;

        Ok(())
    }
}

fn to_i64(block_number: u64) -> Result<i64, RepoError> {
    i64::try_from(block_number)
        .map_err(|_| RepoError::InvalidRecord(format!("block number {block_number} out of range")))
}
