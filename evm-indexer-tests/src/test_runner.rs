use std::future::Future;

use evm_indexer::{
    IndexerRepo, IndexerRepoAsyncConnection, IndexerRepoConn, IndexerRepoPool, Repo,
};
use tokio::sync::OnceCell;

use crate::db;

static MIGRATED: OnceCell<()> = OnceCell::const_new();

pub async fn get_pool() -> IndexerRepoPool {
    new_repo().get_pool(1).await.unwrap()
}

/// Runs `test_fn` inside a transaction that is never committed.
///
/// Concurrent tests contend on the single watermark row, so each test should
/// index its own range of block numbers.
pub async fn run_test<'a, TestFn, Fut>(pool: &'a IndexerRepoPool, test_fn: TestFn)
where
    TestFn: Fn(IndexerRepoConn<'a>) -> Fut,
    Fut: Future<Output = ()>,
{
    MIGRATED.get_or_init(migrate).await;

    let mut conn = IndexerRepo::get_conn(pool).await.unwrap();

    conn.begin_test_transaction().await.unwrap();

    test_fn(conn).await;
}

pub fn new_repo() -> IndexerRepo {
    IndexerRepo::new(db::database_url().as_str())
}

async fn migrate() {
    db::setup();

    let pool = get_pool().await;
    let mut conn = IndexerRepo::get_conn(&pool).await.unwrap();

    IndexerRepo::migrate(&mut conn).await.unwrap();
}
