use evm_indexer::{IndexerRepo, Repo};
use evm_indexer_tests::db;

#[tokio::main]
async fn main() {
    db::setup();

    let repo = IndexerRepo::new(db::database_url().as_str());
    let pool = repo.get_pool(1).await.unwrap();
    let mut conn = IndexerRepo::get_conn(&pool).await.unwrap();

    IndexerRepo::migrate(&mut conn).await.unwrap();
}
