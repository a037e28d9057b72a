use crate::{PostgresRepo, RepoMigrations, SQLikeMigrations};

impl RepoMigrations for PostgresRepo {
    fn create_blocks_migration() -> &'static [&'static str] {
        SQLikeMigrations::create_blocks()
    }

    fn create_transactions_migration() -> &'static [&'static str] {
        SQLikeMigrations::create_transactions()
    }

    fn create_event_logs_migration() -> &'static [&'static str] {
        SQLikeMigrations::create_event_logs()
    }

    fn create_indexer_state_migration() -> &'static [&'static str] {
        SQLikeMigrations::create_indexer_state()
    }
}
