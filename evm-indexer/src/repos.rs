mod postgres_repo;
mod repo;

pub use postgres_repo::{Conn as PostgresRepoConn, Pool as PostgresRepoPool, PostgresRepo};
pub use repo::{Repo, RepoError, RepoMigrations, SQLikeMigrations};
