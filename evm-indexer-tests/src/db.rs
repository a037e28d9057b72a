//! Test database bootstrapping.
//!
//! `TEST_DATABASE_URL` (read through `.env`) names the database every test
//! connects to. It is created on first use from a connection to the server's
//! default database; the schema itself is migrated by the test runner.

use std::env;

use diesel::pg::PgConnection;
use diesel::prelude::*;
use dotenvy::dotenv;

pub fn setup() {
    let database_url = database_url();

    if PgConnection::establish(&database_url).is_ok() {
        return;
    }

    let (server_url, database_name) = split_database_url(&database_url);
    let mut server_conn = PgConnection::establish(server_url)
        .unwrap_or_else(|error| panic!("cannot reach the test database server: {error}"));

    diesel::sql_query(format!(r#"CREATE DATABASE "{database_name}""#))
        .execute(&mut server_conn)
        .unwrap();
}

pub fn database_url() -> String {
    dotenv().ok();

    env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set, see sample.env")
}

/// `postgres://user@host/name` becomes `("postgres://user@host", "name")`
fn split_database_url(database_url: &str) -> (&str, &str) {
    database_url
        .rsplit_once('/')
        .filter(|(_, database_name)| !database_name.is_empty())
        .expect("TEST_DATABASE_URL must end with a database name")
}
