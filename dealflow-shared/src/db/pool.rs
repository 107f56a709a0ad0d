//! Postgres connection pool construction.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Creates a connection pool against `database_url`.
///
/// Connections are verified on checkout; acquiring one times out after
/// 10 seconds rather than blocking a request indefinitely.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .test_before_acquire(true)
        .connect(database_url)
        .await
}
