//! Embedded schema migrations, applied at startup.

use sqlx::migrate::MigrateError;
use sqlx::PgPool;

/// Runs all pending migrations from the crate's `migrations/` directory.
/// Safe to call on every startup; already-applied migrations are skipped.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
