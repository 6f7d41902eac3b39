//! Embedded schema migrations for the user store.
//!
//! Migrations run over a synchronous wrapper around the async connection, so
//! no libpq is needed. Call [`run_pending_migrations`] outside an async
//! runtime, or from `tokio::task::spawn_blocking`.

use diesel::Connection;
use diesel_async::AsyncPgConnection;
use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

use crate::domain::ports::UserStoreError;

/// Migrations compiled into the binary from `backend/migrations`.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Apply every migration not yet recorded in the target database.
///
/// Returns the number of migrations applied.
///
/// # Errors
///
/// Returns [`UserStoreError::Connection`] when the database cannot be reached
/// and [`UserStoreError::Query`] when a migration fails.
pub fn run_pending_migrations(database_url: &str) -> Result<usize, UserStoreError> {
    let mut conn = AsyncConnectionWrapper::<AsyncPgConnection>::establish(database_url)
        .map_err(|err| UserStoreError::connection(err.to_string()))?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| UserStoreError::query(err.to_string()))?;
    for version in &applied {
        info!(%version, "applied migration");
    }
    Ok(applied.len())
}
