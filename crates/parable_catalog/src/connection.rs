//! Connection pool and schema migrations.

use crate::DatabaseResult;
use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use parable_core::StorageConfig;
use parable_error::{DatabaseError, DatabaseErrorKind};
use std::time::Duration;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Pool of SQLite connections to the catalog database.
pub type CatalogPool = Pool<ConnectionManager<SqliteConnection>>;

/// Per-connection pragmas applied whenever the pool opens a connection.
#[derive(Debug, Clone, Copy)]
struct ConnectionOptions {
    busy_timeout: Duration,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL; PRAGMA busy_timeout = {};",
            self.busy_timeout.as_millis()
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Build the connection pool for the configured database file.
///
/// Creates the database's parent directory if needed.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the first
/// connection cannot be established.
#[tracing::instrument(skip(config), fields(database = %config.database.display(), pool_size = config.pool_size))]
pub fn build_pool(config: &StorageConfig) -> DatabaseResult<CatalogPool> {
    if let Some(parent) = config.database.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            DatabaseError::new(DatabaseErrorKind::Connection(format!(
                "{}: {}",
                parent.display(),
                e
            )))
        })?;
    }

    let manager = ConnectionManager::<SqliteConnection>::new(config.database.to_string_lossy());
    let pool = Pool::builder()
        .max_size(config.pool_size.max(1))
        .connection_customizer(Box::new(ConnectionOptions {
            busy_timeout: Duration::from_secs(5),
        }))
        .build(manager)?;

    tracing::debug!("Built catalog connection pool");
    Ok(pool)
}

/// Run pending migrations.
pub fn run_migrations(conn: &mut SqliteConnection) -> DatabaseResult<()> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| DatabaseError::new(DatabaseErrorKind::Migration(e.to_string())))?;

    if !applied.is_empty() {
        tracing::info!(count = applied.len(), "Applied catalog migrations");
    }
    Ok(())
}

/// Fold the write-ahead log back into the main database file.
pub fn checkpoint(conn: &mut SqliteConnection) -> DatabaseResult<()> {
    conn.batch_execute("PRAGMA wal_checkpoint(TRUNCATE);")?;
    Ok(())
}
