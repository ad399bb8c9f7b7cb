// Database layer — persistence for the singleton moderation policy.
//
// SQLite (rusqlite, "bundled") is the default backend. PostgreSQL is available
// behind the `postgres` feature, selected when DATABASE_URL is a postgres URL.
// The database file lives wherever EDUGATE_DB_PATH points (defaults to ./edugate.db).

pub mod memory;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod queries;
#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryDatabase;
pub use traits::Database;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::policy::Policy;

/// Serialize a policy into the JSON document stored in the policy row.
pub fn encode_policy(policy: &Policy) -> Result<String> {
    serde_json::to_string(policy).context("Failed to serialize moderation policy")
}

/// Parse a stored policy document. The row's version column is authoritative
/// over whatever the document says, and invariants are re-applied on the way in.
pub fn decode_policy(json: &str, version: i64) -> Result<Policy> {
    let mut policy: Policy =
        serde_json::from_str(json).context("Stored moderation policy is not valid JSON")?;
    policy.version = u64::try_from(version).context("Stored policy version is negative")?;
    Ok(policy.normalized())
}

/// Convert a policy version to the signed integer both SQL backends store.
pub fn version_to_i64(version: u64) -> Result<i64> {
    i64::try_from(version).context("Policy version exceeds i64 range")
}

/// Open (or create) the SQLite database and run migrations.
#[cfg(feature = "sqlite")]
pub fn initialize_sqlite(db_path: &str) -> Result<Arc<dyn Database>> {
    use std::path::Path;

    // Create parent directories if needed
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory for database: {}", db_path))?;
        }
    }

    let conn = rusqlite::Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    // Enable WAL mode for better concurrent read performance
    conn.pragma_update(None, "journal_mode", "WAL")?;

    schema::create_tables(&conn)?;

    Ok(Arc::new(sqlite::SqliteDatabase::new(conn)))
}

/// Open an existing SQLite database (fails if it doesn't exist yet).
#[cfg(feature = "sqlite")]
pub fn open_sqlite(db_path: &str) -> Result<Arc<dyn Database>> {
    use std::path::Path;

    if !Path::new(db_path).exists() {
        anyhow::bail!(
            "Database not found at {}. Run `edugate init` first.",
            db_path
        );
    }

    let conn = rusqlite::Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;

    // Idempotent — picks up tables added since the file was created.
    schema::create_tables(&conn)?;

    Ok(Arc::new(sqlite::SqliteDatabase::new(conn)))
}

/// Connect to PostgreSQL and run migrations.
#[cfg(feature = "postgres")]
pub async fn connect_postgres(database_url: &str) -> Result<Arc<dyn Database>> {
    let db = postgres::PgDatabase::connect(database_url).await?;
    Ok(Arc::new(db))
}

/// A fresh process-local database. Nothing survives the process.
pub fn in_memory() -> Arc<dyn Database> {
    Arc::new(MemoryDatabase::new())
}
