// Database schema — table creation for the SQLite backend.
//
// A `schema_version` table records what has been applied so future changes
// can be added as numbered steps without touching existing databases.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Current schema version written by `create_tables`.
pub const SCHEMA_VERSION: i64 = 1;

/// Create all tables if they don't exist yet.
///
/// This is idempotent — safe to call on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Tracks schema version for future migrations
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- The live moderation policy
        -- Stored as JSON so new policy fields don't need migrations
        CREATE TABLE IF NOT EXISTS moderation_policy (
            id INTEGER PRIMARY KEY CHECK (id = 1),  -- singleton row
            version INTEGER NOT NULL,               -- compare-and-swap token
            policy_json TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )
    .context("Failed to create database tables")?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [SCHEMA_VERSION],
    )?;

    Ok(())
}

/// Count the number of tables in the database (useful for init confirmation).
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tables_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();

        let versions: Vec<i64> = conn
            .prepare("SELECT version FROM schema_version ORDER BY version")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(versions, vec![SCHEMA_VERSION]);
    }

    #[test]
    fn test_table_count() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        // schema_version, moderation_policy
        assert_eq!(table_count(&conn).unwrap(), 2);
    }

    #[test]
    fn test_policy_table_is_singleton() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn.execute(
            "INSERT INTO moderation_policy (id, version, policy_json) VALUES (1, 1, '{}')",
            [],
        )
        .unwrap();
        let second = conn.execute(
            "INSERT INTO moderation_policy (id, version, policy_json) VALUES (2, 1, '{}')",
            [],
        );
        assert!(second.is_err());
    }
}
