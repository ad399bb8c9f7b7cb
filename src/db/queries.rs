// Database queries — policy reads and writes for the SQLite backend.
//
// Every SQL statement the SQLite backend runs lives here, so the rest of the
// app only sees Policy values.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

use super::{decode_policy, encode_policy, version_to_i64};
use crate::policy::Policy;

/// Load the singleton policy row.
pub fn get_policy(conn: &Connection) -> Result<Option<Policy>> {
    let row: Option<(i64, String)> = conn
        .query_row(
            "SELECT version, policy_json FROM moderation_policy WHERE id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match row {
        Some((version, json)) => Ok(Some(decode_policy(&json, version)?)),
        None => Ok(None),
    }
}

/// Insert the policy row if it doesn't exist. Returns true if this call created it.
pub fn insert_policy_if_absent(conn: &Connection, policy: &Policy) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO moderation_policy (id, version, policy_json, updated_at)
         VALUES (1, ?1, ?2, datetime('now'))",
        params![version_to_i64(policy.version)?, encode_policy(policy)?],
    )?;
    Ok(inserted == 1)
}

/// Overwrite the policy row only if it still holds `expected_version`.
/// The check and the write are one statement, so there is no torn state.
pub fn compare_and_swap_policy(
    conn: &Connection,
    expected_version: u64,
    policy: &Policy,
) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE moderation_policy
         SET version = ?1, policy_json = ?2, updated_at = datetime('now')
         WHERE id = 1 AND version = ?3",
        params![
            version_to_i64(policy.version)?,
            encode_policy(policy)?,
            version_to_i64(expected_version)?
        ],
    )?;
    Ok(updated == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_tables;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn
    }

    #[test]
    fn test_get_policy_empty() {
        let conn = test_conn();
        assert!(get_policy(&conn).unwrap().is_none());
    }

    #[test]
    fn test_insert_if_absent_only_once() {
        let conn = test_conn();
        let first = Policy::default();
        assert!(insert_policy_if_absent(&conn, &first).unwrap());

        let second = Policy {
            strict_mode: true,
            ..Default::default()
        };
        assert!(!insert_policy_if_absent(&conn, &second).unwrap());

        let stored = get_policy(&conn).unwrap().unwrap();
        assert!(!stored.strict_mode);
    }

    #[test]
    fn test_compare_and_swap_checks_version() {
        let conn = test_conn();
        let policy = Policy::default();
        insert_policy_if_absent(&conn, &policy).unwrap();

        let next = Policy {
            strict_mode: true,
            version: 2,
            ..policy.clone()
        };
        // Stale expected version: no write
        assert!(!compare_and_swap_policy(&conn, 5, &next).unwrap());
        assert!(!get_policy(&conn).unwrap().unwrap().strict_mode);

        assert!(compare_and_swap_policy(&conn, 1, &next).unwrap());
        let stored = get_policy(&conn).unwrap().unwrap();
        assert!(stored.strict_mode);
        assert_eq!(stored.version, 2);

        // The old version is gone now
        assert!(!compare_and_swap_policy(&conn, 1, &next).unwrap());
    }
}
