// SqliteDatabase — rusqlite backend implementing the Database trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Sync.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.
// The lock is never held across an .await on anything else.

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::traits::Database;
use crate::policy::Policy;

pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn load_policy(&self) -> Result<Option<Policy>> {
        let conn = self.conn.lock().await;
        super::queries::get_policy(&conn)
    }

    async fn insert_policy_if_absent(&self, policy: &Policy) -> Result<Policy> {
        let conn = self.conn.lock().await;
        super::queries::insert_policy_if_absent(&conn, policy)?;
        super::queries::get_policy(&conn)?
            .context("Policy row missing immediately after insert")
    }

    async fn compare_and_swap_policy(
        &self,
        expected_version: u64,
        policy: &Policy,
    ) -> Result<bool> {
        let conn = self.conn.lock().await;
        super::queries::compare_and_swap_policy(&conn, expected_version, policy)
    }
}
