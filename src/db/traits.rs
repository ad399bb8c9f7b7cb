// Database trait — backend-agnostic async interface for policy persistence.
//
// Implementors: SqliteDatabase (wraps rusqlite), PgDatabase (wraps sqlx),
// MemoryDatabase (process-local, for tests and throwaway runs).
// All methods are async so both sync (rusqlite via Mutex) and native async
// (sqlx) backends fit behind a single interface.
//
// The policy is one document in one row keyed by a fixed id. Writers commit
// with compare-and-swap on the stored version, so a write either lands whole
// or not at all.

use anyhow::Result;
use async_trait::async_trait;

use crate::policy::Policy;

#[async_trait]
pub trait Database: Send + Sync {
    // --- Lifecycle ---

    /// Count the number of user-created tables in the database.
    async fn table_count(&self) -> Result<i64>;

    // --- Moderation policy ---

    /// Load the stored policy, if one has been created yet.
    async fn load_policy(&self) -> Result<Option<Policy>>;

    /// Store `policy` unless a policy already exists, then return whichever
    /// policy is stored. Two racing callers both get the same document back.
    async fn insert_policy_if_absent(&self, policy: &Policy) -> Result<Policy>;

    /// Replace the stored policy only if its version is still
    /// `expected_version`. Returns false when another writer got there first.
    async fn compare_and_swap_policy(&self, expected_version: u64, policy: &Policy)
        -> Result<bool>;
}
