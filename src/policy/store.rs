// PolicyStore — owner of the single live moderation policy.
//
// Reads go straight to the backend and return an owned snapshot. Writes are
// serialized in-process by an async mutex and committed with a version
// compare-and-swap, which also catches writers in other processes sharing
// the same database. A CAS miss re-reads and retries a bounded number of times.
//
// No lock is held by readers, and the write lock only covers store I/O, so a
// slow toxicity scorer can never block a policy update or vice versa.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::models::{Policy, PolicyUpdate};
use crate::db::Database;
use crate::error::ModerationError;

/// How many times `replace` re-reads and retries after losing a CAS race.
const MAX_COMMIT_ATTEMPTS: usize = 3;

pub struct PolicyStore {
    db: Arc<dyn Database>,
    write_lock: Mutex<()>,
}

impl PolicyStore {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self {
            db,
            write_lock: Mutex::new(()),
        }
    }

    /// The underlying backend (for status reporting).
    pub fn database(&self) -> &Arc<dyn Database> {
        &self.db
    }

    /// Return a snapshot of the live policy, creating the default one the
    /// first time none exists.
    pub async fn current(&self) -> Result<Policy, ModerationError> {
        if let Some(policy) = self.db.load_policy().await.map_err(ModerationError::store)? {
            return Ok(policy);
        }

        let stored = self
            .db
            .insert_policy_if_absent(&Policy::default())
            .await
            .map_err(ModerationError::store)?;
        info!(version = stored.version, "Created default moderation policy");
        Ok(stored)
    }

    /// Apply a partial update and commit it atomically.
    ///
    /// Invalid input fails before anything is written. On success the
    /// committed snapshot is returned.
    pub async fn replace(
        &self,
        update: &PolicyUpdate,
        actor: Option<&str>,
    ) -> Result<Policy, ModerationError> {
        update.validate()?;

        let _guard = self.write_lock.lock().await;

        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let current = self.current().await?;
            let next = current.apply(update, actor, Utc::now())?;

            let committed = self
                .db
                .compare_and_swap_policy(current.version, &next)
                .await
                .map_err(ModerationError::store)?;

            if committed {
                info!(
                    version = next.version,
                    updated_by = next.updated_by.as_deref().unwrap_or("-"),
                    "Moderation policy updated"
                );
                return Ok(next);
            }

            warn!(
                attempt,
                expected_version = current.version,
                "Policy changed underneath update, retrying"
            );
        }

        Err(ModerationError::StoreUnavailable(format!(
            "policy kept changing concurrently; gave up after {MAX_COMMIT_ATTEMPTS} attempts"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDatabase;

    fn store() -> PolicyStore {
        PolicyStore::new(Arc::new(MemoryDatabase::new()))
    }

    #[tokio::test]
    async fn test_current_creates_default_once() {
        let store = store();
        let first = store.current().await.unwrap();
        let second = store.current().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.version, 1);
    }

    #[tokio::test]
    async fn test_replace_bumps_version_and_timestamp() {
        let store = store();
        let before = store.current().await.unwrap();
        let after = store
            .replace(
                &PolicyUpdate {
                    toxicity_threshold: Some(0.8),
                    ..Default::default()
                },
                Some("admin"),
            )
            .await
            .unwrap();
        assert_eq!(after.version, before.version + 1);
        assert!(after.last_updated >= before.last_updated);
        assert_eq!(after.toxicity_threshold, 0.8);
        assert_eq!(store.current().await.unwrap(), after);
    }

    #[tokio::test]
    async fn test_invalid_update_leaves_policy_unchanged() {
        let store = store();
        let before = store.current().await.unwrap();
        let err = store
            .replace(
                &PolicyUpdate {
                    toxicity_threshold: Some(1.5),
                    enabled: Some(false),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::InvalidPolicy(_)));
        assert_eq!(store.current().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_replace_on_fresh_store_creates_then_updates() {
        let store = store();
        let policy = store
            .replace(
                &PolicyUpdate {
                    strict_mode: Some(true),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();
        assert!(policy.strict_mode);
        assert_eq!(policy.version, 2);
    }
}
