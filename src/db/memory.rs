// MemoryDatabase — process-local backend implementing the Database trait.
//
// Holds the policy in an RwLock'd slot. Readers clone the whole Policy out
// under the read lock, so they never observe a half-written value.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::traits::Database;
use crate::policy::Policy;

#[derive(Default)]
pub struct MemoryDatabase {
    policy: RwLock<Option<Policy>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn table_count(&self) -> Result<i64> {
        Ok(0)
    }

    async fn load_policy(&self) -> Result<Option<Policy>> {
        Ok(self.policy.read().await.clone())
    }

    async fn insert_policy_if_absent(&self, policy: &Policy) -> Result<Policy> {
        let mut slot = self.policy.write().await;
        Ok(slot.get_or_insert_with(|| policy.clone()).clone())
    }

    async fn compare_and_swap_policy(
        &self,
        expected_version: u64,
        policy: &Policy,
    ) -> Result<bool> {
        let mut slot = self.policy.write().await;
        match slot.as_ref() {
            Some(current) if current.version == expected_version => {
                *slot = Some(policy.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
