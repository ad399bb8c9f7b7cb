// AdminSettings — read/replace surface over the policy store.
//
// Callers must already have established that the actor is an administrator
// (the web layer's session middleware does this). Nothing here checks it.

use std::sync::Arc;

use crate::error::ModerationError;
use crate::policy::{Policy, PolicyStore, PolicyUpdate};

pub struct AdminSettings {
    store: Arc<PolicyStore>,
}

impl AdminSettings {
    pub fn new(store: Arc<PolicyStore>) -> Self {
        Self { store }
    }

    /// Read-only snapshot of the live policy.
    pub async fn get_policy(&self) -> Result<Policy, ModerationError> {
        self.store.current().await
    }

    /// Apply a partial update on behalf of `actor`, who is recorded as `updatedBy`.
    pub async fn update_policy(
        &self,
        update: &PolicyUpdate,
        actor: &str,
    ) -> Result<Policy, ModerationError> {
        self.store.replace(update, Some(actor)).await
    }
}
