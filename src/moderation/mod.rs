// Moderation pipeline — evaluator, gate, admin surface, and dry-run harness.
//
// ModerationEngine wires the pieces around one shared PolicyStore so the CLI
// and the web server build them the same way.

pub mod admin;
pub mod evaluator;
pub mod gate;
pub mod harness;
pub mod models;

pub use admin::AdminSettings;
pub use gate::ModerationGate;
pub use harness::EvaluationHarness;
pub use models::{ContentSubmission, ModerationDecision};

use std::sync::Arc;
use std::time::Duration;

use crate::db::Database;
use crate::policy::PolicyStore;
use crate::toxicity::ToxicityScorer;

pub struct ModerationEngine {
    pub store: Arc<PolicyStore>,
    pub gate: Arc<ModerationGate>,
    pub admin: AdminSettings,
    pub harness: EvaluationHarness,
}

impl ModerationEngine {
    pub fn new(
        db: Arc<dyn Database>,
        scorer: Option<Arc<dyn ToxicityScorer>>,
        scorer_timeout: Duration,
    ) -> Self {
        let store = Arc::new(PolicyStore::new(db));

        let mut gate = ModerationGate::new(store.clone()).with_scorer_timeout(scorer_timeout);
        if let Some(scorer) = scorer {
            gate = gate.with_scorer(scorer);
        }
        let gate = Arc::new(gate);

        Self {
            admin: AdminSettings::new(store.clone()),
            harness: EvaluationHarness::new(gate.clone()),
            store,
            gate,
        }
    }
}
