// ModerationGate — one moderation pass for a content-creation request.
//
// Fetches the live policy, asks the external scorer for a toxicity score when
// the policy wants one, and runs the evaluator. The scorer call runs under a
// timeout and outside any store lock. If it fails, times out, or no scorer is
// configured, evaluation continues on keyword rules alone and an otherwise
// silent approval records the degradation in its reason.
//
// A missing policy is the opposite case: `evaluate` fails, and
// `evaluate_or_reject` turns that failure into a rejection (fail-closed).
// The gate persists nothing; the caller stores the decision with the content.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::time::Instant;
use tracing::{debug, error, warn};

use super::evaluator;
use super::models::{ContentSubmission, ModerationDecision};
use crate::error::ModerationError;
use crate::output::truncate_chars;
use crate::policy::PolicyStore;
use crate::toxicity::ToxicityScorer;

pub const REASON_SCORER_DEGRADED: &str =
    "external toxicity scorer unavailable; evaluated with keyword rules only";
pub const REASON_POLICY_UNAVAILABLE: &str = "moderation policy unavailable";

/// Default upper bound on a single scorer call.
pub const DEFAULT_SCORER_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ModerationGate {
    store: Arc<PolicyStore>,
    scorer: Option<Arc<dyn ToxicityScorer>>,
    scorer_timeout: Duration,
}

impl ModerationGate {
    /// A gate with no external scorer. Policies that enable external scoring
    /// will evaluate in degraded, keyword-only mode.
    pub fn new(store: Arc<PolicyStore>) -> Self {
        Self {
            store,
            scorer: None,
            scorer_timeout: DEFAULT_SCORER_TIMEOUT,
        }
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn ToxicityScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn with_scorer_timeout(mut self, timeout: Duration) -> Self {
        self.scorer_timeout = timeout;
        self
    }

    /// Evaluate one submission against the live policy.
    pub async fn evaluate(
        &self,
        submission: &ContentSubmission,
    ) -> Result<ModerationDecision, ModerationError> {
        let policy = self.store.current().await?;

        let mut degraded = false;
        let score = if policy.external_scoring_enabled {
            match self.external_score(&submission.combined_text()).await {
                Ok(score) => Some(score),
                Err(e) => {
                    warn!(error = %e, "Falling back to keyword-only moderation");
                    degraded = true;
                    None
                }
            }
        } else {
            None
        };

        let mut decision = evaluator::evaluate(submission, &policy, score);
        if degraded && decision.approved && decision.reason.is_none() {
            decision = decision.with_reason(REASON_SCORER_DEGRADED);
        }

        debug!(
            approved = decision.approved,
            reason = decision.reason.as_deref().unwrap_or("-"),
            confidence = ?decision.confidence,
            policy_version = policy.version,
            title = %truncate_chars(&submission.title, 50),
            "Moderation decision"
        );

        Ok(decision)
    }

    /// Evaluate, turning a policy-store failure into a rejection.
    ///
    /// This is what a content-creation workflow should call when it cannot
    /// surface errors: content is never published because the policy was
    /// unreadable.
    pub async fn evaluate_or_reject(&self, submission: &ContentSubmission) -> ModerationDecision {
        match self.evaluate(submission).await {
            Ok(decision) => decision,
            Err(e) => {
                error!(error = %e, "Moderation failed, rejecting content");
                ModerationDecision::rejected(REASON_POLICY_UNAVAILABLE, chrono::Utc::now())
            }
        }
    }

    /// Evaluate several submissions with at most `concurrency` in flight.
    /// Results come back in input order.
    pub async fn evaluate_batch(
        &self,
        submissions: &[ContentSubmission],
        concurrency: usize,
    ) -> Vec<Result<ModerationDecision, ModerationError>> {
        stream::iter(submissions.iter().map(|s| self.evaluate(s)))
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    async fn external_score(&self, text: &str) -> Result<f64, ModerationError> {
        let scorer = self.scorer.as_ref().ok_or_else(|| {
            ModerationError::ScorerUnavailable("no toxicity scorer configured".to_string())
        })?;

        let deadline = Instant::now() + self.scorer_timeout;
        let score = tokio::time::timeout_at(deadline, scorer.score_text_before(text, deadline))
            .await
            .map_err(|_| {
                ModerationError::ScorerUnavailable(format!(
                    "{} timed out after {:?}",
                    scorer.name(),
                    self.scorer_timeout
                ))
            })?
            .map_err(|e| ModerationError::ScorerUnavailable(format!("{}: {e:#}", scorer.name())))?;

        if !score.is_finite() {
            return Err(ModerationError::ScorerUnavailable(format!(
                "{} returned a non-finite score",
                scorer.name()
            )));
        }

        Ok(score)
    }
}
