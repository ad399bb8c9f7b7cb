// EvaluationHarness — dry runs of the moderation pipeline on literal text.
//
// The text becomes the title of a synthetic submission and goes through the
// same gate real content does. Nothing is created or stored.

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use super::gate::ModerationGate;
use super::models::{ContentSubmission, ModerationDecision};
use crate::error::ModerationError;

pub const TEXT_REQUIRED: &str = "Text is required for testing";

pub struct EvaluationHarness {
    gate: Arc<ModerationGate>,
}

impl EvaluationHarness {
    pub fn new(gate: Arc<ModerationGate>) -> Self {
        Self { gate }
    }

    /// Reject blank text before anything is evaluated.
    pub fn check_text(text: &str) -> Result<(), ModerationError> {
        if text.trim().is_empty() {
            return Err(ModerationError::InvalidInput(TEXT_REQUIRED.to_string()));
        }
        Ok(())
    }

    pub async fn dry_run(&self, text: &str) -> Result<ModerationDecision, ModerationError> {
        Self::check_text(text)?;
        self.gate.evaluate(&ContentSubmission::from_text(text)).await
    }

    /// Dry-run several texts, results in input order.
    pub async fn dry_run_many(
        &self,
        texts: &[String],
        concurrency: usize,
    ) -> Vec<Result<ModerationDecision, ModerationError>> {
        stream::iter(texts.iter().map(|t| self.dry_run(t)))
            .buffered(concurrency.max(1))
            .collect()
            .await
    }
}
