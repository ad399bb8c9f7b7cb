// Error taxonomy for the moderation engine.
//
// The database layer and the scorer boundary speak anyhow. Everything that
// crosses into the policy store, the gate, or the admin surface is mapped
// into ModerationError so callers can tell a bad update apart from a dead store.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModerationError {
    /// Malformed policy update. The stored policy is left unchanged.
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    /// A request the engine cannot act on, such as a blank dry-run text.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The external toxicity scorer failed or timed out.
    /// The gate recovers from this locally; it never fails an evaluation.
    #[error("Toxicity scorer unavailable: {0}")]
    ScorerUnavailable(String),

    /// The policy backend could not be read or written.
    #[error("Policy store unavailable: {0}")]
    StoreUnavailable(String),
}

impl ModerationError {
    /// Wrap a backend failure, keeping the full context chain in the message.
    pub fn store(err: anyhow::Error) -> Self {
        ModerationError::StoreUnavailable(format!("{err:#}"))
    }
}
