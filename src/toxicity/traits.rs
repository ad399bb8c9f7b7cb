// Toxicity scorer trait — the swap-ready boundary to an external classifier.
//
// The engine never computes toxicity itself. A scorer hands back one number
// in [0, 1]; the policy's threshold decides what that number means.

use anyhow::Result;
use async_trait::async_trait;
use tokio::time::Instant;

/// Trait for scoring text toxicity. Implementations must be async because
/// providers are remote APIs.
#[async_trait]
pub trait ToxicityScorer: Send + Sync {
    /// Score a single text, from 0.0 (benign) to 1.0 (very toxic).
    async fn score_text(&self, text: &str) -> Result<f64>;

    /// Score a text for a caller that gives up at `deadline`.
    ///
    /// Rate-limited providers override this to fail fast rather than queue
    /// for a slot the caller will never use. The caller still enforces the
    /// deadline itself.
    async fn score_text_before(&self, text: &str, _deadline: Instant) -> Result<f64> {
        self.score_text(text).await
    }

    /// Provider name for logs and status output.
    fn name(&self) -> &'static str;
}
