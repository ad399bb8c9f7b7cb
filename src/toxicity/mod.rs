// Toxicity scoring — the external signal the moderation gate may consult.
//
// The ToxicityScorer trait is the boundary. PerspectiveScorer implements it
// against Google's Perspective API. The gate treats any scorer failure as
// "no score" and falls back to keyword rules.

pub mod perspective;
pub mod rate_limiter;
pub mod traits;

pub use traits::ToxicityScorer;
