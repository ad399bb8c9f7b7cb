// Decision procedure — maps a submission, a policy, and an optional external
// toxicity score to a ModerationDecision.
//
// No I/O and no hidden state. Steps run in a fixed order and the first one
// that decides wins:
//
//   1. policy disabled            -> approve
//   2. keyword rules (if enabled) -> reject, or approve via educational override
//   3. external score (if enabled and supplied) -> reject at or above threshold
//   4. otherwise                  -> approve, carrying any score as confidence
//
// Keyword matching is plain substring search on the lower-cased text, so
// "funny" also matches inside "unfunny". That broad coverage is kept on purpose.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::models::{ContentSubmission, ModerationDecision};
use crate::policy::Policy;

pub const REASON_NON_EDUCATIONAL: &str = "non-educational content detected";
pub const REASON_EDUCATIONAL_OVERRIDE: &str = "approved via educational override";
pub const REASON_OVERRIDE_DISABLED: &str =
    "banned content detected; educational override disabled";
pub const REASON_TOXICITY: &str = "toxicity score above threshold";

/// Which policy terms appeared in a piece of text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeywordMatches {
    pub banned: Vec<String>,
    pub educational: Vec<String>,
}

impl KeywordMatches {
    pub fn has_banned(&self) -> bool {
        !self.banned.is_empty()
    }

    pub fn has_educational(&self) -> bool {
        !self.educational.is_empty()
    }
}

/// Find every banned and educational term that occurs in `text`.
/// `text` must already be lower-cased.
pub fn match_keywords(text: &str, policy: &Policy) -> KeywordMatches {
    let find = |words: &std::collections::BTreeSet<String>| -> Vec<String> {
        words
            .iter()
            .filter(|w| text.contains(w.as_str()))
            .cloned()
            .collect()
    };
    KeywordMatches {
        banned: find(&policy.banned_words),
        educational: find(&policy.educational_words),
    }
}

/// Evaluate a submission, stamping the decision with the current time.
pub fn evaluate(
    submission: &ContentSubmission,
    policy: &Policy,
    toxicity_score: Option<f64>,
) -> ModerationDecision {
    evaluate_at(submission, policy, toxicity_score, Utc::now())
}

/// Evaluate a submission with an explicit review timestamp.
pub fn evaluate_at(
    submission: &ContentSubmission,
    policy: &Policy,
    toxicity_score: Option<f64>,
    reviewed_at: DateTime<Utc>,
) -> ModerationDecision {
    if !policy.enabled {
        return ModerationDecision::approved(reviewed_at);
    }

    let text = submission.combined_text().to_lowercase();

    if policy.keyword_moderation_enabled {
        let matches = match_keywords(&text, policy);
        if matches.has_banned() {
            debug!(
                banned = ?matches.banned,
                educational = ?matches.educational,
                "Keyword rules matched"
            );
            if !matches.has_educational() {
                return ModerationDecision::rejected(REASON_NON_EDUCATIONAL, reviewed_at);
            }
            // Strict mode always wins over the educational override
            if policy.auto_approve_educational && !policy.strict_mode {
                return ModerationDecision::approved(reviewed_at)
                    .with_reason(REASON_EDUCATIONAL_OVERRIDE);
            }
            return ModerationDecision::rejected(REASON_OVERRIDE_DISABLED, reviewed_at);
        }
    }

    let mut confidence = None;
    if policy.external_scoring_enabled {
        // Non-finite scores carry no information; treat them as absent.
        if let Some(score) = toxicity_score.filter(|s| s.is_finite()) {
            let score = score.clamp(0.0, 1.0);
            if score >= policy.toxicity_threshold {
                return ModerationDecision::rejected(REASON_TOXICITY, reviewed_at)
                    .with_confidence(Some(score));
            }
            confidence = Some(score);
        }
    }

    ModerationDecision::approved(reviewed_at).with_confidence(confidence)
}
