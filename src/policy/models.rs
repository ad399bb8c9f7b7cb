// Policy data model — the singleton configuration behind every decision.
//
// The stored word sets are always the union of the built-in terms and the
// administrator's custom terms. Custom lists are kept separately so an update
// can swap them out without losing the built-ins.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModerationError;

/// Terms that mark content as off-topic for the platform.
pub const BUILTIN_BANNED_WORDS: [&str; 5] = ["memes", "gossip", "funny", "drama", "nonsense"];

/// Terms that mark content as educational.
pub const BUILTIN_EDUCATIONAL_WORDS: [&str; 6] =
    ["learn", "tutorial", "course", "study", "education", "lesson"];

/// Default cutoff for external toxicity scores.
pub const DEFAULT_TOXICITY_THRESHOLD: f64 = 0.5;

/// The live moderation policy.
///
/// Fields missing from a stored document take their default values, so
/// documents written before a field existed still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Policy {
    /// Master switch. When false every submission is approved.
    pub enabled: bool,
    /// Disables the educational override even when it is otherwise allowed.
    pub strict_mode: bool,
    /// External scores at or above this value reject (0.0 to 1.0).
    pub toxicity_threshold: f64,
    pub keyword_moderation_enabled: bool,
    #[serde(alias = "perspectiveApiEnabled")]
    pub external_scoring_enabled: bool,
    pub auto_approve_educational: bool,
    pub custom_banned_words: Vec<String>,
    pub custom_educational_words: Vec<String>,
    /// Built-in plus custom banned terms, lower-cased and deduplicated.
    pub banned_words: BTreeSet<String>,
    /// Built-in plus custom educational terms, lower-cased and deduplicated.
    pub educational_words: BTreeSet<String>,
    /// Bumped by one on every committed update. The first stored policy is 1.
    pub version: u64,
    pub last_updated: DateTime<Utc>,
    pub updated_by: Option<String>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            enabled: true,
            strict_mode: false,
            toxicity_threshold: DEFAULT_TOXICITY_THRESHOLD,
            keyword_moderation_enabled: true,
            external_scoring_enabled: false,
            auto_approve_educational: true,
            custom_banned_words: Vec::new(),
            custom_educational_words: Vec::new(),
            banned_words: normalize_words(BUILTIN_BANNED_WORDS),
            educational_words: normalize_words(BUILTIN_EDUCATIONAL_WORDS),
            version: 1,
            last_updated: Utc::now(),
            updated_by: None,
        }
    }
}

impl Policy {
    /// Re-establish the policy invariants on a value read back from storage.
    ///
    /// Clamps the threshold and rebuilds both word sets from the built-ins
    /// and the custom lists, so a hand-edited document can't smuggle in
    /// upper-case or empty terms.
    pub fn normalized(mut self) -> Self {
        self.toxicity_threshold = if self.toxicity_threshold.is_finite() {
            self.toxicity_threshold.clamp(0.0, 1.0)
        } else {
            DEFAULT_TOXICITY_THRESHOLD
        };
        self.custom_banned_words = normalize_word_list(&self.custom_banned_words);
        self.custom_educational_words = normalize_word_list(&self.custom_educational_words);
        self.banned_words = merged_words(&BUILTIN_BANNED_WORDS, &self.custom_banned_words);
        self.educational_words =
            merged_words(&BUILTIN_EDUCATIONAL_WORDS, &self.custom_educational_words);
        self
    }

    /// Build the next version of this policy from a partial update.
    ///
    /// Only fields present in `update` change. The version is bumped and
    /// `last_updated` set to `now` even when the update is empty.
    pub fn apply(
        &self,
        update: &PolicyUpdate,
        actor: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Policy, ModerationError> {
        update.validate()?;

        let mut next = self.clone();
        if let Some(enabled) = update.enabled {
            next.enabled = enabled;
        }
        if let Some(strict_mode) = update.strict_mode {
            next.strict_mode = strict_mode;
        }
        if let Some(threshold) = update.toxicity_threshold {
            next.toxicity_threshold = threshold;
        }
        if let Some(keyword) = update.keyword_moderation_enabled {
            next.keyword_moderation_enabled = keyword;
        }
        if let Some(external) = update.external_scoring_enabled {
            next.external_scoring_enabled = external;
        }
        if let Some(auto_approve) = update.auto_approve_educational {
            next.auto_approve_educational = auto_approve;
        }
        if let Some(words) = custom_words(
            &update.custom_banned_words,
            &update.banned_words,
            &BUILTIN_BANNED_WORDS,
        ) {
            next.custom_banned_words = words;
        }
        if let Some(words) = custom_words(
            &update.custom_educational_words,
            &update.educational_words,
            &BUILTIN_EDUCATIONAL_WORDS,
        ) {
            next.custom_educational_words = words;
        }

        next.version = self.version + 1;
        next.last_updated = now;
        if let Some(actor) = actor {
            next.updated_by = Some(actor.to_string());
        }

        Ok(next.normalized())
    }
}

/// A partial policy update. `None` means "leave this field alone".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toxicity_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_moderation_enabled: Option<bool>,
    #[serde(
        alias = "perspectiveApiEnabled",
        skip_serializing_if = "Option::is_none"
    )]
    pub external_scoring_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_approve_educational: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_banned_words: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_educational_words: Option<Vec<String>>,
    /// Older clients send the full word list as `bannedWords`. Built-in
    /// terms are dropped from it and the rest become the custom list.
    /// Ignored when `customBannedWords` is also present, so a settings
    /// document read back from the API can be sent unchanged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banned_words: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub educational_words: Option<Vec<String>>,
}

impl PolicyUpdate {
    /// Parse an update from untyped JSON (e.g. an HTTP request body).
    ///
    /// A threshold sent as a string or any other wrong type is an
    /// InvalidPolicy error rather than a silently ignored field.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ModerationError> {
        if !value.is_object() {
            return Err(ModerationError::InvalidPolicy(
                "update must be a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|e| ModerationError::InvalidPolicy(e.to_string()))
    }

    /// Reject values that cannot be stored as-is.
    pub fn validate(&self) -> Result<(), ModerationError> {
        if let Some(threshold) = self.toxicity_threshold {
            if !threshold.is_finite() {
                return Err(ModerationError::InvalidPolicy(
                    "toxicityThreshold must be a finite number".to_string(),
                ));
            }
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ModerationError::InvalidPolicy(format!(
                    "toxicityThreshold must be between 0 and 1, got {threshold}"
                )));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        *self == PolicyUpdate::default()
    }
}

/// Lower-case, trim, and deduplicate a set of terms, dropping empty ones.
pub fn normalize_words<I, S>(words: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    words
        .into_iter()
        .map(|w| w.as_ref().trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Same normalization as `normalize_words`, keeping first-seen order.
fn normalize_word_list(words: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    words
        .iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty() && seen.insert(w.clone()))
        .collect()
}

/// The custom list an update asks for, preferring the explicit custom field
/// over a legacy full list.
fn custom_words(
    custom: &Option<Vec<String>>,
    full: &Option<Vec<String>>,
    builtin: &[&str],
) -> Option<Vec<String>> {
    match (custom, full) {
        (Some(words), _) => Some(words.clone()),
        (None, Some(words)) => Some(
            words
                .iter()
                .filter(|w| !builtin.contains(&w.trim().to_lowercase().as_str()))
                .cloned()
                .collect(),
        ),
        (None, None) => None,
    }
}

fn merged_words(builtin: &[&str], custom: &[String]) -> BTreeSet<String> {
    let mut words = normalize_words(builtin);
    words.extend(normalize_words(custom));
    words
}
