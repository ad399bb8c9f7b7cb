// Moderation inputs and outputs.
//
// A ContentSubmission is the slice of a content item the engine looks at.
// A ModerationDecision is the audit record the content-creation workflow
// stores verbatim next to the item.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// The fields of a content item that moderation inspects.
///
/// Missing fields deserialize as empty. Tags may arrive either as a JSON
/// array or as a single comma-separated string (the upload form sends the latter).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentSubmission {
    pub title: String,
    pub description: String,
    #[serde(deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
}

impl ContentSubmission {
    /// A submission carrying only a title, as used by dry runs.
    pub fn from_text(text: &str) -> Self {
        Self {
            title: text.to_string(),
            ..Default::default()
        }
    }

    /// Title, description, and tags joined with single spaces.
    pub fn combined_text(&self) -> String {
        format!(
            "{} {} {}",
            self.title,
            self.description,
            self.tags.join(" ")
        )
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagsInput {
    List(Vec<String>),
    Csv(String),
    Missing(()),
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let tags = match TagsInput::deserialize(deserializer)? {
        TagsInput::List(tags) => tags,
        TagsInput::Csv(csv) => csv
            .split(',')
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect(),
        TagsInput::Missing(()) => Vec::new(),
    };
    Ok(tags)
}

/// Outcome of one moderation pass.
///
/// Rejections always carry a reason. Approvals carry one only when a
/// non-default path was taken (educational override, scorer degradation).
/// `confidence` is present only when an external score contributed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationDecision {
    pub approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub reviewed_at: DateTime<Utc>,
}

impl ModerationDecision {
    pub fn approved(reviewed_at: DateTime<Utc>) -> Self {
        Self {
            approved: true,
            reason: None,
            confidence: None,
            reviewed_at,
        }
    }

    pub fn rejected(reason: &str, reviewed_at: DateTime<Utc>) -> Self {
        Self {
            approved: false,
            reason: Some(reason.to_string()),
            confidence: None,
            reviewed_at,
        }
    }

    pub fn with_reason(mut self, reason: &str) -> Self {
        self.reason = Some(reason.to_string());
        self
    }

    pub fn with_confidence(mut self, confidence: Option<f64>) -> Self {
        self.confidence = confidence;
        self
    }

    /// True when two decisions agree on everything except the review time.
    pub fn same_outcome(&self, other: &ModerationDecision) -> bool {
        self.approved == other.approved
            && self.reason == other.reason
            && self.confidence == other.confidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default_to_empty() {
        let submission: ContentSubmission = serde_json::from_str("{}").unwrap();
        assert_eq!(submission, ContentSubmission::default());
    }

    #[test]
    fn test_tags_accept_array() {
        let submission: ContentSubmission =
            serde_json::from_str(r#"{"title":"x","tags":["Rust","async"]}"#).unwrap();
        assert_eq!(submission.tags, vec!["Rust", "async"]);
    }

    #[test]
    fn test_tags_accept_comma_separated_string() {
        let submission: ContentSubmission =
            serde_json::from_str(r#"{"tags":" Math, Algebra ,, "}"#).unwrap();
        assert_eq!(submission.tags, vec!["math", "algebra"]);
    }

    #[test]
    fn test_tags_accept_null() {
        let submission: ContentSubmission = serde_json::from_str(r#"{"tags":null}"#).unwrap();
        assert!(submission.tags.is_empty());
    }

    #[test]
    fn test_combined_text_joins_all_fields() {
        let submission = ContentSubmission {
            title: "Intro".to_string(),
            description: "to algebra".to_string(),
            tags: vec!["math".to_string(), "basics".to_string()],
        };
        assert_eq!(submission.combined_text(), "Intro to algebra math basics");
    }

    #[test]
    fn test_decision_serializes_camel_case_and_skips_absent_fields() {
        let decision = ModerationDecision::approved(Utc::now());
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["approved"], true);
        assert!(json.get("reviewedAt").is_some());
        assert!(json.get("reason").is_none());
        assert!(json.get("confidence").is_none());
    }
}
