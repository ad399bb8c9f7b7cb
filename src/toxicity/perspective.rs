// Google Perspective API implementation of ToxicityScorer.
//
// Perspective analyzes text for toxicity. It is free but rate-limited to
// about 1 QPS, so every call goes through a RateLimiter first. Only the
// TOXICITY attribute is requested; that summary score is what the policy
// threshold is compared against.
//
// API docs: https://developers.perspectiveapi.com/s/about-the-api-methods

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use super::rate_limiter::RateLimiter;
use super::traits::ToxicityScorer;
use crate::output::truncate_chars;

const PERSPECTIVE_URL: &str = "https://commentanalyzer.googleapis.com/v1alpha1/comments:analyze";

pub struct PerspectiveScorer {
    client: Client,
    api_key: String,
    rate_limiter: RateLimiter,
}

impl PerspectiveScorer {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            // Perspective free tier: 1 query per second
            rate_limiter: RateLimiter::new(1.0),
        }
    }
}

#[async_trait]
impl ToxicityScorer for PerspectiveScorer {
    async fn score_text(&self, text: &str) -> Result<f64> {
        self.rate_limiter.acquire().await;
        self.request_score(text).await
    }

    async fn score_text_before(&self, text: &str, deadline: Instant) -> Result<f64> {
        self.rate_limiter.acquire_before(deadline).await?;
        self.request_score(text).await
    }

    fn name(&self) -> &'static str {
        "perspective"
    }
}

impl PerspectiveScorer {
    async fn request_score(&self, text: &str) -> Result<f64> {
        let request = PerspectiveRequest {
            comment: Comment {
                text: text.to_string(),
            },
            requested_attributes: RequestedAttributes {
                toxicity: AttributeConfig {},
            },
            languages: vec!["en".to_string()],
        };

        let response = self
            .client
            .post(PERSPECTIVE_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .context("Failed to call Perspective API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Perspective API returned {}: {}", status, body);
        }

        let result: PerspectiveResponse = response
            .json()
            .await
            .context("Failed to parse Perspective API response")?;

        let toxicity = extract_toxicity(&result)
            .context("Perspective API response had no TOXICITY score")?;

        debug!(
            toxicity,
            text_preview = %truncate_chars(text, 50),
            "Scored text"
        );

        Ok(toxicity)
    }
}

fn extract_toxicity(response: &PerspectiveResponse) -> Option<f64> {
    response
        .attribute_scores
        .get("TOXICITY")
        .map(|score| score.summary_score.value)
}

// --- Perspective API request/response types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PerspectiveRequest {
    comment: Comment,
    requested_attributes: RequestedAttributes,
    languages: Vec<String>,
}

#[derive(Serialize)]
struct Comment {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct RequestedAttributes {
    toxicity: AttributeConfig,
}

#[derive(Serialize)]
struct AttributeConfig {}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PerspectiveResponse {
    attribute_scores: HashMap<String, AttributeScore>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttributeScore {
    summary_score: SummaryScore,
}

#[derive(Deserialize)]
struct SummaryScore {
    value: f64,
}
