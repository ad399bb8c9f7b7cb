// Moderation handlers.
//
// POST /api/moderation/test     — admin dry run of literal text
// POST /api/moderation/evaluate — decision for a content submission; the
//                                 caller stores it with the content and must
//                                 not publish when `approved` is false

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::moderation::ContentSubmission;
use crate::web::{moderation_error, AppState};

#[derive(Deserialize)]
pub struct TestRequest {
    #[serde(default)]
    text: String,
}

/// POST /api/moderation/test — evaluate text against the live policy without
/// creating anything.
pub async fn test_moderation(
    State(state): State<AppState>,
    Json(body): Json<TestRequest>,
) -> Response {
    match state.engine.harness.dry_run(&body.text).await {
        Ok(decision) => {
            Json(serde_json::json!({ "moderationResult": decision })).into_response()
        }
        Err(e) => moderation_error(e),
    }
}

/// POST /api/moderation/evaluate — fail-closed evaluation for content creation.
pub async fn evaluate_submission(
    State(state): State<AppState>,
    Json(submission): Json<ContentSubmission>,
) -> Response {
    let decision = state.engine.gate.evaluate_or_reject(&submission).await;
    Json(decision).into_response()
}
