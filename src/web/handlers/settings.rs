// Moderation settings handlers.
//
// GET /api/moderation/settings — current policy
// PUT /api/moderation/settings — partial update; only fields present in the
//                                body change. Bad values are a 400 and the
//                                stored policy is untouched.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::policy::PolicyUpdate;
use crate::web::{moderation_error, AppState};

/// GET /api/moderation/settings
pub async fn get_settings(State(state): State<AppState>) -> Response {
    match state.engine.admin.get_policy().await {
        Ok(policy) => Json(serde_json::json!({ "settings": policy })).into_response(),
        Err(e) => moderation_error(e),
    }
}

/// PUT /api/moderation/settings
///
/// The body is taken as raw JSON so a wrongly-typed field (e.g. a string
/// threshold) comes back as InvalidPolicy rather than a generic extractor error.
pub async fn update_settings(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let update = match PolicyUpdate::from_json(body) {
        Ok(update) => update,
        Err(e) => return moderation_error(e),
    };

    match state
        .engine
        .admin
        .update_policy(&update, &state.config.admin_name)
        .await
    {
        Ok(policy) => Json(serde_json::json!({
            "message": "Moderation settings updated",
            "settings": policy,
        }))
        .into_response(),
        Err(e) => moderation_error(e),
    }
}
