// Auth handlers — POST /api/login and POST /api/logout.
//
// Login: checks EDUGATE_WEB_PASSWORD from the request body in constant time,
// then sets a signed HMAC session cookie that grants the admin routes.
// Logout: clears the session cookie.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::web::auth::{clear_cookie_header, constant_time_eq, create_token, set_cookie_header};
use crate::web::{api_error, AppState};

#[derive(Deserialize)]
pub struct LoginRequest {
    password: String,
}

/// POST /api/login — authenticate with EDUGATE_WEB_PASSWORD.
pub async fn login(State(state): State<AppState>, Json(body): Json<LoginRequest>) -> Response {
    let expected = &state.config.web_password;

    if expected.is_empty() || !constant_time_eq(expected, &body.password) {
        return api_error(StatusCode::UNAUTHORIZED, "Invalid password");
    }

    let token = create_token(&state.config.session_secret);
    // TLS terminates at the proxy, so the server can't tell whether to set Secure.
    let cookie = set_cookie_header(&token, false);

    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({ "message": "Authenticated" })),
    )
        .into_response()
}

/// POST /api/logout — clear the session cookie.
pub async fn logout() -> Response {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, clear_cookie_header())],
        Json(serde_json::json!({ "message": "Logged out" })),
    )
        .into_response()
}
