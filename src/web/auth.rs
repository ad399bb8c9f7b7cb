// Admin session middleware — stateless HMAC-SHA256 session cookies.
//
// Session token format: {timestamp_secs}.{nonce_hex}.{hmac_hex}
//
// The HMAC covers "{timestamp_secs}.{nonce_hex}" signed with
// EDUGATE_SESSION_SECRET. Tokens are valid for SESSION_TTL_SECS (12 hours).
// Holding a valid token is what "is an administrator" means for the
// settings and dry-run routes.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use super::{AdminSession, AppState};

type HmacSha256 = Hmac<Sha256>;

/// Session cookie name.
pub const COOKIE_NAME: &str = "edugate_session";

/// Session lifetime: 12 hours.
pub const SESSION_TTL_SECS: u64 = 43_200;

/// Build a new session token signed with `secret`.
///
/// Returns the raw cookie value (the token string, not the full Set-Cookie header).
pub fn create_token(secret: &str) -> String {
    let mut nonce_bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut nonce_bytes);
    let payload = format!("{}.{}", now_secs(), hex::encode(nonce_bytes));

    // An HMAC key of any length is accepted, so signing can't fail here.
    let sig = hmac_sign(secret, &payload).unwrap_or_default();
    format!("{payload}.{sig}")
}

/// Verify a session token. Returns `true` if the HMAC is valid and the token
/// is not older than `SESSION_TTL_SECS`.
pub fn verify_token(secret: &str, token: &str) -> bool {
    let mut parts = token.splitn(3, '.');
    let (Some(timestamp_str), Some(nonce), Some(provided_sig)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    let Ok(expected_sig) = hmac_sign(secret, &format!("{timestamp_str}.{nonce}")) else {
        return false;
    };
    if !constant_time_eq(provided_sig, &expected_sig) {
        return false;
    }

    let Ok(timestamp) = timestamp_str.parse::<u64>() else {
        return false;
    };
    now_secs().saturating_sub(timestamp) < SESSION_TTL_SECS
}

/// Axum middleware: reject requests without a valid admin session with 401.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let secret = &state.config.session_secret;

    if secret.is_empty() || !has_valid_session(&request, secret) {
        return super::api_error(StatusCode::UNAUTHORIZED, "Administrator login required");
    }

    request.extensions_mut().insert(AdminSession);
    next.run(request).await
}

/// Build the `Set-Cookie` header value for a new session.
pub fn set_cookie_header(token: &str, secure: bool) -> String {
    let secure_flag = if secure { "; Secure" } else { "" };
    format!(
        "{COOKIE_NAME}={token}; HttpOnly{secure_flag}; SameSite=Strict; Path=/; Max-Age={SESSION_TTL_SECS}"
    )
}

/// Build the `Set-Cookie` header value that clears the session cookie.
pub fn clear_cookie_header() -> String {
    format!("{COOKIE_NAME}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0")
}

/// Constant-time string comparison to prevent timing attacks.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

// --- Private helpers ---

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn hmac_sign(secret: &str, payload: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| anyhow::anyhow!("invalid HMAC key length"))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Extract and validate the session cookie from the request.
fn has_valid_session(request: &Request, session_secret: &str) -> bool {
    let Some(cookie_header) = request
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };

    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| name.trim() == COOKIE_NAME)
        .is_some_and(|(_, value)| verify_token(session_secret, value.trim()))
}
