// Web server — Axum JSON API for moderation settings and evaluation.
//
// Admin routes (settings, dry-run test) sit behind a stateless HMAC session
// cookie. The evaluate route is for the content-creation service and always
// answers with a decision, rejecting when the policy can't be loaded.

use std::sync::Arc;

use anyhow::Result;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::error::ModerationError;
use crate::moderation::ModerationEngine;

pub mod auth;
pub mod handlers;

/// Shared application state threaded through all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ModerationEngine>,
    pub config: Arc<Config>,
}

/// Start the Axum web server and block until it exits.
pub async fn run_server(
    config: Config,
    engine: Arc<ModerationEngine>,
    port: u16,
    bind: &str,
) -> Result<()> {
    let state = AppState {
        engine,
        config: Arc::new(config),
    };

    let app = build_router(state);

    let addr = format!("{bind}:{port}");
    info!("edugate API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    // Administrator routes (require valid session cookie)
    let admin_api = Router::new()
        .route(
            "/api/moderation/settings",
            get(handlers::settings::get_settings).put(handlers::settings::update_settings),
        )
        .route(
            "/api/moderation/test",
            post(handlers::moderation::test_moderation),
        )
        .route("/api/logout", post(handlers::auth::logout))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    // Public routes (no auth)
    let public_api = Router::new()
        .route("/health", get(health))
        .route("/api/login", post(handlers::auth::login))
        .route(
            "/api/moderation/evaluate",
            post(handlers::moderation::evaluate_submission),
        );

    Router::new()
        .merge(admin_api)
        .merge(public_api)
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check — always returns 200 OK.
async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({ "status": "ok" })),
    )
}

/// Typed JSON error response helper.
pub fn api_error(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
}

/// Map an engine error onto an HTTP status.
pub fn moderation_error(err: ModerationError) -> Response {
    match err {
        ModerationError::InvalidPolicy(ref msg) | ModerationError::InvalidInput(ref msg) => {
            api_error(StatusCode::BAD_REQUEST, msg)
        }
        ModerationError::ScorerUnavailable(_) | ModerationError::StoreUnavailable(_) => {
            error!(error = %err, "Moderation backend failure");
            api_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "Moderation settings are temporarily unavailable",
            )
        }
    }
}

/// Marker type indicating the request carries a valid admin session.
/// Inserted into request extensions by `require_admin` middleware.
#[derive(Clone)]
pub struct AdminSession;
