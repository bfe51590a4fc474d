// SPDX-License-Identifier: MIT

//! HTTP route handlers.

pub mod auth;
pub mod events;
pub mod profile;
pub mod tickets;

use crate::error::{AppError, Result};
use crate::middleware::session::require_session;
use crate::middleware::SessionUser;
use crate::models::{AppProfile, AppRole, Reconciliation};
use crate::services::EnsureProfileOptions;
use crate::AppState;
use axum::http::{header, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// Fetch the identity for the current session and run a reconciliation pass.
pub(crate) async fn reconcile_session(
    state: &AppState,
    session: &SessionUser,
    options: &EnsureProfileOptions,
) -> Result<Reconciliation> {
    let identity = state.identity.get_user(&session.access_token).await?;
    state
        .reconciler
        .ensure_profile(&identity, &session.access_token, options)
        .await
}

/// Require a reconciled profile with the given role; 403 otherwise.
pub(crate) fn require_role(
    reconciliation: &Reconciliation,
    role: AppRole,
) -> Result<AppProfile> {
    let profile = reconciliation
        .profile
        .as_ref()
        .ok_or_else(|| AppError::Forbidden("onboarding required".to_string()))?;
    if profile.role != role {
        return Err(AppError::Forbidden(format!(
            "{} role required",
            role.as_str()
        )));
    }
    Ok(profile.clone())
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer - allow requests from the frontend URL and localhost (dev)
    let frontend_url = state.config.frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str == frontend_url
                    || origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
            },
        ))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    // Public routes (no session required)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .merge(auth::routes());

    // Session-protected routes
    let protected_routes = profile::routes()
        .merge(events::routes())
        .merge(tickets::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
