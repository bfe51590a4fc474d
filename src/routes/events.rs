// SPDX-License-Identifier: MIT

//! Organizer event routes, proxied to the backend through the resilient
//! client.

use crate::error::{AppError, Result};
use crate::middleware::SessionUser;
use crate::models::{AppRole, EventPayload, EventResponse};
use crate::services::EnsureProfileOptions;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, put},
    Extension, Json, Router,
};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/events", get(list_events).post(create_event))
        .route("/api/events/{event_id}", put(update_event))
}

fn check_payload(payload: &EventPayload) -> Result<()> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    payload.validate_times().map_err(AppError::BadRequest)?;
    Ok(())
}

/// List the signed-in organizer's events.
async fn list_events(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionUser>,
) -> Result<Json<Vec<EventResponse>>> {
    let events = state.backend.list_events(&session.access_token).await?;
    Ok(Json(events))
}

/// Create an event. Requires the organizer role; the reconciled app user id
/// becomes the event's organizer id.
async fn create_event(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionUser>,
    Json(mut payload): Json<EventPayload>,
) -> Result<Json<EventResponse>> {
    check_payload(&payload)?;

    let reconciliation =
        super::reconcile_session(&state, &session, &EnsureProfileOptions::default()).await?;
    let profile = super::require_role(&reconciliation, AppRole::Organizer)?;

    payload.organizer_id = Some(profile.app_user_id.clone());
    let created = state
        .backend
        .create_event(&session.access_token, &profile.app_user_id, &payload)
        .await?;

    tracing::info!(
        organizer = %profile.app_user_id,
        event = %created.id,
        "Event created"
    );
    Ok(Json(created))
}

/// Update an existing event (organizer only).
async fn update_event(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionUser>,
    Path(event_id): Path<String>,
    Json(payload): Json<EventPayload>,
) -> Result<Json<EventResponse>> {
    check_payload(&payload)?;

    let reconciliation =
        super::reconcile_session(&state, &session, &EnsureProfileOptions::default()).await?;
    super::require_role(&reconciliation, AppRole::Organizer)?;

    let updated = state
        .backend
        .update_event(&session.access_token, &event_id, &payload)
        .await?;
    Ok(Json(updated))
}
