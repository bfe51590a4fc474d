// SPDX-License-Identifier: MIT

//! Ticket routes: QR code retrieval for attendees and door validation for
//! staff.

use crate::error::{AppError, Result};
use crate::middleware::SessionUser;
use crate::models::AppRole;
use crate::services::EnsureProfileOptions;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/ticket-validations", post(validate_ticket))
        .route("/api/tickets/{ticket_id}/qr-code", get(get_ticket_qr))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateTicketRequest {
    pub ticket_id: String,
    pub event_id: String,
}

/// Validate a scanned ticket. Staff only.
async fn validate_ticket(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionUser>,
    Json(request): Json<ValidateTicketRequest>,
) -> Result<Json<serde_json::Value>> {
    if request.ticket_id.is_empty() || request.event_id.is_empty() {
        return Err(AppError::BadRequest(
            "ticketId and eventId are required".to_string(),
        ));
    }

    let reconciliation =
        super::reconcile_session(&state, &session, &EnsureProfileOptions::default()).await?;
    let profile = super::require_role(&reconciliation, AppRole::Staff)?;

    let result = state
        .backend
        .validate_ticket(
            &session.access_token,
            &profile.app_user_id,
            &request.event_id,
            &request.ticket_id,
        )
        .await?;

    tracing::info!(
        staff = %profile.app_user_id,
        event = %request.event_id,
        "Ticket validated"
    );
    Ok(Json(result))
}

/// Fetch the QR code payload for one of the caller's tickets.
async fn get_ticket_qr(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionUser>,
    Path(ticket_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let reconciliation =
        super::reconcile_session(&state, &session, &EnsureProfileOptions::default()).await?;
    let profile = reconciliation
        .profile
        .ok_or_else(|| AppError::Forbidden("onboarding required".to_string()))?;

    let qr = state
        .backend
        .get_ticket_qr(&session.access_token, &profile.app_user_id, &ticket_id)
        .await?;
    Ok(Json(qr))
}
