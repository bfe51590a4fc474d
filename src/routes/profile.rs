// SPDX-License-Identifier: MIT

//! Profile routes: current-user reconciliation and onboarding.

use crate::error::{AppError, Result};
use crate::middleware::SessionUser;
use crate::models::{AppRole, Reconciliation};
use crate::services::EnsureProfileOptions;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/onboarding", post(complete_onboarding))
}

#[derive(Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub reconciliation: Reconciliation,
    pub destination: Option<&'static str>,
}

/// Current user profile, reconciled on every call.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionUser>,
) -> Result<Json<MeResponse>> {
    let reconciliation =
        super::reconcile_session(&state, &session, &EnsureProfileOptions::default()).await?;
    let destination = reconciliation
        .profile
        .as_ref()
        .map(|profile| profile.role.destination());

    Ok(Json(MeResponse {
        reconciliation,
        destination,
    }))
}

#[derive(Deserialize)]
pub struct OnboardingRequest {
    pub role: String,
}

#[derive(Serialize)]
pub struct OnboardingResponse {
    #[serde(flatten)]
    pub reconciliation: Reconciliation,
    pub destination: &'static str,
}

/// Finalize onboarding with the selected role.
///
/// A terminal backend error here propagates as an error response; the
/// client must not be redirected as if onboarding succeeded.
async fn complete_onboarding(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionUser>,
    Json(request): Json<OnboardingRequest>,
) -> Result<Json<OnboardingResponse>> {
    let role = AppRole::parse(&request.role)
        .ok_or_else(|| AppError::BadRequest(format!("unknown role: {}", request.role)))?;
    if !role.onboarding_selectable() {
        return Err(AppError::BadRequest(
            "admin accounts are assigned out-of-band".to_string(),
        ));
    }

    let options = EnsureProfileOptions {
        desired_role: Some(role),
        ..Default::default()
    };
    let reconciliation = super::reconcile_session(&state, &session, &options).await?;

    let destination = reconciliation
        .profile
        .as_ref()
        .map(|profile| profile.role.destination())
        .ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("Onboarding with explicit role yielded no profile"))
        })?;

    tracing::info!(user_id = %session.user_id, role = role.as_str(), "Onboarding completed");
    Ok(Json(OnboardingResponse {
        reconciliation,
        destination,
    }))
}
