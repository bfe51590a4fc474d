// SPDX-License-Identifier: MIT

//! Authentication routes: password sign-in/sign-up proxied to the identity
//! provider, with the resulting session held in a signed httpOnly cookie.

use crate::config::SESSION_COOKIE;
use crate::error::{AppError, Result};
use crate::middleware::session::create_session_jwt;
use crate::middleware::SessionUser;
use crate::models::{AppRole, Reconciliation};
use crate::services::EnsureProfileOptions;
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/logout", post(logout))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Role picked on the sign-up form. Admin is never accepted here.
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub user_id: String,
    #[serde(flatten)]
    pub reconciliation: Reconciliation,
    /// Dashboard path for the resolved role, if any.
    pub destination: Option<&'static str>,
}

fn session_cookie(value: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::days(7))
        .build()
}

/// Reconcile right after authentication so the response can tell the client
/// where to land (dashboard or onboarding).
async fn reconcile_after_auth(
    state: &AppState,
    user_id: String,
    access_token: &str,
    desired_role: Option<AppRole>,
) -> Result<AuthResponse> {
    let session = SessionUser {
        user_id: user_id.clone(),
        access_token: access_token.to_string(),
    };
    let options = EnsureProfileOptions {
        desired_role,
        ..Default::default()
    };
    let reconciliation = super::reconcile_session(state, &session, &options).await?;
    let destination = reconciliation
        .profile
        .as_ref()
        .map(|profile| profile.role.destination());

    Ok(AuthResponse {
        user_id,
        reconciliation,
        destination,
    })
}

/// Sign in with the identity provider. Provider failures are relayed with
/// their original status and body.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    let provider_session = state
        .identity
        .password_sign_in(&request.email, &request.password)
        .await?;

    let jwt = create_session_jwt(
        &provider_session.user_id,
        &provider_session.access_token,
        &state.config.session_signing_key,
    )?;

    let response = reconcile_after_auth(
        &state,
        provider_session.user_id,
        &provider_session.access_token,
        None,
    )
    .await?;

    tracing::info!(user_id = %response.user_id, "User signed in");
    Ok((jar.add(session_cookie(jwt)), Json(response)))
}

/// Sign up with the identity provider and run first-time reconciliation for
/// the requested role.
async fn signup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<SignupRequest>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    let desired_role = match request.role.as_deref() {
        None => None,
        Some(raw) => {
            let role = AppRole::parse(raw)
                .ok_or_else(|| AppError::BadRequest(format!("unknown role: {}", raw)))?;
            if !role.onboarding_selectable() {
                return Err(AppError::BadRequest(
                    "admin accounts are assigned out-of-band".to_string(),
                ));
            }
            Some(role)
        }
    };

    let provider_session = state
        .identity
        .password_sign_up(
            &request.email,
            &request.password,
            request.display_name.as_deref(),
        )
        .await?;

    let jwt = create_session_jwt(
        &provider_session.user_id,
        &provider_session.access_token,
        &state.config.session_signing_key,
    )?;

    let response = reconcile_after_auth(
        &state,
        provider_session.user_id,
        &provider_session.access_token,
        desired_role,
    )
    .await?;

    tracing::info!(user_id = %response.user_id, "User signed up");
    Ok((jar.add(session_cookie(jwt)), Json(response)))
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Clear the session cookie.
async fn logout(jar: CookieJar) -> (CookieJar, Json<LogoutResponse>) {
    let removal = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    (
        jar.remove(removal),
        Json(LogoutResponse { success: true }),
    )
}
