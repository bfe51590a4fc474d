// SPDX-License-Identifier: MIT

//! Application error types with consistent API responses.
//!
//! Terminal backend failures keep the upstream status and body so proxy
//! handlers can relay them verbatim.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired session")]
    InvalidSession,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// No bearer credential available for an outbound call.
    #[error("Missing bearer credential for backend call")]
    MissingCredential,

    /// The identity has no primary email, so a backend user cannot be
    /// provisioned for it.
    #[error("Identity {0} has no primary email")]
    MissingEmail(String),

    /// Terminal backend response (non-2xx, not retryable).
    #[error("Backend error ({status} {status_text}): {body}")]
    Backend {
        status: u16,
        status_text: String,
        body: String,
    },

    /// All retry attempts failed without a classified terminal response.
    #[error("Backend call failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("Identity provider error: {0}")]
    IdentityProvider(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidSession => (StatusCode::UNAUTHORIZED, "invalid_session", None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::MissingCredential => (StatusCode::UNAUTHORIZED, "missing_credential", None),
            AppError::MissingEmail(id) => {
                tracing::error!(identity = %id, "Identity has no primary email");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "missing_email",
                    Some(format!("identity {} has no primary email", id)),
                )
            }
            AppError::Backend { status, body, .. } => {
                // Relay the backend status and body verbatim.
                let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY);
                return (status, body.clone()).into_response();
            }
            AppError::RetriesExhausted {
                attempts,
                last_error,
            } => {
                tracing::error!(attempts, error = %last_error, "Backend retries exhausted");
                (StatusCode::BAD_GATEWAY, "backend_unavailable", None)
            }
            AppError::IdentityProvider(msg) => {
                tracing::error!(error = %msg, "Identity provider error");
                (StatusCode::BAD_GATEWAY, "identity_provider_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
