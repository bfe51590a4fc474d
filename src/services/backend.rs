// SPDX-License-Identifier: MIT

//! Resilient client for the ticketing backend API.
//!
//! Every outbound call goes through one generic `execute` routine that
//! enforces a per-attempt timeout and a bounded exponential-backoff retry
//! policy. Operations differ only in path, method, payload, and whether a
//! 409 conflict counts as success (idempotent creates).

use crate::error::AppError;
use crate::models::{EventPage, EventPayload, EventResponse};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Header carrying the caller's app user id to the backend.
const USER_ID_HEADER: &str = "X-User-Id";

/// Retry/timeout policy for one logical backend call.
///
/// Total attempts = `max_retries + 1`. The backoff delay doubles after each
/// retryable failure, starting from `initial_backoff`.
#[derive(Debug, Clone)]
pub struct CallPolicy {
    /// Per-attempt timeout; expiry aborts only that attempt.
    pub timeout: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(crate::config::DEFAULT_BACKEND_TIMEOUT_MS),
            max_retries: crate::config::DEFAULT_BACKEND_MAX_RETRIES,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// Description of one backend request; rebuilt fresh for every attempt.
struct BackendRequest<'a> {
    method: Method,
    path: String,
    bearer: &'a str,
    user_id: Option<&'a str>,
    body: Option<serde_json::Value>,
    /// 409 means "already exists" and is treated as success.
    idempotent_create: bool,
}

/// New backend user record for idempotent provisioning.
#[derive(Debug, Clone, Serialize)]
pub struct NewBackendUser {
    pub id: String,
    pub email: String,
    pub name: String,
    /// Upper-cased role tag (`ADMIN`, `ORGANIZER`, ...).
    pub role: String,
    pub password: String,
}

/// Backend API client.
///
/// Holds no mutable state; safe to call concurrently for independent
/// requests.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    policy: CallPolicy,
}

impl BackendClient {
    /// Create a new client for the given backend base URL.
    pub fn new(base_url: impl Into<String>, policy: CallPolicy) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            policy,
        }
    }

    /// Create the backend-side user record. Idempotent: a 409 response
    /// means the user already exists and is treated as success.
    pub async fn create_user(
        &self,
        access_token: &str,
        user: &NewBackendUser,
    ) -> Result<(), AppError> {
        self.execute(BackendRequest {
            method: Method::POST,
            path: "/api/v1/users".to_string(),
            bearer: access_token,
            user_id: None,
            body: Some(serde_json::to_value(user).map_err(anyhow::Error::from)?),
            idempotent_create: true,
        })
        .await?;
        Ok(())
    }

    /// List the caller's organizer events.
    pub async fn list_events(&self, access_token: &str) -> Result<Vec<EventResponse>, AppError> {
        let response = self
            .execute(BackendRequest {
                method: Method::GET,
                path: "/api/v1/events".to_string(),
                bearer: access_token,
                user_id: None,
                body: None,
                idempotent_create: false,
            })
            .await?;
        let page: EventPage = Self::parse_json(response).await?;
        Ok(page.content)
    }

    /// Create an event on behalf of `app_user_id`.
    pub async fn create_event(
        &self,
        access_token: &str,
        app_user_id: &str,
        payload: &EventPayload,
    ) -> Result<EventResponse, AppError> {
        let response = self
            .execute(BackendRequest {
                method: Method::POST,
                path: "/api/v1/events".to_string(),
                bearer: access_token,
                user_id: Some(app_user_id),
                body: Some(serde_json::to_value(payload).map_err(anyhow::Error::from)?),
                idempotent_create: false,
            })
            .await?;
        Self::parse_json(response).await
    }

    /// Update an existing event.
    pub async fn update_event(
        &self,
        access_token: &str,
        event_id: &str,
        payload: &EventPayload,
    ) -> Result<EventResponse, AppError> {
        let response = self
            .execute(BackendRequest {
                method: Method::PUT,
                path: format!("/api/v1/events/{}", event_id),
                bearer: access_token,
                user_id: None,
                body: Some(serde_json::to_value(payload).map_err(anyhow::Error::from)?),
                idempotent_create: false,
            })
            .await?;
        Self::parse_json(response).await
    }

    /// Validate a ticket QR code at the door (staff operation).
    pub async fn validate_ticket(
        &self,
        access_token: &str,
        app_user_id: &str,
        event_id: &str,
        qr_code_id: &str,
    ) -> Result<serde_json::Value, AppError> {
        let response = self
            .execute(BackendRequest {
                method: Method::POST,
                path: format!("/api/v1/events/{}/ticket-validations", event_id),
                bearer: access_token,
                user_id: Some(app_user_id),
                body: Some(serde_json::json!({ "qrCodeId": qr_code_id })),
                idempotent_create: false,
            })
            .await?;
        Self::parse_json(response).await
    }

    /// Fetch the QR code payload for a ticket.
    pub async fn get_ticket_qr(
        &self,
        access_token: &str,
        app_user_id: &str,
        ticket_id: &str,
    ) -> Result<serde_json::Value, AppError> {
        let response = self
            .execute(BackendRequest {
                method: Method::GET,
                path: format!("/api/v1/tickets/{}/qr-codes", ticket_id),
                bearer: access_token,
                user_id: Some(app_user_id),
                body: None,
                idempotent_create: false,
            })
            .await?;
        Self::parse_json(response).await
    }

    /// Execute a request under the retry policy.
    ///
    /// Returns `Ok(Some(response))` on 2xx, `Ok(None)` when a 409 was
    /// accepted for an idempotent create. Timeouts, connection failures,
    /// and 5xx responses are retried while attempts remain; any other
    /// non-2xx status is terminal immediately.
    async fn execute(
        &self,
        request: BackendRequest<'_>,
    ) -> Result<Option<reqwest::Response>, AppError> {
        if request.bearer.is_empty() {
            return Err(AppError::MissingCredential);
        }

        let attempts = self.policy.max_retries + 1;
        let mut backoff = self.policy.initial_backoff;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            if attempt > 1 {
                tokio::time::sleep(backoff).await;
                backoff = next_backoff(backoff);
            }

            let response = match self.build(&request).send().await {
                Ok(r) => r,
                Err(e) => {
                    // Per-attempt timeout or network failure: retryable.
                    tracing::warn!(
                        attempt,
                        path = %request.path,
                        error = %e,
                        "Backend request failed"
                    );
                    last_error = e.to_string();
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                return Ok(Some(response));
            }

            if request.idempotent_create && status == StatusCode::CONFLICT {
                tracing::debug!(path = %request.path, "Conflict treated as success (already exists)");
                return Ok(None);
            }

            if status.is_server_error() && attempt < attempts {
                let body = response.text().await.unwrap_or_default();
                tracing::warn!(
                    attempt,
                    path = %request.path,
                    status = status.as_u16(),
                    "Retryable backend error"
                );
                last_error = format!("HTTP {}: {}", status, body);
                continue;
            }

            // Terminal: 4xx other than an accepted conflict, or 5xx on the
            // final attempt. Keep status and body for the caller.
            let status_text = status.canonical_reason().unwrap_or("").to_string();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Backend {
                status: status.as_u16(),
                status_text,
                body,
            });
        }

        Err(AppError::RetriesExhausted {
            attempts,
            last_error,
        })
    }

    /// Build a fresh request for one attempt.
    fn build(&self, request: &BackendRequest<'_>) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .bearer_auth(request.bearer)
            .timeout(self.policy.timeout);

        if let Some(user_id) = request.user_id {
            builder = builder.header(USER_ID_HEADER, user_id);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        builder
    }

    /// Parse a JSON body from an accepted response.
    async fn parse_json<T: for<'de> Deserialize<'de>>(
        response: Option<reqwest::Response>,
    ) -> Result<T, AppError> {
        let response = response
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Expected a response body")))?;
        response
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JSON parse error: {}", e)))
    }
}

/// Double the backoff without overflowing; a runaway retry budget from the
/// environment must not panic the loop.
fn next_backoff(backoff: Duration) -> Duration {
    backoff.saturating_mul(2)
}
