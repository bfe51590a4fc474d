// SPDX-License-Identifier: MIT

//! Identity provider integration.
//!
//! The provider owns authentication and the per-user metadata record. This
//! module exposes the small set of primitives the reconciler sequences:
//! fetch the identity snapshot, grant a permission, and overwrite the two
//! metadata buckets. `IdentityProvider` is a trait so tests can substitute
//! an in-memory provider.

use crate::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Authenticated identity snapshot as reported by the provider.
///
/// Read-only to this layer except through the explicit write primitives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub primary_email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Granted permission ids (`role:organizer`, ...).
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Metadata writable only by trusted server code.
    #[serde(default)]
    pub server_metadata: serde_json::Value,
    /// Metadata the client may read but only the server may write.
    #[serde(default)]
    pub client_read_only_metadata: serde_json::Value,
}

impl Identity {
    /// String value from server metadata, if present.
    pub fn server_metadata_str(&self, key: &str) -> Option<&str> {
        self.server_metadata.get(key).and_then(|v| v.as_str())
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

/// Tokens issued by the provider after password sign-in/sign-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSession {
    pub access_token: String,
    pub user_id: String,
}

/// Network-bound identity provider primitives.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Fetch the identity for a provider access token.
    async fn get_user(&self, access_token: &str) -> Result<Identity, AppError>;

    /// Password sign-in. Non-2xx provider responses surface with their
    /// original status and body so the login proxy can relay them.
    async fn password_sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderSession, AppError>;

    /// Password sign-up; same relay semantics as sign-in.
    async fn password_sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<ProviderSession, AppError>;

    /// Grant a permission to a user.
    async fn grant_permission(&self, user_id: &str, permission: &str) -> Result<(), AppError>;

    /// Overwrite the server metadata record. Unconditional overwrite of the
    /// whole object, not a partial merge.
    async fn set_server_metadata(
        &self,
        user_id: &str,
        metadata: serde_json::Value,
    ) -> Result<(), AppError>;

    /// Overwrite the client-readable metadata record.
    async fn set_client_read_only_metadata(
        &self,
        user_id: &str,
        metadata: serde_json::Value,
    ) -> Result<(), AppError>;
}

/// HTTP client for the identity provider's server API.
#[derive(Clone)]
pub struct HttpIdentityProvider {
    http: reqwest::Client,
    base_url: String,
    server_secret: String,
}

impl HttpIdentityProvider {
    pub fn new(base_url: impl Into<String>, server_secret: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            server_secret: server_secret.into(),
        }
    }

    /// Check response status and surface the body on failure.
    async fn check_response(&self, response: reqwest::Response) -> Result<(), AppError> {
        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::IdentityProvider(format!(
            "HTTP {}: {}",
            status, body
        )))
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::IdentityProvider(format!(
                "HTTP {}: {}",
                status, body
            )));
        }
        response
            .json()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("JSON parse error: {}", e)))
    }

    /// Sign-in/sign-up responses are relayed verbatim on failure, so their
    /// errors keep the provider status and body.
    async fn relay_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let status_text = status.canonical_reason().unwrap_or("").to_string();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Backend {
                status: status.as_u16(),
                status_text,
                body,
            });
        }
        response
            .json()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn get_user(&self, access_token: &str) -> Result<Identity, AppError> {
        let url = format!("{}/api/v1/users/me", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .header("X-Server-Secret", &self.server_secret)
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(e.to_string()))?;
        self.check_response_json(response).await
    }

    async fn password_sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderSession, AppError> {
        let url = format!("{}/api/v1/auth/password/sign-in", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("X-Server-Secret", &self.server_secret)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(e.to_string()))?;
        self.relay_response_json(response).await
    }

    async fn password_sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<ProviderSession, AppError> {
        let url = format!("{}/api/v1/auth/password/sign-up", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("X-Server-Secret", &self.server_secret)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "displayName": display_name,
            }))
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(e.to_string()))?;
        self.relay_response_json(response).await
    }

    async fn grant_permission(&self, user_id: &str, permission: &str) -> Result<(), AppError> {
        let url = format!("{}/api/v1/users/{}/permissions", self.base_url, user_id);
        let response = self
            .http
            .post(&url)
            .header("X-Server-Secret", &self.server_secret)
            .json(&serde_json::json!({ "id": permission }))
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(e.to_string()))?;
        self.check_response(response).await
    }

    async fn set_server_metadata(
        &self,
        user_id: &str,
        metadata: serde_json::Value,
    ) -> Result<(), AppError> {
        let url = format!("{}/api/v1/users/{}", self.base_url, user_id);
        let response = self
            .http
            .patch(&url)
            .header("X-Server-Secret", &self.server_secret)
            .json(&serde_json::json!({ "serverMetadata": metadata }))
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(e.to_string()))?;
        self.check_response(response).await
    }

    async fn set_client_read_only_metadata(
        &self,
        user_id: &str,
        metadata: serde_json::Value,
    ) -> Result<(), AppError> {
        let url = format!("{}/api/v1/users/{}", self.base_url, user_id);
        let response = self
            .http
            .patch(&url)
            .header("X-Server-Secret", &self.server_secret)
            .json(&serde_json::json!({ "clientReadOnlyMetadata": metadata }))
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(e.to_string()))?;
        self.check_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_metadata_helpers() {
        let identity = Identity {
            id: "u1".to_string(),
            primary_email: Some("a@b.com".to_string()),
            display_name: None,
            permissions: vec!["role:staff".to_string()],
            server_metadata: serde_json::json!({ "role": "staff" }),
            client_read_only_metadata: serde_json::Value::Null,
        };

        assert_eq!(identity.server_metadata_str("role"), Some("staff"));
        assert_eq!(identity.server_metadata_str("appUserId"), None);
        assert!(identity.has_permission("role:staff"));
        assert!(!identity.has_permission("role:admin"));
    }

    #[test]
    fn identity_deserializes_with_missing_buckets() {
        let identity: Identity = serde_json::from_str(r#"{"id":"u2"}"#).unwrap();
        assert_eq!(identity.id, "u2");
        assert!(identity.permissions.is_empty());
        assert!(identity.server_metadata.is_null());
    }
}
