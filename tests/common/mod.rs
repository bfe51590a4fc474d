// SPDX-License-Identifier: MIT

//! Shared test fixtures: an in-memory identity provider that records every
//! write primitive the reconciler invokes.

use async_trait::async_trait;
use eventgate::error::AppError;
use eventgate::services::{Identity, IdentityProvider, ProviderSession};
use std::sync::Mutex;

/// Recorded side effects of a reconciliation run.
#[derive(Debug, Default)]
pub struct ProviderLog {
    pub grants: Vec<(String, String)>,
    pub server_metadata_writes: Vec<(String, serde_json::Value)>,
    pub client_metadata_writes: Vec<(String, serde_json::Value)>,
}

/// Configured outcome for the password sign-in/sign-up endpoints.
enum AuthOutcome {
    Unconfigured,
    Session(ProviderSession),
    Failure { status: u16, body: String },
}

impl AuthOutcome {
    fn resolve(&self) -> Result<ProviderSession, AppError> {
        match self {
            AuthOutcome::Unconfigured => Err(AppError::IdentityProvider(
                "password auth not configured in mock".to_string(),
            )),
            AuthOutcome::Session(session) => Ok(session.clone()),
            AuthOutcome::Failure { status, body } => Err(AppError::Backend {
                status: *status,
                status_text: String::new(),
                body: body.clone(),
            }),
        }
    }
}

/// In-memory identity provider. `get_user` always returns the configured
/// identity snapshot; writes are recorded but do not mutate the snapshot,
/// mirroring the fact that real provider reads are point-in-time.
pub struct MockIdentityProvider {
    identity: Identity,
    auth: AuthOutcome,
    pub log: Mutex<ProviderLog>,
}

impl MockIdentityProvider {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            auth: AuthOutcome::Unconfigured,
            log: Mutex::new(ProviderLog::default()),
        }
    }

    /// Make password sign-in/sign-up succeed with the given session.
    #[allow(dead_code)]
    pub fn with_session(mut self, user_id: &str, access_token: &str) -> Self {
        self.auth = AuthOutcome::Session(ProviderSession {
            access_token: access_token.to_string(),
            user_id: user_id.to_string(),
        });
        self
    }

    /// Make password sign-in/sign-up fail as the provider would, with a
    /// status and body to be relayed to the caller.
    #[allow(dead_code)]
    pub fn with_auth_failure(mut self, status: u16, body: &str) -> Self {
        self.auth = AuthOutcome::Failure {
            status,
            body: body.to_string(),
        };
        self
    }

    #[allow(dead_code)]
    pub fn grant_count(&self) -> usize {
        self.log.lock().unwrap().grants.len()
    }

    #[allow(dead_code)]
    pub fn server_write_count(&self) -> usize {
        self.log.lock().unwrap().server_metadata_writes.len()
    }

    #[allow(dead_code)]
    pub fn client_write_count(&self) -> usize {
        self.log.lock().unwrap().client_metadata_writes.len()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn get_user(&self, _access_token: &str) -> Result<Identity, AppError> {
        Ok(self.identity.clone())
    }

    async fn password_sign_in(
        &self,
        _email: &str,
        _password: &str,
    ) -> Result<ProviderSession, AppError> {
        self.auth.resolve()
    }

    async fn password_sign_up(
        &self,
        _email: &str,
        _password: &str,
        _display_name: Option<&str>,
    ) -> Result<ProviderSession, AppError> {
        self.auth.resolve()
    }

    async fn grant_permission(&self, user_id: &str, permission: &str) -> Result<(), AppError> {
        self.log
            .lock()
            .unwrap()
            .grants
            .push((user_id.to_string(), permission.to_string()));
        Ok(())
    }

    async fn set_server_metadata(
        &self,
        user_id: &str,
        metadata: serde_json::Value,
    ) -> Result<(), AppError> {
        self.log
            .lock()
            .unwrap()
            .server_metadata_writes
            .push((user_id.to_string(), metadata));
        Ok(())
    }

    async fn set_client_read_only_metadata(
        &self,
        user_id: &str,
        metadata: serde_json::Value,
    ) -> Result<(), AppError> {
        self.log
            .lock()
            .unwrap()
            .client_metadata_writes
            .push((user_id.to_string(), metadata));
        Ok(())
    }
}

/// Identity fixture with sensible defaults.
pub fn identity(id: &str, permissions: &[&str]) -> Identity {
    Identity {
        id: id.to_string(),
        primary_email: Some("a@b.com".to_string()),
        display_name: Some("Test User".to_string()),
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
        server_metadata: serde_json::Value::Null,
        client_read_only_metadata: serde_json::Value::Null,
    }
}
