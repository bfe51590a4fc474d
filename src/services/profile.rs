// SPDX-License-Identifier: MIT

//! Profile reconciliation.
//!
//! Derives the canonical `{appUserId, role}` pair for an authenticated
//! identity, writes it back to the provider's metadata where it has
//! drifted, and guarantees a backend user record exists via the resilient
//! client's idempotent create.

use crate::error::AppError;
use crate::models::profile::{derive_app_user_id, is_valid_uuid, ROLE_PRECEDENCE};
use crate::models::{AppProfile, AppRole, Reconciliation};
use crate::services::backend::{BackendClient, NewBackendUser};
use crate::services::identity::{Identity, IdentityProvider};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::Arc;

/// Server/client metadata keys owned by this layer. Writes overwrite both
/// keys unconditionally; nothing else may live under them.
pub const METADATA_APP_USER_ID: &str = "appUserId";
pub const METADATA_ROLE: &str = "role";

/// Options for one reconciliation pass.
#[derive(Debug, Clone)]
pub struct EnsureProfileOptions {
    /// Explicit role request, used during onboarding. Takes precedence over
    /// permission grants and stored metadata.
    pub desired_role: Option<AppRole>,
    /// Whether this call may grant a missing role permission. Admin is
    /// never auto-granted regardless of this flag.
    pub allow_grant: bool,
}

impl Default for EnsureProfileOptions {
    fn default() -> Self {
        Self {
            desired_role: None,
            allow_grant: true,
        }
    }
}

/// Resolve the role for an identity. First match wins: explicit request,
/// then permission grants in fixed precedence, then stored server metadata.
pub fn resolve_role(identity: &Identity, desired_role: Option<AppRole>) -> Option<AppRole> {
    if let Some(role) = desired_role {
        return Some(role);
    }
    if let Some(role) = ROLE_PRECEDENCE
        .iter()
        .copied()
        .find(|role| identity.has_permission(&role.permission_id()))
    {
        return Some(role);
    }
    identity
        .server_metadata_str(METADATA_ROLE)
        .and_then(AppRole::parse)
}

/// Reconciles identities with the provider metadata store and the backend
/// user table.
#[derive(Clone)]
pub struct ProfileReconciler {
    backend: BackendClient,
    provider: Arc<dyn IdentityProvider>,
}

impl ProfileReconciler {
    pub fn new(backend: BackendClient, provider: Arc<dyn IdentityProvider>) -> Self {
        Self { backend, provider }
    }

    /// Produce the canonical profile for `identity`, persisting drift and
    /// provisioning the backend user record.
    ///
    /// When no role resolves from any source, returns `needs_onboarding`
    /// with no side effects. Terminal backend errors propagate; the only
    /// absorbed failure is the 409-as-success idempotent create.
    pub async fn ensure_profile(
        &self,
        identity: &Identity,
        access_token: &str,
        options: &EnsureProfileOptions,
    ) -> Result<Reconciliation, AppError> {
        let Some(role) = resolve_role(identity, options.desired_role) else {
            return Ok(Reconciliation {
                profile: None,
                needs_onboarding: true,
            });
        };

        // Step 1: grant the role permission if it is missing. Admin is
        // assigned out-of-band and never auto-granted.
        let permission = role.permission_id();
        if !identity.has_permission(&permission) && options.allow_grant && role != AppRole::Admin {
            tracing::info!(identity = %identity.id, permission = %permission, "Granting role permission");
            self.provider
                .grant_permission(&identity.id, &permission)
                .await?;
        }

        // Step 2: fix the stable id. Reuse the stored value only when it is
        // syntactically a UUID; otherwise derive deterministically.
        let app_user_id = match identity.server_metadata_str(METADATA_APP_USER_ID) {
            Some(stored) if is_valid_uuid(stored) => stored.to_string(),
            _ => derive_app_user_id(&identity.id),
        };

        // Step 3: write back metadata only where it has drifted.
        self.sync_metadata(identity, &app_user_id, role).await?;

        // Step 4: a backend user cannot exist without an email.
        let email = identity
            .primary_email
            .clone()
            .ok_or_else(|| AppError::MissingEmail(identity.id.clone()))?;

        // Step 5: idempotent backend provisioning. Real authentication
        // lives with the identity provider, so the password is a random
        // placeholder the user never sees.
        let user = NewBackendUser {
            id: app_user_id.clone(),
            name: identity.display_name.clone().unwrap_or_else(|| email.clone()),
            email,
            role: role.backend_name(),
            password: placeholder_password()?,
        };
        self.backend.create_user(access_token, &user).await?;

        Ok(Reconciliation {
            profile: Some(AppProfile { app_user_id, role }),
            needs_onboarding: false,
        })
    }

    /// Overwrite the server and client-readable metadata records when the
    /// derived pair differs from what they currently hold.
    async fn sync_metadata(
        &self,
        identity: &Identity,
        app_user_id: &str,
        role: AppRole,
    ) -> Result<(), AppError> {
        let canonical = serde_json::json!({
            METADATA_APP_USER_ID: app_user_id,
            METADATA_ROLE: role.as_str(),
        });

        if metadata_drifted(&identity.server_metadata, app_user_id, role) {
            tracing::debug!(identity = %identity.id, "Server metadata drift, writing back");
            self.provider
                .set_server_metadata(&identity.id, canonical.clone())
                .await?;
        }

        if metadata_drifted(&identity.client_read_only_metadata, app_user_id, role) {
            tracing::debug!(identity = %identity.id, "Client metadata drift, writing back");
            self.provider
                .set_client_read_only_metadata(&identity.id, canonical)
                .await?;
        }

        Ok(())
    }
}

/// True when a metadata bucket does not hold the canonical pair.
fn metadata_drifted(metadata: &serde_json::Value, app_user_id: &str, role: AppRole) -> bool {
    let stored_id = metadata.get(METADATA_APP_USER_ID).and_then(|v| v.as_str());
    let stored_role = metadata.get(METADATA_ROLE).and_then(|v| v.as_str());
    stored_id != Some(app_user_id) || stored_role != Some(role.as_str())
}

/// Random high-entropy placeholder credential for backend provisioning.
fn placeholder_password() -> Result<String, AppError> {
    let mut bytes = [0u8; 32];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Secure random generation failed")))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
