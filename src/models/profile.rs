// SPDX-License-Identifier: MIT

//! Application roles and the derived user profile.
//!
//! A profile is never stored in this layer; it is recomputed from the
//! identity provider's permissions and metadata on every reconciliation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Application role. Exactly one per profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppRole {
    Admin,
    Organizer,
    Staff,
    Attendee,
}

/// Role precedence when multiple permissions are granted.
/// First match wins.
pub const ROLE_PRECEDENCE: [AppRole; 4] = [
    AppRole::Admin,
    AppRole::Organizer,
    AppRole::Staff,
    AppRole::Attendee,
];

impl AppRole {
    /// Lowercase tag as stored in metadata (`"admin"`, `"organizer"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            AppRole::Admin => "admin",
            AppRole::Organizer => "organizer",
            AppRole::Staff => "staff",
            AppRole::Attendee => "attendee",
        }
    }

    /// Parse a lowercase role tag.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(AppRole::Admin),
            "organizer" => Some(AppRole::Organizer),
            "staff" => Some(AppRole::Staff),
            "attendee" => Some(AppRole::Attendee),
            _ => None,
        }
    }

    /// Identity provider permission id for this role (`role:organizer`).
    pub fn permission_id(&self) -> String {
        format!("role:{}", self.as_str())
    }

    /// Role encoded for the backend user record (upper-cased).
    pub fn backend_name(&self) -> String {
        self.as_str().to_uppercase()
    }

    /// Dashboard path this role lands on after login/onboarding.
    pub fn destination(&self) -> &'static str {
        match self {
            AppRole::Admin => "/admin",
            AppRole::Organizer => "/organizer",
            AppRole::Staff => "/staff",
            AppRole::Attendee => "/attendee",
        }
    }

    /// Roles a user may pick during onboarding. Admin is assigned
    /// out-of-band and is never selectable.
    pub fn onboarding_selectable(&self) -> bool {
        !matches!(self, AppRole::Admin)
    }
}

/// Canonical derived profile: stable id plus exactly one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppProfile {
    pub app_user_id: String,
    pub role: AppRole,
}

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    pub profile: Option<AppProfile>,
    pub needs_onboarding: bool,
}

/// Derive a stable UUID-shaped id from an opaque identity id.
///
/// SHA-256 truncated to 128 bits, with RFC 4122 version/variant bits set so
/// the output parses as a v4 UUID. Same input always yields the same id;
/// collision probability is negligible by construction.
pub fn derive_app_user_id(identity_id: &str) -> String {
    let digest = Sha256::digest(identity_id.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    bytes[6] = (bytes[6] & 0x0f) | 0x40; // version 4
    bytes[8] = (bytes[8] & 0x3f) | 0x80; // RFC 4122 variant

    let h = hex::encode(bytes);
    format!(
        "{}-{}-{}-{}-{}",
        &h[0..8],
        &h[8..12],
        &h[12..16],
        &h[16..20],
        &h[20..32]
    )
}

/// Syntactic UUID check (8-4-4-4-12 hex groups).
pub fn is_valid_uuid(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 36 {
        return false;
    }
    for (i, b) in bytes.iter().enumerate() {
        match i {
            8 | 13 | 18 | 23 => {
                if *b != b'-' {
                    return false;
                }
            }
            _ => {
                if !b.is_ascii_hexdigit() {
                    return false;
                }
            }
        }
    }
    true
}
