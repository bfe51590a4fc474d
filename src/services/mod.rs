// SPDX-License-Identifier: MIT

//! Services module - business logic layer.

pub mod backend;
pub mod identity;
pub mod profile;

pub use backend::{BackendClient, CallPolicy, NewBackendUser};
pub use identity::{HttpIdentityProvider, Identity, IdentityProvider, ProviderSession};
pub use profile::{EnsureProfileOptions, ProfileReconciler};
