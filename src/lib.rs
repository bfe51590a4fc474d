// SPDX-License-Identifier: MIT

//! Eventgate: server-side web layer for an event-ticketing platform.
//!
//! Proxies browser requests to the ticketing backend with a resilient
//! (timeout + bounded-retry) client and reconciles user roles against the
//! external identity provider.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use services::{BackendClient, IdentityProvider, ProfileReconciler};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub backend: BackendClient,
    pub identity: Arc<dyn IdentityProvider>,
    pub reconciler: ProfileReconciler,
}
