// SPDX-License-Identifier: MIT

//! Data models shared across services and routes.

pub mod event;
pub mod profile;

pub use event::{EventPage, EventPayload, EventResponse, TicketTypePayload};
pub use profile::{AppProfile, AppRole, Reconciliation};
