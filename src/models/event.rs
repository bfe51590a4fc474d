// SPDX-License-Identifier: MIT

//! Event payloads exchanged with the ticketing backend.
//!
//! Field names stay camelCase on the wire to match the backend contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Ticket type offered for an event.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TicketTypePayload {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(range(min = 0.0))]
    pub price: f64,
    #[validate(range(min = 1))]
    pub quantity: u32,
}

/// Event payload sent to the backend on create/update.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizer_id: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: String,
    #[validate(length(min = 1, max = 300))]
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[validate(nested)]
    pub ticket_types: Vec<TicketTypePayload>,
}

impl EventPayload {
    /// Check the time window on top of the derive-based field validation.
    pub fn validate_times(&self) -> Result<(), String> {
        if self.end_time <= self.start_time {
            return Err("end time must be after the start time".to_string());
        }
        Ok(())
    }
}

/// Event record as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub ticket_types: Vec<TicketTypePayload>,
}

/// Backend list envelope: `{"content": [...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct EventPage {
    pub content: Vec<EventResponse>,
}
