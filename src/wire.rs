//! JSON shapes exchanged between the booking client and server.
//!
//! Every response body is one of two envelopes:
//!
//! ```text
//! success: {"data": <payload>}
//! failure: {"error": {"code": "...", "message": "...", "fields": {..}, "conflicts": [..]}}
//! ```
//!
//! `fields` maps request field names to messages and `conflicts` lists the
//! ids of bookings that clash with a rejected request. Both are omitted when
//! empty.

use crate::models::{BookingId, BookingStatus, PropertyId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Header carrying the already-authenticated acting user.
pub const USER_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

/// Structured error returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<BookingId>,
}

impl ErrorBody {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            fields: BTreeMap::new(),
            conflicts: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.fields.insert(field.into(), message.into());
        self
    }

    pub fn with_conflicts(mut self, conflicts: Vec<BookingId>) -> Self {
        self.conflicts = conflicts;
        self
    }
}

/// `GET /properties/{id}/availability/` query string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// `GET /properties/{id}/availability/` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityReport {
    pub property_id: PropertyId,
    pub unavailable_dates: Vec<NaiveDate>,
    pub available: bool,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// `POST /bookings/` body.
///
/// Dates are optional on the wire so a missing date is reported as a field
/// error instead of a decode failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub property: PropertyId,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_guests")]
    pub guests_count: u32,
    #[serde(default)]
    pub special_requests: Option<String>,
}

fn default_guests() -> u32 {
    1
}

/// `PATCH /bookings/{id}/status/` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: BookingStatus,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
