//! Booking submission as seen from the renter's side.

use super::{BookingApiClient, ClientError, Session};
use crate::availability::{AcceptedStay, AvailabilityResolver, BookingRejection};
use crate::models::{Booking, Property};
use crate::wire::{CreateBookingRequest, ErrorBody};
use chrono::NaiveDate;
use tracing::{info, warn};

/// What the renter filled in.
#[derive(Debug, Clone)]
pub struct BookingDraft {
    pub property: Property,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub guests_count: u32,
    pub special_requests: Option<String>,
}

impl BookingDraft {
    pub fn new(property: Property, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            property,
            start_date: Some(start_date),
            end_date: Some(end_date),
            guests_count: 1,
            special_requests: None,
        }
    }

    fn to_request(&self) -> CreateBookingRequest {
        CreateBookingRequest {
            property: self.property.id,
            start_date: self.start_date,
            end_date: self.end_date,
            guests_count: self.guests_count,
            special_requests: self.special_requests.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Persisted by the server, normally as `pending`
    Created(Booking),
    /// Caught before any request was sent
    RejectedLocally(BookingRejection),
    /// The server disagreed with the local check; its verdict wins.
    /// A `DATES_UNAVAILABLE` code here means someone else booked first.
    RejectedByServer(ErrorBody),
}

impl SubmitOutcome {
    pub fn booking(&self) -> Option<&Booking> {
        match self {
            SubmitOutcome::Created(booking) => Some(booking),
            _ => None,
        }
    }
}

/// Validates the draft against current availability, then submits it.
///
/// Only transport-level failures of the submission come back as `Err`;
/// every rejection is an outcome.
pub async fn submit_booking(
    api: &BookingApiClient,
    resolver: &AvailabilityResolver,
    session: &Session,
    draft: &BookingDraft,
    today: NaiveDate,
) -> Result<SubmitOutcome, ClientError> {
    let checked: Result<AcceptedStay, BookingRejection> = resolver
        .check_stay(
            session,
            &draft.property,
            session.user(),
            draft.start_date,
            draft.end_date,
            today,
        )
        .await;

    let stay = match checked {
        Ok(stay) => stay,
        Err(rejection) => {
            info!(
                "Booking of property {} rejected locally: {}",
                draft.property.id, rejection
            );
            return Ok(SubmitOutcome::RejectedLocally(rejection));
        }
    };

    info!(
        "Submitting {} night(s) at property {} (quoted {})",
        stay.nights, draft.property.id, stay.total_price
    );

    match api.create_booking(session, &draft.to_request()).await {
        Ok(booking) => Ok(SubmitOutcome::Created(booking)),
        Err(ClientError::Rejected { status, body }) => {
            warn!(
                "Server rejected booking of property {} ({}): {}",
                draft.property.id, status, body.message
            );
            Ok(SubmitOutcome::RejectedByServer(body))
        }
        Err(e) => Err(e),
    }
}
