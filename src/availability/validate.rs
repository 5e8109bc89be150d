use super::dates::StayRange;
use crate::models::{Property, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Why a booking request cannot go ahead.
///
/// The `Display` text is the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingRejection {
    #[error("Start date is required")]
    MissingStartDate,

    #[error("End date is required")]
    MissingEndDate,

    #[error("End date must be after start date")]
    EndNotAfterStart,

    #[error("Start date cannot be in the past")]
    StartInPast { start: NaiveDate, today: NaiveDate },

    #[error("You cannot book your own property.")]
    OwnProperty,

    #[error("Property is not available for these dates")]
    DatesUnavailable { dates: Vec<NaiveDate> },
}

impl BookingRejection {
    /// Stable machine-readable code, shared with the HTTP error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            BookingRejection::MissingStartDate | BookingRejection::MissingEndDate => "MISSING_DATE",
            BookingRejection::EndNotAfterStart => "INVALID_RANGE",
            BookingRejection::StartInPast { .. } => "START_IN_PAST",
            BookingRejection::OwnProperty => "OWN_PROPERTY",
            BookingRejection::DatesUnavailable { .. } => "DATES_UNAVAILABLE",
        }
    }

    /// Request field the rejection is about, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            BookingRejection::MissingStartDate | BookingRejection::StartInPast { .. } => {
                Some("start_date")
            }
            BookingRejection::MissingEndDate | BookingRejection::EndNotAfterStart => {
                Some("end_date")
            }
            BookingRejection::OwnProperty | BookingRejection::DatesUnavailable { .. } => None,
        }
    }

    /// Input errors can be fixed by editing the form; the rest are policy.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            BookingRejection::MissingStartDate
                | BookingRejection::MissingEndDate
                | BookingRejection::EndNotAfterStart
        )
    }
}

/// A stay that passed validation, with its nightly quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedStay {
    pub range: StayRange,
    pub nights: i64,
    /// `nights * property.base_price`, before fees
    pub total_price: i64,
}

/// Checks a proposed stay, stopping at the first failed rule.
///
/// Rules run in this order: both dates given, end after start, start not
/// before `today`, renter is not the owner, no requested night is in
/// `unavailable`.
pub fn validate_booking_request(
    property: &Property,
    renter: UserId,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    unavailable: &BTreeSet<NaiveDate>,
    today: NaiveDate,
) -> Result<AcceptedStay, BookingRejection> {
    let start = start.ok_or(BookingRejection::MissingStartDate)?;
    let end = end.ok_or(BookingRejection::MissingEndDate)?;

    let range = StayRange::new(start, end).ok_or(BookingRejection::EndNotAfterStart)?;

    if start < today {
        return Err(BookingRejection::StartInPast { start, today });
    }

    if property.is_owned_by(renter) {
        return Err(BookingRejection::OwnProperty);
    }

    let clashes: Vec<NaiveDate> = range.days().filter(|d| unavailable.contains(d)).collect();
    if !clashes.is_empty() {
        return Err(BookingRejection::DatesUnavailable { dates: clashes });
    }

    let nights = range.nights();
    Ok(AcceptedStay {
        range,
        nights,
        total_price: nights.saturating_mul(property.base_price),
    })
}
