use super::{BookingId, PropertyId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Lifecycle state of a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Waiting for the leaser to answer
    Pending,
    Confirmed,
    Cancelled,
    /// The stay took place
    Completed,
    /// Declined by the leaser
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Cannot transition from '{from}' to '{to}'")]
    NotAllowed {
        from: BookingStatus,
        to: BookingStatus,
    },
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Cancelled,
        BookingStatus::Completed,
        BookingStatus::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
            BookingStatus::Rejected => "rejected",
        }
    }

    /// States a booking can move to from `self`.
    pub fn successors(self) -> &'static [BookingStatus] {
        match self {
            BookingStatus::Pending => &[
                BookingStatus::Confirmed,
                BookingStatus::Rejected,
                BookingStatus::Cancelled,
            ],
            BookingStatus::Confirmed => &[BookingStatus::Cancelled, BookingStatus::Completed],
            BookingStatus::Cancelled | BookingStatus::Completed | BookingStatus::Rejected => &[],
        }
    }

    pub fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }

    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        self.successors().contains(&next)
    }

    /// Whether a booking in this state holds its nights.
    ///
    /// Cancelled and rejected bookings release their dates. Completed stays
    /// keep them, so history reads the same before and after checkout.
    pub fn blocks_dates(self) -> bool {
        matches!(
            self,
            BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::Completed
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A renter's reservation of a property for `[start_date, end_date)`.
///
/// The checkout day `end_date` is not occupied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: BookingId,
    pub property: PropertyId,
    pub renter: UserId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: BookingStatus,
    pub guests_count: u32,
    pub total_price: i64,
    #[serde(default)]
    pub base_price_total: i64,
    #[serde(default)]
    pub cleaning_fee: i64,
    #[serde(default)]
    pub service_fee: i64,
    #[serde(default)]
    pub extra_guest_fee: i64,
    #[serde(default)]
    pub special_requests: Option<String>,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn duration_nights(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }

    pub fn is_active(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }

    pub fn is_upcoming(&self, today: NaiveDate) -> bool {
        self.status == BookingStatus::Confirmed && self.start_date > today
    }

    pub fn is_past(&self, today: NaiveDate) -> bool {
        self.end_date < today
    }

    pub fn blocks_dates(&self) -> bool {
        self.status.blocks_dates()
    }

    /// Moves the booking to `next`, recording the cancellation reason when cancelling.
    pub fn transition(
        &mut self,
        next: BookingStatus,
        cancellation_reason: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError::NotAllowed {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        if next == BookingStatus::Cancelled {
            self.cancellation_reason = cancellation_reason;
        }
        self.updated_at = at;
        Ok(())
    }
}
