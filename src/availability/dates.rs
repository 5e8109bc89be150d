//! Whole-day date arithmetic for stays.
//!
//! A stay covers the nights `[start, end)`: the guest arrives on `start` and
//! leaves on `end`, so `end` itself stays free for the next arrival.

use crate::models::Booking;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Half-open range of calendar days `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl StayRange {
    /// Returns `None` unless `end` is strictly after `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (end > start).then_some(Self { start, end })
    }

    /// Number of nights, i.e. `ceil((end - start) / 1 day)` for whole days.
    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Every occupied day, checkout excluded.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day < end)
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day < self.end
    }

    pub fn overlaps(&self, other: &StayRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Inclusive calendar window used for availability queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Returns `None` when `end` is before `start`. A one-day window is fine.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (end >= start).then_some(Self { start, end })
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Whether any occupied night of `stay` falls inside the window.
    pub fn intersects(&self, stay: &StayRange) -> bool {
        stay.start <= self.end && self.start < stay.end
    }
}

/// The occupied range of a booking, if its dates are well formed.
pub fn booking_range(booking: &Booking) -> Option<StayRange> {
    StayRange::new(booking.start_date, booking.end_date)
}

/// Expands the date-blocking bookings into the set of occupied days inside `window`.
///
/// Non-blocking statuses (cancelled, rejected) and malformed ranges contribute nothing.
pub fn unavailable_days<'a, I>(bookings: I, window: &DateWindow) -> BTreeSet<NaiveDate>
where
    I: IntoIterator<Item = &'a Booking>,
{
    let mut days = BTreeSet::new();
    for booking in bookings.into_iter().filter(|b| b.blocks_dates()) {
        let Some(range) = booking_range(booking) else {
            continue;
        };
        if !window.intersects(&range) {
            continue;
        }
        let from = range.start.max(window.start);
        let until = range
            .end
            .min(window.end.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX));
        if let Some(clipped) = StayRange::new(from, until) {
            days.extend(clipped.days());
        }
    }
    days
}

/// Formats days as ISO `YYYY-MM-DD` strings, in ascending order.
pub fn iso_days(days: &BTreeSet<NaiveDate>) -> Vec<String> {
    days.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect()
}
