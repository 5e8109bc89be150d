use super::dates::{unavailable_days, DateWindow};
use super::validate::{validate_booking_request, AcceptedStay, BookingRejection};
use crate::client::{BookingSource, Session};
use crate::models::{Property, PropertyId, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Which source produced an [`UnavailableDates`] answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityOrigin {
    /// The availability endpoint answered
    Endpoint,
    /// Expanded locally from the property's booking list
    Derived,
    /// Both sources failed; the answer is the permissive default
    Unknown,
}

/// Days known to be taken for a property within a query window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableDates {
    pub dates: BTreeSet<NaiveDate>,
    /// True iff `dates` is empty
    pub available: bool,
    pub origin: AvailabilityOrigin,
}

impl UnavailableDates {
    pub fn new(dates: BTreeSet<NaiveDate>, origin: AvailabilityOrigin) -> Self {
        let available = dates.is_empty();
        Self {
            dates,
            available,
            origin,
        }
    }

    /// Nothing known to be taken. The server still guards creation.
    pub fn permissive() -> Self {
        Self::new(BTreeSet::new(), AvailabilityOrigin::Unknown)
    }

    pub fn iso_dates(&self) -> Vec<String> {
        super::dates::iso_days(&self.dates)
    }
}

/// Client-side availability lookup and advisory booking checks.
///
/// Prefers the precomputed availability endpoint and falls back to expanding
/// the raw booking list when it is missing or unreachable.
#[derive(Clone)]
pub struct AvailabilityResolver {
    source: Arc<dyn BookingSource>,
}

impl AvailabilityResolver {
    pub fn new(source: Arc<dyn BookingSource>) -> Self {
        Self { source }
    }

    /// Unavailable days of `property` inside `window`. Never fails.
    pub async fn compute_unavailable_dates(
        &self,
        session: &Session,
        property: PropertyId,
        window: DateWindow,
    ) -> UnavailableDates {
        debug!(
            "Computing unavailable dates for property {} ({} to {}) via {}",
            property,
            window.start,
            window.end,
            self.source.source_name()
        );

        match self.source.fetch_availability(session, property, window).await {
            Ok(report) => {
                let dates: BTreeSet<NaiveDate> = report
                    .unavailable_dates
                    .into_iter()
                    .filter(|day| window.contains(*day))
                    .collect();
                return UnavailableDates::new(dates, AvailabilityOrigin::Endpoint);
            }
            Err(e) => {
                warn!(
                    "Availability endpoint failed for property {}: {}; deriving from bookings",
                    property, e
                );
            }
        }

        match self.source.fetch_property_bookings(session, property).await {
            Ok(bookings) => {
                let own = bookings.iter().filter(|b| b.property == property);
                let dates = unavailable_days(own, &window);
                info!(
                    "Derived {} unavailable dates for property {} from {} bookings",
                    dates.len(),
                    property,
                    bookings.len()
                );
                UnavailableDates::new(dates, AvailabilityOrigin::Derived)
            }
            Err(e) => {
                error!(
                    "Could not load bookings for property {}: {}; treating dates as available",
                    property, e
                );
                UnavailableDates::permissive()
            }
        }
    }

    /// Advisory validation of a stay against freshly computed availability.
    ///
    /// Input and policy rules that need no remote data are checked first, so
    /// a malformed request never touches the network.
    pub async fn check_stay(
        &self,
        session: &Session,
        property: &Property,
        renter: UserId,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<AcceptedStay, BookingRejection> {
        let nothing_taken = BTreeSet::new();
        let stay = validate_booking_request(property, renter, start, end, &nothing_taken, today)?;

        let window = DateWindow {
            start: stay.range.start,
            end: stay.range.end,
        };
        let taken = self
            .compute_unavailable_dates(session, property.id, window)
            .await;
        validate_booking_request(property, renter, start, end, &taken.dates, today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use crate::models::{Booking, BookingId, BookingStatus};
    use crate::wire::AvailabilityReport;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn booking(id: i64, start: NaiveDate, end: NaiveDate, status: BookingStatus) -> Booking {
        let now = Utc::now();
        Booking {
            id: BookingId(id),
            property: PropertyId(1),
            renter: UserId(2),
            start_date: start,
            end_date: end,
            status,
            guests_count: 1,
            total_price: 0,
            base_price_total: 0,
            cleaning_fee: 0,
            service_fee: 0,
            extra_guest_fee: 0,
            special_requests: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Serves availability from a booking list, or fails on demand.
    struct FakeSource {
        bookings: Vec<Booking>,
        endpoint_up: bool,
        bookings_up: bool,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(bookings: Vec<Booking>, endpoint_up: bool, bookings_up: bool) -> Self {
            Self {
                bookings,
                endpoint_up,
                bookings_up,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl BookingSource for FakeSource {
        async fn fetch_availability(
            &self,
            _session: &Session,
            property: PropertyId,
            window: DateWindow,
        ) -> Result<AvailabilityReport, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.endpoint_up {
                return Err(ClientError::NotFound("availability".into()));
            }
            let days = unavailable_days(&self.bookings, &window);
            Ok(AvailabilityReport {
                property_id: property,
                available: days.is_empty(),
                unavailable_dates: days.into_iter().collect(),
                start_date: window.start,
                end_date: window.end,
            })
        }

        async fn fetch_property_bookings(
            &self,
            _session: &Session,
            _property: PropertyId,
        ) -> Result<Vec<Booking>, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.bookings_up {
                return Err(ClientError::Transport("connection refused".into()));
            }
            Ok(self.bookings.clone())
        }

        fn source_name(&self) -> &'static str {
            "fake"
        }
    }

    fn sample_bookings() -> Vec<Booking> {
        vec![
            booking(1, d(2024, 6, 10), d(2024, 6, 15), BookingStatus::Confirmed),
            booking(2, d(2024, 6, 20), d(2024, 6, 23), BookingStatus::Cancelled),
            booking(3, d(2024, 6, 25), d(2024, 6, 27), BookingStatus::Pending),
        ]
    }

    fn june() -> DateWindow {
        DateWindow::new(d(2024, 6, 1), d(2024, 6, 30)).unwrap()
    }

    fn session() -> Session {
        Session::new(UserId(2))
    }

    #[tokio::test]
    async fn test_primary_source_used_when_available() {
        let resolver =
            AvailabilityResolver::new(Arc::new(FakeSource::new(sample_bookings(), true, true)));
        let result = resolver
            .compute_unavailable_dates(&session(), PropertyId(1), june())
            .await;
        assert_eq!(result.origin, AvailabilityOrigin::Endpoint);
        assert_eq!(result.dates.len(), 7);
        assert!(!result.available);
    }

    #[tokio::test]
    async fn test_fallback_matches_primary() {
        let primary =
            AvailabilityResolver::new(Arc::new(FakeSource::new(sample_bookings(), true, true)));
        let fallback =
            AvailabilityResolver::new(Arc::new(FakeSource::new(sample_bookings(), false, true)));

        let a = primary
            .compute_unavailable_dates(&session(), PropertyId(1), june())
            .await;
        let b = fallback
            .compute_unavailable_dates(&session(), PropertyId(1), june())
            .await;

        assert_eq!(b.origin, AvailabilityOrigin::Derived);
        assert_eq!(a.dates, b.dates);
        assert_eq!(a.available, b.available);
    }

    #[tokio::test]
    async fn test_cancelled_dates_never_reported() {
        let resolver =
            AvailabilityResolver::new(Arc::new(FakeSource::new(sample_bookings(), false, true)));
        let result = resolver
            .compute_unavailable_dates(&session(), PropertyId(1), june())
            .await;
        for day in [d(2024, 6, 20), d(2024, 6, 21), d(2024, 6, 22)] {
            assert!(!result.dates.contains(&day));
        }
        for day in [d(2024, 6, 10), d(2024, 6, 14), d(2024, 6, 25), d(2024, 6, 26)] {
            assert!(result.dates.contains(&day));
        }
        assert!(!result.dates.contains(&d(2024, 6, 15)));
    }

    #[tokio::test]
    async fn test_total_failure_is_permissive() {
        let resolver =
            AvailabilityResolver::new(Arc::new(FakeSource::new(sample_bookings(), false, false)));
        let result = resolver
            .compute_unavailable_dates(&session(), PropertyId(1), june())
            .await;
        assert_eq!(result, UnavailableDates::permissive());
        assert!(result.available);
    }

    #[tokio::test]
    async fn test_repeated_calls_agree() {
        let resolver =
            AvailabilityResolver::new(Arc::new(FakeSource::new(sample_bookings(), true, true)));
        let first = resolver
            .compute_unavailable_dates(&session(), PropertyId(1), june())
            .await;
        let second = resolver
            .compute_unavailable_dates(&session(), PropertyId(1), june())
            .await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_input_errors_skip_network() {
        let source = Arc::new(FakeSource::new(sample_bookings(), true, true));
        let resolver = AvailabilityResolver::new(source.clone());
        let property = Property {
            id: PropertyId(1),
            owner: UserId(9),
            title: "Loft".into(),
            base_price: 10_000,
            cleaning_fee: 0,
            service_fee: 0,
            extra_guest_fee: 0,
            max_guests: 2,
        };
        let day = d(2024, 6, 1);
        let result = resolver
            .check_stay(&session(), &property, UserId(2), Some(day), Some(day), d(2024, 5, 1))
            .await;
        assert_eq!(result, Err(BookingRejection::EndNotAfterStart));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);

        let overlap = resolver
            .check_stay(
                &session(),
                &property,
                UserId(2),
                Some(d(2024, 6, 12)),
                Some(d(2024, 6, 14)),
                d(2024, 5, 1),
            )
            .await;
        assert!(matches!(overlap, Err(BookingRejection::DatesUnavailable { .. })));
    }
}
