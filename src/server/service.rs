//! Authoritative booking rules.
//!
//! Everything the client checks is checked again here against the server's
//! own data. The overlap rule is enforced inside the repository's insert.

use super::error::ServiceError;
use super::repository::{BookingRepository, NewBooking};
use crate::availability::dates::{iso_days, unavailable_days};
use crate::availability::{validate_booking_request, DateWindow};
use crate::clock::Clock;
use crate::models::{Booking, BookingId, BookingStatus, PropertyId, UserId};
use crate::pricing::PriceBreakdown;
use crate::wire::{AvailabilityReport, CreateBookingRequest, StatusUpdateRequest};
use chrono::{NaiveDate, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Upper bound on `guests_count` for a single booking.
pub const MAX_GUESTS: u32 = 100;

/// Longest stay accepted in one booking.
pub const MAX_STAY_NIGHTS: i64 = 365;

pub struct BookingService {
    repository: Arc<dyn BookingRepository>,
    clock: Arc<dyn Clock>,
}

fn parse_day(value: &str) -> Result<NaiveDate, ServiceError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ServiceError::BadRequest("Invalid date format. Use YYYY-MM-DD.".to_string()))
}

impl BookingService {
    pub fn new(repository: Arc<dyn BookingRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    pub fn repository(&self) -> &Arc<dyn BookingRepository> {
        &self.repository
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Unavailable days of a property within the inclusive window given as
    /// raw `YYYY-MM-DD` query values.
    pub async fn availability(
        &self,
        property: PropertyId,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<AvailabilityReport, ServiceError> {
        let (Some(start), Some(end)) = (start_date, end_date) else {
            return Err(ServiceError::BadRequest(
                "Both start_date and end_date are required.".to_string(),
            ));
        };
        let start = parse_day(start)?;
        let end = parse_day(end)?;
        let window = DateWindow::new(start, end).ok_or_else(|| {
            ServiceError::BadRequest("End date must be after start date.".to_string())
        })?;

        let bookings = self.repository.bookings_for_property(property).await?;
        let days = unavailable_days(&bookings, &window);
        info!(
            "Found {} unavailable dates for property {}",
            days.len(),
            property
        );

        Ok(AvailabilityReport {
            property_id: property,
            available: days.is_empty(),
            unavailable_dates: days.into_iter().collect(),
            start_date: start,
            end_date: end,
        })
    }

    pub async fn property_bookings(&self, property: PropertyId) -> Result<Vec<Booking>, ServiceError> {
        let bookings = self.repository.bookings_for_property(property).await?;
        info!("Found {} bookings for property {}", bookings.len(), property);
        Ok(bookings)
    }

    /// Validates and stores a booking request made by `renter`.
    pub async fn create_booking(
        &self,
        renter: UserId,
        request: CreateBookingRequest,
    ) -> Result<Booking, ServiceError> {
        let property = self.repository.property(request.property).await?;
        let today = self.clock.today();

        // Overlap is rechecked atomically by the insert below.
        let nothing_taken = BTreeSet::new();
        let stay = validate_booking_request(
            &property,
            renter,
            request.start_date,
            request.end_date,
            &nothing_taken,
            today,
        )
        .inspect_err(|rejection| {
            warn!(
                "Booking of property {} by user {} rejected: {}",
                property.id, renter, rejection
            )
        })?;

        if request.guests_count == 0 || request.guests_count > MAX_GUESTS {
            return Err(ServiceError::InvalidField {
                field: "guests_count".to_string(),
                message: format!("guests_count must be between 1 and {}", MAX_GUESTS),
            });
        }
        if stay.nights > MAX_STAY_NIGHTS {
            return Err(ServiceError::InvalidField {
                field: "end_date".to_string(),
                message: format!("A stay cannot exceed {} nights", MAX_STAY_NIGHTS),
            });
        }

        let price = PriceBreakdown::quote(&property, stay.nights, request.guests_count)
            .ok_or_else(|| {
                ServiceError::Internal(format!(
                    "price of property {} overflows for {} nights",
                    property.id, stay.nights
                ))
            })?;
        let new = NewBooking {
            property: property.id,
            renter,
            range: stay.range,
            guests_count: request.guests_count,
            price,
            special_requests: request.special_requests,
            created_at: Utc::now(),
        };

        match self.repository.insert_if_available(new).await {
            Ok(booking) => {
                info!(
                    "Booking created: ID {} for property {} ({} to {}), total {}",
                    booking.id,
                    booking.property,
                    booking.start_date,
                    booking.end_date,
                    booking.total_price
                );
                Ok(booking)
            }
            Err(e) => {
                let err = ServiceError::from(e);
                if let ServiceError::Conflict { dates, conflicts } = &err {
                    let dates: BTreeSet<NaiveDate> = dates.iter().copied().collect();
                    warn!(
                        "Property {} not available on {:?} (conflicts {:?})",
                        property.id,
                        iso_days(&dates),
                        conflicts
                    );
                }
                Err(err)
            }
        }
    }

    /// Moves a booking to a new status on behalf of `actor`.
    ///
    /// The renter may only cancel; the owner may make any allowed transition.
    /// Users who are neither do not see the booking at all.
    pub async fn update_status(
        &self,
        actor: UserId,
        id: BookingId,
        request: StatusUpdateRequest,
    ) -> Result<Booking, ServiceError> {
        let booking = self.get_for_user(actor, id).await?;
        let property = self.repository.property(booking.property).await?;

        let renter_cancelling = request.status == BookingStatus::Cancelled && booking.renter == actor;
        if !renter_cancelling && !property.is_owned_by(actor) {
            return Err(ServiceError::Forbidden(
                "You do not have permission to update this booking's status.".to_string(),
            ));
        }

        let updated = self
            .repository
            .update_status(id, request.status, request.cancellation_reason, Utc::now())
            .await?;
        info!(
            "Booking {} moved from {} to {} by user {}",
            id, booking.status, updated.status, actor
        );
        Ok(updated)
    }

    pub async fn list_for_user(&self, user: UserId) -> Result<Vec<Booking>, ServiceError> {
        Ok(self.repository.bookings_for_user(user).await?)
    }

    /// A booking, if `user` is its renter or the owner of its property.
    pub async fn get_for_user(&self, user: UserId, id: BookingId) -> Result<Booking, ServiceError> {
        let booking = self.repository.booking(id).await?;
        if booking.renter == user {
            return Ok(booking);
        }
        let property = self.repository.property(booking.property).await?;
        if property.is_owned_by(user) {
            Ok(booking)
        } else {
            Err(ServiceError::NotFound("Booking not found.".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::BookingRejection;
    use crate::clock::FixedClock;
    use crate::models::Property;
    use crate::server::repository::InMemoryRepository;

    const OWNER: UserId = UserId(1);
    const ALICE: UserId = UserId(2);
    const BOB: UserId = UserId(3);

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    async fn service() -> BookingService {
        let property = Property {
            id: PropertyId(1),
            owner: OWNER,
            title: "Beach house".into(),
            base_price: 15_000,
            cleaning_fee: 3_000,
            service_fee: 1_000,
            extra_guest_fee: 2_500,
            max_guests: 2,
        };
        let repo = InMemoryRepository::with_properties([property]).await;
        BookingService::new(Arc::new(repo), Arc::new(FixedClock(d(2024, 6, 1))))
    }

    fn request(start: NaiveDate, end: NaiveDate) -> CreateBookingRequest {
        CreateBookingRequest {
            property: PropertyId(1),
            start_date: Some(start),
            end_date: Some(end),
            guests_count: 2,
            special_requests: None,
        }
    }

    #[tokio::test]
    async fn test_create_prices_with_fees() {
        let svc = service().await;
        let mut req = request(d(2024, 6, 10), d(2024, 6, 12));
        req.guests_count = 3;
        let booking = svc.create_booking(ALICE, req).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.base_price_total, 30_000);
        assert_eq!(booking.extra_guest_fee, 5_000);
        assert_eq!(booking.total_price, 30_000 + 3_000 + 1_000 + 5_000);
    }

    #[tokio::test]
    async fn test_oversized_requests_rejected_before_pricing() {
        let svc = service().await;

        let mut req = request(d(2024, 6, 10), d(9999, 12, 31));
        req.guests_count = u32::MAX;
        let err = svc.create_booking(ALICE, req).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidField { ref field, .. } if field == "guests_count"));

        let err = svc
            .create_booking(ALICE, request(d(2024, 6, 10), d(9999, 12, 31)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidField { ref field, .. } if field == "end_date"));
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);

        let mut zero = request(d(2024, 6, 10), d(2024, 6, 12));
        zero.guests_count = 0;
        assert!(svc.create_booking(ALICE, zero).await.is_err());

        assert!(svc.list_for_user(ALICE).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_price_overflow_is_internal_error() {
        let property = Property {
            id: PropertyId(5),
            owner: OWNER,
            title: "Palace".into(),
            base_price: i64::MAX / 2,
            cleaning_fee: 0,
            service_fee: 0,
            extra_guest_fee: 0,
            max_guests: 2,
        };
        let repo = InMemoryRepository::with_properties([property]).await;
        let svc = BookingService::new(Arc::new(repo), Arc::new(FixedClock(d(2024, 6, 1))));

        let mut req = request(d(2024, 6, 10), d(2024, 6, 13));
        req.property = PropertyId(5);
        let err = svc.create_booking(ALICE, req).await.unwrap_err();
        assert!(matches!(err, ServiceError::Internal(_)));
        assert!(svc.list_for_user(ALICE).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_owner_cannot_book() {
        let svc = service().await;
        let err = svc
            .create_booking(OWNER, request(d(2024, 6, 10), d(2024, 6, 12)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Rejected(BookingRejection::OwnProperty)
        ));
    }

    #[tokio::test]
    async fn test_past_start_rejected() {
        let svc = service().await;
        let err = svc
            .create_booking(ALICE, request(d(2024, 5, 30), d(2024, 6, 2)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Rejected(BookingRejection::StartInPast { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_property_is_not_found() {
        let svc = service().await;
        let mut req = request(d(2024, 6, 10), d(2024, 6, 12));
        req.property = PropertyId(99);
        let err = svc.create_booking(ALICE, req).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_availability_parameters() {
        let svc = service().await;
        assert!(matches!(
            svc.availability(PropertyId(1), Some("2024-06-01"), None).await,
            Err(ServiceError::BadRequest(_))
        ));
        assert!(matches!(
            svc.availability(PropertyId(1), Some("06/01/2024"), Some("2024-06-30"))
                .await,
            Err(ServiceError::BadRequest(_))
        ));
        assert!(matches!(
            svc.availability(PropertyId(1), Some("2024-06-30"), Some("2024-06-01"))
                .await,
            Err(ServiceError::BadRequest(_))
        ));
        assert!(matches!(
            svc.availability(PropertyId(7), Some("2024-06-01"), Some("2024-06-30"))
                .await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_availability_reflects_bookings() {
        let svc = service().await;
        svc.create_booking(ALICE, request(d(2024, 6, 10), d(2024, 6, 12)))
            .await
            .unwrap();
        let report = svc
            .availability(PropertyId(1), Some("2024-06-01"), Some("2024-06-30"))
            .await
            .unwrap();
        assert!(!report.available);
        assert_eq!(report.unavailable_dates, vec![d(2024, 6, 10), d(2024, 6, 11)]);
    }

    #[tokio::test]
    async fn test_renter_may_only_cancel() {
        let svc = service().await;
        let booking = svc
            .create_booking(ALICE, request(d(2024, 6, 10), d(2024, 6, 12)))
            .await
            .unwrap();

        let confirm = StatusUpdateRequest {
            status: BookingStatus::Confirmed,
            cancellation_reason: None,
        };
        assert!(matches!(
            svc.update_status(ALICE, booking.id, confirm.clone()).await,
            Err(ServiceError::Forbidden(_))
        ));

        let confirmed = svc.update_status(OWNER, booking.id, confirm).await.unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);

        let cancelled = svc
            .update_status(
                ALICE,
                booking.id,
                StatusUpdateRequest {
                    status: BookingStatus::Cancelled,
                    cancellation_reason: Some("sick".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(cancelled.cancellation_reason.as_deref(), Some("sick"));
    }

    #[tokio::test]
    async fn test_strangers_do_not_see_bookings() {
        let svc = service().await;
        let booking = svc
            .create_booking(ALICE, request(d(2024, 6, 10), d(2024, 6, 12)))
            .await
            .unwrap();
        assert!(svc.get_for_user(OWNER, booking.id).await.is_ok());
        assert!(matches!(
            svc.get_for_user(BOB, booking.id).await,
            Err(ServiceError::NotFound(_))
        ));
        let cancel = StatusUpdateRequest {
            status: BookingStatus::Cancelled,
            cancellation_reason: None,
        };
        assert!(matches!(
            svc.update_status(BOB, booking.id, cancel).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_overlapping_requests_single_winner() {
        let svc = Arc::new(service().await);
        let mut handles = Vec::new();
        for renter in [ALICE, BOB, UserId(4), UserId(5)] {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move {
                svc.create_booking(renter, request(d(2024, 6, 10), d(2024, 6, 14)))
                    .await
            }));
        }

        let mut created = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(ServiceError::Conflict { .. }) => conflicts += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(conflicts, 3);
        assert_eq!(svc.property_bookings(PropertyId(1)).await.unwrap().len(), 1);
    }
}
