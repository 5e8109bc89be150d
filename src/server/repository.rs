//! Booking storage.
//!
//! The repository owns the one piece of shared mutable state, the booking
//! table. The overlap check and the insert of a new booking happen under a
//! single write lock, so two requests for the same nights cannot both land.

use crate::availability::StayRange;
use crate::availability::dates::booking_range;
use crate::models::{Booking, BookingId, BookingStatus, Property, PropertyId, TransitionError, UserId};
use crate::pricing::PriceBreakdown;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("property {0} not found")]
    PropertyNotFound(PropertyId),

    #[error("booking {0} not found")]
    BookingNotFound(BookingId),

    #[error("dates overlap {} existing booking(s)", .conflicts.len())]
    Overlap {
        conflicts: Vec<BookingId>,
        dates: Vec<NaiveDate>,
    },

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// A validated booking waiting to be stored.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub property: PropertyId,
    pub renter: UserId,
    pub range: StayRange,
    pub guests_count: u32,
    pub price: PriceBreakdown,
    pub special_requests: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn upsert_property(&self, property: Property) -> RepositoryResult<()>;

    async fn property(&self, id: PropertyId) -> RepositoryResult<Property>;

    async fn booking(&self, id: BookingId) -> RepositoryResult<Booking>;

    /// All bookings of a property ordered by start date, any status
    async fn bookings_for_property(&self, id: PropertyId) -> RepositoryResult<Vec<Booking>>;

    /// Bookings the user made, or received as owner of the property
    async fn bookings_for_user(&self, user: UserId) -> RepositoryResult<Vec<Booking>>;

    /// Stores `new` as `pending` unless a date-blocking booking overlaps it.
    async fn insert_if_available(&self, new: NewBooking) -> RepositoryResult<Booking>;

    /// Applies a status transition, failing if the current state forbids it.
    async fn update_status(
        &self,
        id: BookingId,
        next: BookingStatus,
        cancellation_reason: Option<String>,
        at: DateTime<Utc>,
    ) -> RepositoryResult<Booking>;
}

#[derive(Debug, Default)]
struct Tables {
    properties: HashMap<PropertyId, Property>,
    bookings: BTreeMap<BookingId, Booking>,
    last_id: i64,
}

/// In-process repository for development and tests.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_properties(properties: impl IntoIterator<Item = Property>) -> Self {
        let repo = Self::new();
        {
            let mut tables = repo.tables.write().await;
            for property in properties {
                tables.properties.insert(property.id, property);
            }
        }
        repo
    }
}

fn sorted_by_start(mut bookings: Vec<Booking>) -> Vec<Booking> {
    bookings.sort_by_key(|b| (b.start_date, b.id));
    bookings
}

#[async_trait]
impl BookingRepository for InMemoryRepository {
    async fn upsert_property(&self, property: Property) -> RepositoryResult<()> {
        self.tables
            .write()
            .await
            .properties
            .insert(property.id, property);
        Ok(())
    }

    async fn property(&self, id: PropertyId) -> RepositoryResult<Property> {
        self.tables
            .read()
            .await
            .properties
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::PropertyNotFound(id))
    }

    async fn booking(&self, id: BookingId) -> RepositoryResult<Booking> {
        self.tables
            .read()
            .await
            .bookings
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::BookingNotFound(id))
    }

    async fn bookings_for_property(&self, id: PropertyId) -> RepositoryResult<Vec<Booking>> {
        let tables = self.tables.read().await;
        if !tables.properties.contains_key(&id) {
            return Err(RepositoryError::PropertyNotFound(id));
        }
        let bookings = tables
            .bookings
            .values()
            .filter(|b| b.property == id)
            .cloned()
            .collect();
        Ok(sorted_by_start(bookings))
    }

    async fn bookings_for_user(&self, user: UserId) -> RepositoryResult<Vec<Booking>> {
        let tables = self.tables.read().await;
        let bookings = tables
            .bookings
            .values()
            .filter(|b| {
                b.renter == user
                    || tables
                        .properties
                        .get(&b.property)
                        .is_some_and(|p| p.is_owned_by(user))
            })
            .cloned()
            .collect();
        Ok(sorted_by_start(bookings))
    }

    async fn insert_if_available(&self, new: NewBooking) -> RepositoryResult<Booking> {
        let mut tables = self.tables.write().await;
        if !tables.properties.contains_key(&new.property) {
            return Err(RepositoryError::PropertyNotFound(new.property));
        }

        let mut conflicts = Vec::new();
        let mut dates = BTreeSet::new();
        for existing in tables
            .bookings
            .values()
            .filter(|b| b.property == new.property && b.blocks_dates())
        {
            let Some(range) = booking_range(existing) else {
                continue;
            };
            if range.overlaps(&new.range) {
                conflicts.push(existing.id);
                dates.extend(new.range.days().filter(|d| range.contains(*d)));
            }
        }
        if !conflicts.is_empty() {
            debug!(
                "Refusing booking of property {}: overlaps {:?}",
                new.property, conflicts
            );
            return Err(RepositoryError::Overlap {
                conflicts,
                dates: dates.into_iter().collect(),
            });
        }

        tables.last_id += 1;
        let booking = Booking {
            id: BookingId(tables.last_id),
            property: new.property,
            renter: new.renter,
            start_date: new.range.start,
            end_date: new.range.end,
            status: BookingStatus::Pending,
            guests_count: new.guests_count,
            total_price: new.price.total_price,
            base_price_total: new.price.base_price_total,
            cleaning_fee: new.price.cleaning_fee,
            service_fee: new.price.service_fee,
            extra_guest_fee: new.price.extra_guest_fee,
            special_requests: new.special_requests,
            cancellation_reason: None,
            created_at: new.created_at,
            updated_at: new.created_at,
        };
        tables.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn update_status(
        &self,
        id: BookingId,
        next: BookingStatus,
        cancellation_reason: Option<String>,
        at: DateTime<Utc>,
    ) -> RepositoryResult<Booking> {
        let mut tables = self.tables.write().await;
        let booking = tables
            .bookings
            .get_mut(&id)
            .ok_or(RepositoryError::BookingNotFound(id))?;
        booking.transition(next, cancellation_reason, at)?;
        Ok(booking.clone())
    }
}
