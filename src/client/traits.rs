use super::{ClientError, Session};
use crate::availability::DateWindow;
use crate::models::{Booking, PropertyId};
use crate::wire::AvailabilityReport;
use async_trait::async_trait;

/// Read side of the booking API that availability is computed from.
/// Lets the resolver run against the HTTP client or an in-memory stand-in.
#[async_trait]
pub trait BookingSource: Send + Sync {
    /// Precomputed unavailable days of a property within `window`
    async fn fetch_availability(
        &self,
        session: &Session,
        property: PropertyId,
        window: DateWindow,
    ) -> Result<AvailabilityReport, ClientError>;

    /// Every booking of a property, whatever its status
    async fn fetch_property_bookings(
        &self,
        session: &Session,
        property: PropertyId,
    ) -> Result<Vec<Booking>, ClientError>;

    /// Get the name of the source, for logs
    fn source_name(&self) -> &'static str;
}
