//! Date-range availability and booking conflict resolution.

pub mod dates;
pub mod resolver;
pub mod validate;

pub use dates::{DateWindow, StayRange};
pub use resolver::{AvailabilityOrigin, AvailabilityResolver, UnavailableDates};
pub use validate::{validate_booking_request, AcceptedStay, BookingRejection};
