use serde::{Deserialize, Serialize};
use std::fmt;

pub mod booking;

pub use booking::{Booking, BookingStatus, TransitionError};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn value(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of a listed property
    PropertyId
);
id_type!(
    /// Identifier of a marketplace user (leaser or renter)
    UserId
);
id_type!(
    /// Identifier of a booking
    BookingId
);

/// Listed property as seen by the booking logic.
///
/// Prices are in minor currency units (cents). The booking code only reads
/// properties; listing management lives elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Property {
    pub id: PropertyId,
    /// The leaser who owns the listing
    pub owner: UserId,
    pub title: String,
    /// Price per night
    pub base_price: i64,
    #[serde(default)]
    pub cleaning_fee: i64,
    #[serde(default)]
    pub service_fee: i64,
    /// Charged per extra guest per night above `max_guests`
    #[serde(default)]
    pub extra_guest_fee: i64,
    #[serde(default = "default_max_guests")]
    pub max_guests: u32,
}

fn default_max_guests() -> u32 {
    2
}

impl Property {
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner == user
    }
}
