//! Price breakdown of a stay.

use crate::models::Property;
use serde::{Deserialize, Serialize};

/// All amounts in minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub base_price_total: i64,
    pub cleaning_fee: i64,
    pub service_fee: i64,
    pub extra_guest_fee: i64,
    pub total_price: i64,
}

impl PriceBreakdown {
    /// Nightly rate times nights, plus flat fees, plus a per-night surcharge
    /// for every guest above the property's limit.
    ///
    /// `None` if any amount does not fit in an `i64`.
    pub fn quote(property: &Property, nights: i64, guests: u32) -> Option<Self> {
        let base_price_total = property.base_price.checked_mul(nights)?;
        let extra_guests = i64::from(guests.saturating_sub(property.max_guests));
        let extra_guest_fee = property
            .extra_guest_fee
            .checked_mul(extra_guests)?
            .checked_mul(nights)?;
        let total_price = base_price_total
            .checked_add(property.cleaning_fee)?
            .checked_add(property.service_fee)?
            .checked_add(extra_guest_fee)?;

        Some(Self {
            base_price_total,
            cleaning_fee: property.cleaning_fee,
            service_fee: property.service_fee,
            extra_guest_fee,
            total_price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PropertyId, UserId};
    use chrono::NaiveDate;

    fn property() -> Property {
        Property {
            id: PropertyId(1),
            owner: UserId(1),
            title: "Villa".into(),
            base_price: 20_000,
            cleaning_fee: 5_000,
            service_fee: 1_500,
            extra_guest_fee: 2_000,
            max_guests: 4,
        }
    }

    #[test]
    fn test_quote_within_guest_limit() {
        let quote = PriceBreakdown::quote(&property(), 3, 4).unwrap();
        assert_eq!(quote.base_price_total, 60_000);
        assert_eq!(quote.extra_guest_fee, 0);
        assert_eq!(quote.total_price, 66_500);
    }

    #[test]
    fn test_quote_with_extra_guests() {
        let quote = PriceBreakdown::quote(&property(), 2, 6).unwrap();
        assert_eq!(quote.extra_guest_fee, 2_000 * 2 * 2);
        assert_eq!(quote.total_price, 40_000 + 5_000 + 1_500 + 8_000);
    }

    #[test]
    fn test_fee_free_quote_is_nightly_total() {
        let mut p = property();
        p.cleaning_fee = 0;
        p.service_fee = 0;
        let quote = PriceBreakdown::quote(&p, 5, 1).unwrap();
        assert_eq!(quote.total_price, 5 * p.base_price);
    }

    #[test]
    fn test_overflow_is_none() {
        let nights = (NaiveDate::MAX - NaiveDate::MIN).num_days();
        assert!(PriceBreakdown::quote(&property(), 3, u32::MAX).is_some());
        assert!(PriceBreakdown::quote(&property(), nights, u32::MAX).is_none());

        let mut p = property();
        p.base_price = i64::MAX;
        p.cleaning_fee = 1;
        assert!(PriceBreakdown::quote(&p, 1, 1).is_none());
    }
}
