//! Booking availability and conflict resolution for the Rentify marketplace.
//!
//! The crate has two halves sharing one domain model:
//!
//! - [`client`]: typed API client, retry policy and the booking submission flow
//! - [`server`]: the authoritative booking API (axum), which owns the
//!   overlap check
//!
//! Both sides compute blocked days through [`availability`], so the
//! renter-facing calendar and the server agree on what "unavailable" means.

pub mod availability;
pub mod client;
pub mod clock;
pub mod config;
pub mod models;
pub mod pricing;
pub mod server;
pub mod wire;
