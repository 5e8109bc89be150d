//! Authoritative booking API served with axum.
//!
//! ```text
//! handlers  (request parsing, envelopes)
//!    │
//! service   (booking rules, permissions, pricing)
//!    │
//! repository (booking table, atomic check-and-insert)
//! ```

pub mod error;
pub mod handlers;
pub mod repository;
pub mod router;
pub mod service;
pub mod state;

pub use error::ServiceError;
pub use repository::{BookingRepository, InMemoryRepository, RepositoryError};
pub use router::create_router;
pub use service::BookingService;
pub use state::AppState;
