//! Application state for the HTTP server.

use super::repository::BookingRepository;
use super::service::BookingService;
use crate::clock::Clock;
use std::sync::Arc;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<BookingService>,
}

impl AppState {
    pub fn new(repository: Arc<dyn BookingRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            bookings: Arc::new(BookingService::new(repository, clock)),
        }
    }
}
