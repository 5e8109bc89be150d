//! HTTP handlers for the booking API.
//!
//! Each handler unwraps the request, delegates to [`BookingService`] and
//! wraps the answer in the response envelope.
//!
//! [`BookingService`]: super::service::BookingService

use super::error::ServiceError;
use super::state::AppState;
use crate::models::{Booking, BookingId, PropertyId, UserId};
use crate::wire::{
    AvailabilityQuery, AvailabilityReport, CreateBookingRequest, Envelope, HealthResponse,
    StatusUpdateRequest, USER_HEADER,
};
use axum::{
    extract::{FromRequest, FromRequestParts, State},
    http::{request::Parts, StatusCode},
    Json,
};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<Envelope<T>>, ServiceError>;

fn ok<T>(data: T) -> HandlerResult<T> {
    Ok(Json(Envelope::new(data)))
}

/// JSON body whose decoding failures become error envelopes.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ServiceError))]
pub struct ApiJson<T>(pub T);

/// Path parameters, rejected through [`ServiceError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ServiceError))]
pub struct ApiPath<T>(pub T);

/// Query string, rejected through [`ServiceError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ServiceError))]
pub struct ApiQuery<T>(pub T);

/// The authenticated caller, taken from the `X-User-Id` header.
#[derive(Debug, Clone, Copy)]
pub struct Actor(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok())
            .map(|id| Actor(UserId(id)))
            .ok_or(ServiceError::Unauthenticated)
    }
}

/// GET /health
pub async fn health_check() -> HandlerResult<HealthResponse> {
    ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /properties/{id}/availability/?start_date&end_date
pub async fn get_availability(
    State(state): State<AppState>,
    ApiPath(property): ApiPath<i64>,
    ApiQuery(query): ApiQuery<AvailabilityQuery>,
) -> HandlerResult<AvailabilityReport> {
    let report = state
        .bookings
        .availability(
            PropertyId(property),
            query.start_date.as_deref(),
            query.end_date.as_deref(),
        )
        .await?;
    ok(report)
}

/// GET /properties/{id}/bookings/
pub async fn list_property_bookings(
    State(state): State<AppState>,
    ApiPath(property): ApiPath<i64>,
) -> HandlerResult<Vec<Booking>> {
    ok(state.bookings.property_bookings(PropertyId(property)).await?)
}

/// GET /bookings/
pub async fn list_bookings(
    State(state): State<AppState>,
    Actor(user): Actor,
) -> HandlerResult<Vec<Booking>> {
    ok(state.bookings.list_for_user(user).await?)
}

/// POST /bookings/
pub async fn create_booking(
    State(state): State<AppState>,
    Actor(user): Actor,
    ApiJson(request): ApiJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Envelope<Booking>>), ServiceError> {
    let booking = state.bookings.create_booking(user, request).await?;
    Ok((StatusCode::CREATED, Json(Envelope::new(booking))))
}

/// GET /bookings/{id}/
pub async fn get_booking(
    State(state): State<AppState>,
    Actor(user): Actor,
    ApiPath(id): ApiPath<i64>,
) -> HandlerResult<Booking> {
    ok(state.bookings.get_for_user(user, BookingId(id)).await?)
}

/// PATCH /bookings/{id}/status/
pub async fn update_booking_status(
    State(state): State<AppState>,
    Actor(user): Actor,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<StatusUpdateRequest>,
) -> HandlerResult<Booking> {
    ok(state
        .bookings
        .update_status(user, BookingId(id), request)
        .await?)
}
