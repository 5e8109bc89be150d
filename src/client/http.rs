use super::retry::{Idempotency, RetryPolicy};
use super::traits::BookingSource;
use super::types::{ClientOptions, Session};
use super::ClientError;
use crate::availability::DateWindow;
use crate::models::{Booking, BookingId, PropertyId};
use crate::wire::{
    AvailabilityReport, CreateBookingRequest, Envelope, ErrorBody, ErrorEnvelope, HealthResponse,
    StatusUpdateRequest, USER_HEADER,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

/// reqwest client for the booking API
pub struct BookingApiClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl BookingApiClient {
    /// Create a client for the API at `base_url` with default options
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_options(ClientOptions::with_base_url(base_url))
    }

    /// Create a client with custom timeout, user agent and retry policy
    pub fn with_options(options: ClientOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: options.base_url.trim_end_matches('/').to_string(),
            retry: options.retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, session: &Session, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!("{} {}", method, url);

        let builder = self
            .client
            .request(method, url)
            .header(USER_HEADER, session.user().to_string());
        match session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await?;
        decode(response).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        operation: &str,
        session: &Session,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        self.retry
            .run(operation, Idempotency::Idempotent, move || {
                self.send(self.request(session, Method::GET, path).query(query))
            })
            .await
    }

    async fn write<B: Serialize, T: DeserializeOwned>(
        &self,
        operation: &str,
        session: &Session,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.retry
            .run(operation, Idempotency::NonIdempotent, move || {
                self.send(self.request(session, method.clone(), path).json(body))
            })
            .await
    }

    /// `POST /bookings/`. Never retried.
    pub async fn create_booking(
        &self,
        session: &Session,
        request: &CreateBookingRequest,
    ) -> Result<Booking, ClientError> {
        let booking: Booking = self
            .write("create booking", session, Method::POST, "bookings/", request)
            .await?;
        info!(
            "Created booking {} for property {} ({} to {})",
            booking.id, booking.property, booking.start_date, booking.end_date
        );
        Ok(booking)
    }

    /// `PATCH /bookings/{id}/status/`. Never retried.
    pub async fn update_status(
        &self,
        session: &Session,
        booking: BookingId,
        request: &StatusUpdateRequest,
    ) -> Result<Booking, ClientError> {
        let path = format!("bookings/{}/status/", booking);
        self.write("update booking status", session, Method::PATCH, &path, request)
            .await
    }

    /// Bookings the session user made or received as a leaser
    pub async fn list_bookings(&self, session: &Session) -> Result<Vec<Booking>, ClientError> {
        self.get("list bookings", session, "bookings/", &[]).await
    }

    pub async fn get_booking(
        &self,
        session: &Session,
        booking: BookingId,
    ) -> Result<Booking, ClientError> {
        let path = format!("bookings/{}/", booking);
        self.get("get booking", session, &path, &[]).await
    }

    pub async fn health(&self, session: &Session) -> Result<HealthResponse, ClientError> {
        self.get("health check", session, "health", &[]).await
    }
}

#[async_trait]
impl BookingSource for BookingApiClient {
    async fn fetch_availability(
        &self,
        session: &Session,
        property: PropertyId,
        window: DateWindow,
    ) -> Result<AvailabilityReport, ClientError> {
        let path = format!("properties/{}/availability/", property);
        let query = [
            ("start_date", window.start.format("%Y-%m-%d").to_string()),
            ("end_date", window.end.format("%Y-%m-%d").to_string()),
        ];
        self.get("fetch availability", session, &path, &query).await
    }

    async fn fetch_property_bookings(
        &self,
        session: &Session,
        property: PropertyId,
    ) -> Result<Vec<Booking>, ClientError> {
        let path = format!("properties/{}/bookings/", property);
        self.get("fetch property bookings", session, &path, &[]).await
    }

    fn source_name(&self) -> &'static str {
        "booking-api"
    }
}

/// Turns a response into its payload or a classified error.
///
/// Success bodies must be `{"data": ..}`; failures are read as the error
/// envelope when possible and as plain text otherwise.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        let envelope: Envelope<T> = response.json().await?;
        return Ok(envelope.data);
    }

    let text = response.text().await.unwrap_or_default();
    let body = match serde_json::from_str::<ErrorEnvelope>(&text) {
        Ok(envelope) => envelope.error,
        Err(_) => ErrorBody::new(format!("HTTP_{}", status.as_u16()), text),
    };

    if status.is_server_error() {
        warn!("Booking API returned status: {}", status);
    }
    Err(classify(status, body))
}

fn classify(status: StatusCode, body: ErrorBody) -> ClientError {
    let code = status.as_u16();
    match status {
        StatusCode::NOT_FOUND => ClientError::NotFound(body.message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Unauthorized {
            status: code,
            message: body.message,
        },
        StatusCode::TOO_MANY_REQUESTS => ClientError::Server {
            status: code,
            message: body.message,
        },
        s if s.is_server_error() => ClientError::Server {
            status: code,
            message: body.message,
        },
        _ => ClientError::Rejected { status: code, body },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_statuses() {
        let body = || ErrorBody::new("X", "msg");
        assert!(matches!(
            classify(StatusCode::NOT_FOUND, body()),
            ClientError::NotFound(_)
        ));
        assert!(matches!(
            classify(StatusCode::FORBIDDEN, body()),
            ClientError::Unauthorized { status: 403, .. }
        ));
        assert!(matches!(
            classify(StatusCode::BAD_GATEWAY, body()),
            ClientError::Server { status: 502, .. }
        ));
        assert!(matches!(
            classify(StatusCode::TOO_MANY_REQUESTS, body()),
            ClientError::Server { status: 429, .. }
        ));
        let conflict = classify(StatusCode::CONFLICT, body());
        assert!(conflict.is_conflict());
        assert_eq!(conflict.rejection().map(|b| b.code.as_str()), Some("X"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = BookingApiClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
    }
}
