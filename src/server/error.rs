//! HTTP error handling and response types.

use super::repository::RepositoryError;
use crate::availability::BookingRejection;
use crate::models::{BookingId, TransitionError};
use crate::wire::{ErrorBody, ErrorEnvelope};
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use thiserror::Error;
use tracing::error;

/// Business-level failure of a booking operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A booking rule failed
    #[error("{0}")]
    Rejected(BookingRejection),

    /// Another booking holds some of the requested nights
    #[error("Property is not available for these dates")]
    Conflict {
        dates: Vec<NaiveDate>,
        conflicts: Vec<BookingId>,
    },

    #[error("{0}")]
    BadRequest(String),

    /// A single request field is malformed or out of bounds
    #[error("{message}")]
    InvalidField { field: String, message: String },

    #[error("Authentication credentials were not provided.")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Rejected(BookingRejection::DatesUnavailable { .. }) => {
                StatusCode::CONFLICT
            }
            ServiceError::Rejected(_)
            | ServiceError::BadRequest(_)
            | ServiceError::InvalidField { .. }
            | ServiceError::Transition(_) => StatusCode::BAD_REQUEST,
            ServiceError::Conflict { .. } => StatusCode::CONFLICT,
            ServiceError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        let message = self.to_string();
        match self {
            ServiceError::Rejected(rejection) => {
                let body = ErrorBody::new(rejection.code(), &message);
                match rejection.field() {
                    Some(field) => body.with_field(field, message),
                    None => body,
                }
            }
            ServiceError::Conflict { conflicts, .. } => {
                ErrorBody::new("DATES_UNAVAILABLE", message).with_conflicts(conflicts.clone())
            }
            ServiceError::BadRequest(_) => ErrorBody::new("BAD_REQUEST", message),
            ServiceError::InvalidField { field, .. } => {
                ErrorBody::new("INVALID_FIELD", &message).with_field(field, message)
            }
            ServiceError::Unauthenticated => ErrorBody::new("UNAUTHENTICATED", message),
            ServiceError::Forbidden(_) => ErrorBody::new("FORBIDDEN", message),
            ServiceError::NotFound(_) => ErrorBody::new("NOT_FOUND", message),
            ServiceError::Transition(_) => {
                ErrorBody::new("INVALID_TRANSITION", &message).with_field("status", message)
            }
            ServiceError::Internal(_) => ErrorBody::new("INTERNAL_ERROR", message),
        }
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::PropertyNotFound(_) => {
                ServiceError::NotFound("Property not found.".to_string())
            }
            RepositoryError::BookingNotFound(_) => {
                ServiceError::NotFound("Booking not found.".to_string())
            }
            RepositoryError::Overlap { conflicts, dates } => {
                ServiceError::Conflict { dates, conflicts }
            }
            RepositoryError::Transition(e) => ServiceError::Transition(e),
        }
    }
}

impl From<BookingRejection> for ServiceError {
    fn from(rejection: BookingRejection) -> Self {
        ServiceError::Rejected(rejection)
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        let text = rejection.body_text();
        match rejection {
            JsonRejection::JsonDataError(_) => match offending_field(&text) {
                Some((field, reason)) => ServiceError::InvalidField {
                    message: format!("Invalid value for {}: {}", field, reason),
                    field,
                },
                None => ServiceError::BadRequest(text),
            },
            _ => ServiceError::BadRequest(text),
        }
    }
}

impl From<PathRejection> for ServiceError {
    fn from(rejection: PathRejection) -> Self {
        ServiceError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ServiceError {
    fn from(rejection: QueryRejection) -> Self {
        ServiceError::BadRequest(rejection.body_text())
    }
}

/// Splits `"...target type: start_date: input is out of range"` into the
/// field path and serde's reason. Root-level errors carry no path.
fn offending_field(text: &str) -> Option<(String, String)> {
    let (_, detail) = text.split_once("target type: ")?;
    let (path, reason) = detail.split_once(": ")?;
    let is_path = !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'));
    is_path.then(|| (path.to_string(), reason.to_string()))
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(ErrorEnvelope { error: self.to_body() })).into_response()
    }
}
