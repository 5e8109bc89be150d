use super::retry::RetryPolicy;
use crate::models::UserId;
use std::time::Duration;

/// Connection parameters for the booking API client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// API root, e.g. `http://localhost:8080`
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    pub user_agent: String,
    /// Applied to reads only
    pub retry: RetryPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(30),
            user_agent: concat!("rentify-bookings/", env!("CARGO_PKG_VERSION")).to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientOptions {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}

/// Who is calling, passed explicitly to every request.
///
/// Owned by the caller for as long as the login lasts; the client keeps no
/// identity of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user: UserId,
    token: Option<String>,
}

impl Session {
    pub fn new(user: UserId) -> Self {
        Self { user, token: None }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn user(&self) -> UserId {
        self.user
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}
