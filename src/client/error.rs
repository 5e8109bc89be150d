use crate::wire::ErrorBody;
use thiserror::Error;

/// Failure talking to the booking API.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("not found: {0}")]
    NotFound(String),

    /// 401/403. Often transient while a token refreshes.
    #[error("not authorized ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    /// The server refused the request with a structured reason.
    #[error("rejected ({status}): {}", .body.message)]
    Rejected { status: u16, body: ErrorBody },

    /// 5xx or 429
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ClientError {
    /// The server's own verdict on a request, if this is one.
    pub fn rejection(&self) -> Option<&ErrorBody> {
        match self {
            ClientError::Rejected { body, .. } => Some(body),
            _ => None,
        }
    }

    /// The requested dates were taken by the time the server checked.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ClientError::Rejected { status: 409, .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::NotFound(_) => Some(404),
            ClientError::Unauthorized { status, .. }
            | ClientError::Rejected { status, .. }
            | ClientError::Server { status, .. } => Some(*status),
            ClientError::Transport(_) | ClientError::Decode(_) => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}
