pub mod error;
pub mod flow;
pub mod http;
pub mod retry;
pub mod traits;
pub mod types;

pub use error::ClientError;
pub use flow::{submit_booking, BookingDraft, SubmitOutcome};
pub use http::BookingApiClient;
pub use retry::{Idempotency, RetryPolicy, Retryable};
pub use traits::BookingSource;
pub use types::{ClientOptions, Session};
