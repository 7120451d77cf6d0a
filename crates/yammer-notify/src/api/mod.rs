//! Yammer REST API gateway.
//!
//! Builds authenticated requests against the API base URL and decodes JSON
//! responses. No retries happen here; callers retry at poll granularity.

mod client;
mod error;
pub mod types;

pub use client::ApiClient;
pub use error::{ApiError, ApiResult};
pub use types::*;
