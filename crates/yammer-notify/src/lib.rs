//! Desktop notifications for new Yammer messages.
//!
//! The crate is split along the flow of a session:
//!
//! - `auth`: loopback OAuth token capture and the persisted token file
//! - `api`: authenticated gateway to the Yammer REST API
//! - `directory`: memoized user profiles and spooled avatar files
//! - `feed`: per-feed cursors and incremental message retrieval
//! - `poller`: the polling loop that ties the above to a notification sink
//! - `notify`: notification sinks (desktop or log only)

pub mod api;
pub mod auth;
pub mod config;
pub mod directory;
pub mod feed;
pub mod notify;
pub mod poller;
pub mod text;

pub use api::{ApiClient, ApiError, ApiResult};
pub use auth::{AccessToken, CaptureError, CaptureServer, TokenError, TokenStore, authenticate};
pub use config::AppConfig;
pub use directory::{DirectoryError, Identity, IdentityDirectory};
pub use feed::{FeedId, FeedSync};
pub use notify::NotificationSink;
pub use poller::Poller;
