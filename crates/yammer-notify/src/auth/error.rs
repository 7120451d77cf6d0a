//! Authentication error types.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors from the loopback token capture.
///
/// All of them end the login attempt; the port and the browser flow are
/// single use.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Failed to start capture server: {0}")]
    Bind(#[source] io::Error),

    #[error("Capture server failed: {0}")]
    Serve(#[source] io::Error),

    #[error("Invalid authorization URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    /// `/token` was called without a `token` query parameter.
    #[error("Browser request carried no token")]
    MissingToken,

    /// The server went away before both browser signals arrived.
    #[error("Capture server stopped before the handshake completed")]
    Abandoned,

    #[error("Capture server did not shut down within {0:?}")]
    ShutdownTimeout(Duration),
}

/// Errors from the persisted token file.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("{} missing, use 'login'", .0.display())]
    Missing(PathBuf),

    #[error("{} is empty, use 'login'", .0.display())]
    Empty(PathBuf),

    #[error("Failed to access token file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
