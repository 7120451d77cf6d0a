//! Authentication: loopback OAuth token capture and the persisted token.

mod capture;
mod error;
mod token;

use std::fmt;

pub use capture::{CaptureServer, authenticate};
pub use error::{CaptureError, TokenError};
pub use token::TokenStore;

/// Opaque OAuth access token.
///
/// Never expires from the relay's point of view; a rejected token shows up
/// as an unauthorized API status.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for the `Authorization` header and the token file.
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let token = AccessToken::new("very-secret");
        let debug = format!("{token:?}");
        assert!(!debug.contains("very-secret"));
        assert_eq!(token.secret(), "very-secret");
    }
}
