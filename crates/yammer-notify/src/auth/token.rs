//! Persisted access token.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use super::AccessToken;
use super::error::TokenError;

/// Single-file token store, readable by the owning user only.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the token. Surrounding whitespace is ignored.
    pub fn load(&self) -> Result<AccessToken, TokenError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                TokenError::Missing(self.path.clone())
            } else {
                self.io_error(source)
            }
        })?;

        let token = raw.trim();
        if token.is_empty() {
            return Err(TokenError::Empty(self.path.clone()));
        }
        Ok(AccessToken::new(token))
    }

    /// Write the token, replacing any previous one.
    pub fn save(&self, token: &AccessToken) -> Result<(), TokenError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let mut file = open_private(&self.path).map_err(|e| self.io_error(e))?;
        file.write_all(token.secret().as_bytes())
            .map_err(|e| self.io_error(e))?;

        info!("token written to {}", self.path.display());
        Ok(())
    }

    fn io_error(&self, source: io::Error) -> TokenError {
        TokenError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies on creation
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
