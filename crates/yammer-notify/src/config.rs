use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_API_URL: &str = "https://www.yammer.com/api/v1/";
pub const DEFAULT_AUTHORIZE_URL: &str = "https://www.yammer.com/dialog/oauth";

/// Top-level configuration, loaded from `config.toml` and the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// OAuth client id registered with Yammer.
    pub client_id: String,
    pub api: ApiConfig,
    pub oauth: OAuthConfig,
    pub poll: PollConfig,
    pub paths: PathsConfig,
    pub logging: LoggingConfig,
}

/// Remote API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every relative API path is resolved against.
    pub base_url: String,
    pub user_agent: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            user_agent: "yammer-notify".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Loopback OAuth settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Authorization endpoint the browser is sent to.
    pub authorize_url: String,
    /// Host the capture server binds to. The port is always picked by the OS.
    pub bind_host: String,
    /// How long in-flight responses get to flush once the handshake is done.
    pub shutdown_grace_secs: u64,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            bind_host: "127.0.0.1".to_string(),
            shutdown_grace_secs: 5,
        }
    }
}

impl OAuthConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Polling loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Pause before each feed check, also used as the startup retry delay.
    pub interval_secs: u64,
    /// Raise desktop notifications (otherwise messages are only logged).
    pub notifications: bool,
    /// Column width for feed and sender names in the message log.
    pub name_width: usize,
    /// Column width for message bodies in the message log.
    pub body_width: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            notifications: true,
            name_width: 20,
            body_width: 60,
        }
    }
}

/// Lower bound for the poll interval; `0` would poll back to back.
pub const MIN_POLL_INTERVAL_SECS: u64 = 1;

impl PollConfig {
    /// Pause before each feed check, never below [`MIN_POLL_INTERVAL_SECS`].
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(MIN_POLL_INTERVAL_SECS))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Where the access token is persisted.
    pub token_file: String,
    /// Parent directory for the scratch directory. Empty means the system temp dir.
    pub scratch_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            token_file: "~/.yammer-notify-token".to_string(),
            scratch_dir: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
