//! Notification sinks.

use tracing::{debug, info};

/// Icon name used when no avatar file is available.
pub const FALLBACK_ICON: &str = "mail-message-new";

/// Receives one call per delivered message. Fire and forget.
pub trait NotificationSink {
    fn notify(&self, summary: &str, body: &str, icon: &str);

    /// Called with `true` when a feed check starts and `false` when it ends,
    /// e.g. to switch a tray icon.
    fn set_polling(&self, _polling: bool) {}
}

/// Desktop notifications through the session's notification daemon.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    app_name: String,
}

impl DesktopNotifier {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }
}

impl NotificationSink for DesktopNotifier {
    fn notify(&self, summary: &str, body: &str, icon: &str) {
        #[cfg(feature = "desktop-notifications")]
        {
            use notify_rust::Notification;

            if let Err(e) = Notification::new()
                .appname(&self.app_name)
                .summary(summary)
                .body(body)
                .icon(icon)
                .show()
            {
                tracing::warn!("Failed to show desktop notification: {}", e);
            }
        }

        #[cfg(not(feature = "desktop-notifications"))]
        {
            debug!(
                "Desktop notifications disabled, not showing {:?} for {} (icon {})",
                summary, self.app_name, icon
            );
            let _ = body;
        }
    }

    fn set_polling(&self, polling: bool) {
        debug!(polling, "poll state");
    }
}

/// Only logs; used with `--no-notify`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, summary: &str, body: &str, icon: &str) {
        info!(icon, "{}: {}", summary, body);
    }
}

impl<T: NotificationSink + ?Sized> NotificationSink for Box<T> {
    fn notify(&self, summary: &str, body: &str, icon: &str) {
        (**self).notify(summary, body, icon);
    }

    fn set_polling(&self, polling: bool) {
        (**self).set_polling(polling);
    }
}
