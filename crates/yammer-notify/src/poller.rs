//! The polling loop.
//!
//! Resolves the current user once (retrying forever), derives the feed list
//! from its groups and then checks one feed per interval, forever. Every new
//! message is logged and handed to the notification sink before the next
//! feed is checked.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, Message};
use crate::config::PollConfig;
use crate::directory::{DirectoryError, IdentityDirectory};
use crate::feed::{FeedId, FeedSync};
use crate::notify::{FALLBACK_ICON, NotificationSink};
use crate::text::{ellipsize, single_line};

/// A feed to watch, with the name used in logs and notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub id: FeedId,
    pub name: String,
}

pub struct Poller<N> {
    directory: IdentityDirectory,
    feeds: FeedSync,
    sink: N,
    config: PollConfig,
}

impl<N: NotificationSink> Poller<N> {
    pub fn new(
        client: ApiClient,
        scratch_dir: impl Into<PathBuf>,
        sink: N,
        config: PollConfig,
    ) -> Self {
        Self {
            directory: IdentityDirectory::new(client.clone(), scratch_dir),
            feeds: FeedSync::new(client),
            sink,
            config,
        }
    }

    pub fn feeds(&self) -> &FeedSync {
        &self.feeds
    }

    /// Poll forever.
    pub async fn run(&mut self) {
        let feeds = self.wait_for_feeds().await;
        info!(
            "watching {} feed(s): {}",
            feeds.len(),
            feeds
                .iter()
                .map(|f| f.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        loop {
            for feed in &feeds {
                sleep(self.config.interval()).await;
                self.poll_feed(feed).await;
            }
        }
    }

    /// Feeds of the current user: its groups, then private messages.
    pub async fn discover_feeds(&mut self) -> Result<Vec<Feed>, DirectoryError> {
        let user = self.directory.current_user().await?;
        info!("logged in as {} ({})", user.display_name(), user.id());

        Ok(user
            .groups()
            .iter()
            .map(|group| Feed {
                id: FeedId(group.id),
                name: group.full_name.clone(),
            })
            .collect())
    }

    /// Like [`Self::discover_feeds`], but retries until it succeeds.
    async fn wait_for_feeds(&mut self) -> Vec<Feed> {
        loop {
            match self.discover_feeds().await {
                Ok(feeds) => return feeds,
                Err(err) => {
                    warn!(
                        "failed to resolve current user: {}; retrying in {:?}",
                        err,
                        self.config.interval()
                    );
                    sleep(self.config.interval()).await;
                }
            }
        }
    }

    /// Check one feed and notify about its new messages.
    ///
    /// Returns the number of notifications sent. Failures are logged and
    /// leave the feed to the next cycle.
    pub async fn poll_feed(&mut self, feed: &Feed) -> usize {
        self.sink.set_polling(true);

        let result = self.feeds.get_new_messages(feed.id).await;
        let delivered = match result {
            Ok(messages) => {
                let mut delivered = 0;
                for message in &messages {
                    if self.deliver(feed, message).await {
                        delivered += 1;
                    }
                }
                delivered
            }
            Err(err) if err.is_unauthorized() => {
                warn!("{}: access token rejected ({}), try 'login'", feed.name, err);
                0
            }
            Err(err) => {
                warn!("{}: failed to get new messages: {}", feed.name, err);
                0
            }
        };

        self.sink.set_polling(false);
        delivered
    }

    async fn deliver(&mut self, feed: &Feed, message: &Arc<Message>) -> bool {
        let sender = match self.directory.get_identity(message.sender_id).await {
            Ok(sender) => sender,
            Err(err) => {
                warn!(
                    "{}: skipping message {}, sender unavailable: {}",
                    feed.name, message.id, err
                );
                return false;
            }
        };

        let icon = match self.directory.get_avatar_file(&sender) {
            Ok(path) => path.display().to_string(),
            Err(err) => {
                debug!("no avatar file for {}: {}", sender.id(), err);
                FALLBACK_ICON.to_string()
            }
        };

        let width = self.config.name_width;
        info!(
            "{} {} {}",
            ellipsize(&feed.name, width, true),
            ellipsize(sender.display_name(), width, true),
            ellipsize(&single_line(&message.body.plain), self.config.body_width, false)
        );

        let summary = format!("{} ({})", sender.display_name(), feed.name);
        self.sink.notify(&summary, &message.body.plain, &icon);
        true
    }
}
