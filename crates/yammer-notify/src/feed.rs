//! Incremental message retrieval per feed.
//!
//! Each feed keeps a cursor: the id of the newest message already seen.
//! The first poll of a feed only establishes the cursor; later polls ask
//! for messages newer than it and hand them out oldest first.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::{ApiClient, ApiResult, Message, MessageEnvelope};
use crate::directory::PRIVATE_GROUP_ID;

/// A message stream: one group, or the private messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeedId(pub i64);

impl FeedId {
    pub const PRIVATE: FeedId = FeedId(PRIVATE_GROUP_ID);

    pub fn is_private(self) -> bool {
        self == Self::PRIVATE
    }

    /// API path of the feed's message list.
    pub fn path(self) -> String {
        if self.is_private() {
            "messages/private.json".to_string()
        } else {
            format!("messages/in_group/{}.json", self.0)
        }
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_private() {
            f.write_str("private")
        } else {
            write!(f, "group {}", self.0)
        }
    }
}

/// Cursors and message cache for all feeds.
///
/// Owned by the polling task; nothing here is shared or locked.
pub struct FeedSync {
    client: ApiClient,
    /// Newest seen message id by feed.
    cursors: HashMap<FeedId, i64>,
    /// Every delivered message by id.
    cache: HashMap<i64, Arc<Message>>,
    /// Delivered messages by feed, oldest first.
    lists: HashMap<FeedId, Vec<Arc<Message>>>,
}

impl FeedSync {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            cursors: HashMap::new(),
            cache: HashMap::new(),
            lists: HashMap::new(),
        }
    }

    pub fn cursor(&self, feed: FeedId) -> Option<i64> {
        self.cursors.get(&feed).copied()
    }

    pub fn cached_message(&self, id: i64) -> Option<Arc<Message>> {
        self.cache.get(&id).cloned()
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Messages delivered so far for `feed`, oldest first.
    pub fn messages(&self, feed: FeedId) -> &[Arc<Message>] {
        self.lists.get(&feed).map(Vec::as_slice).unwrap_or_default()
    }

    /// Messages of `feed` that arrived since the last call, oldest first.
    ///
    /// The first call for a feed only records the newest message id and
    /// returns nothing.
    pub async fn get_new_messages(&mut self, feed: FeedId) -> ApiResult<Vec<Arc<Message>>> {
        let Some(cursor) = self.cursor(feed) else {
            self.initialize_cursor(feed).await?;
            return Ok(Vec::new());
        };

        let envelope = self
            .fetch(feed, &[("newer_than", cursor.to_string())])
            .await?;
        let Some(newest) = envelope.messages.first().map(|m| m.id) else {
            return Ok(Vec::new());
        };

        // Newest first on the wire; deliver oldest first.
        let mut batch = Vec::with_capacity(envelope.messages.len());
        for message in envelope.messages.into_iter().rev() {
            if message.id <= cursor {
                warn!(
                    "{}: dropping message {} not newer than cursor {}",
                    feed, message.id, cursor
                );
                continue;
            }
            let message = Arc::new(message);
            self.cache.insert(message.id, Arc::clone(&message));
            batch.push(message);
        }

        if newest > cursor {
            self.cursors.insert(feed, newest);
        }
        self.lists
            .entry(feed)
            .or_default()
            .extend(batch.iter().cloned());

        debug!("{}: {} new message(s), cursor {}", feed, batch.len(), newest.max(cursor));
        Ok(batch)
    }

    async fn initialize_cursor(&mut self, feed: FeedId) -> ApiResult<()> {
        let envelope = self.fetch(feed, &[("limit", "1".to_string())]).await?;

        match envelope.messages.first() {
            Some(latest) => {
                debug!("{}: cursor initialized at {}", feed, latest.id);
                self.cursors.insert(feed, latest.id);
            }
            None => debug!("{}: feed is empty, cursor stays unset", feed),
        }
        Ok(())
    }

    async fn fetch(&self, feed: FeedId, query: &[(&str, String)]) -> ApiResult<MessageEnvelope> {
        let request = self.client.get(&feed.path(), query)?;
        self.client.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_paths() {
        assert_eq!(FeedId::PRIVATE.path(), "messages/private.json");
        assert_eq!(FeedId(42).path(), "messages/in_group/42.json");
    }

    #[test]
    fn test_feed_display() {
        assert_eq!(FeedId::PRIVATE.to_string(), "private");
        assert_eq!(FeedId(42).to_string(), "group 42");
        assert!(!FeedId(42).is_private());
    }
}
