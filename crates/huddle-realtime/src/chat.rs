//! Chat history and the live feed that keeps it current.
//!
//! The backend broadcasts new messages on `chat:<id>:messages` and edits or
//! soft-deletes on `chat:<id>:messages:update`. History is kept per chat in
//! a bounded ring buffer so memory usage stays predictable.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::transport::{DeliveryMode, Subscription, Transport};

/// Channel carrying newly created messages of `chat_id`.
pub fn messages_key(chat_id: &str) -> String {
    format!("chat:{chat_id}:messages")
}

/// Channel carrying edits and deletions for `chat_id`.
pub fn updates_key(chat_id: &str) -> String {
    format!("chat:{chat_id}:messages:update")
}

/// A single chat message as broadcast by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "fileUrl", default)]
    pub file_url: Option<String>,
    #[serde(rename = "memberID", default)]
    pub member_id: String,
    #[serde(rename = "channelID", alias = "conversationID", default)]
    pub channel_id: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Configuration for chat history storage.
#[derive(Debug, Clone)]
pub struct ChatHistoryConfig {
    /// Maximum messages to retain per chat.
    pub max_messages_per_channel: usize,
}

impl Default for ChatHistoryConfig {
    fn default() -> Self {
        Self {
            max_messages_per_channel: 500,
        }
    }
}

/// In-memory chat history, keyed by chat id.
#[derive(Debug)]
pub struct ChatHistory {
    config: ChatHistoryConfig,
    channels: HashMap<String, VecDeque<ChatMessage>>,
}

impl ChatHistory {
    pub fn new(config: ChatHistoryConfig) -> Self {
        Self {
            config,
            channels: HashMap::new(),
        }
    }

    /// Push a message into a chat. A message with a known id replaces the
    /// stored copy in place; otherwise the oldest message is evicted when
    /// the buffer is full.
    pub fn push(&mut self, channel: &str, msg: ChatMessage) {
        let buf = self.channels.entry(channel.to_string()).or_default();
        if let Some(existing) = buf.iter_mut().find(|m| m.id == msg.id) {
            *existing = msg;
            return;
        }
        if buf.len() >= self.config.max_messages_per_channel {
            buf.pop_front();
        }
        buf.push_back(msg);
    }

    /// Replace a stored message (edit or soft delete). Unknown ids are
    /// ignored; returns whether anything changed.
    pub fn apply_update(&mut self, channel: &str, msg: ChatMessage) -> bool {
        let Some(existing) = self
            .channels
            .get_mut(channel)
            .and_then(|buf| buf.iter_mut().find(|m| m.id == msg.id))
        else {
            return false;
        };
        *existing = msg;
        true
    }

    /// Get the most recent `limit` messages from a chat (oldest first).
    pub fn recent(&self, channel: &str, limit: usize) -> Vec<&ChatMessage> {
        match self.channels.get(channel) {
            Some(buf) => {
                let skip = buf.len().saturating_sub(limit);
                buf.iter().skip(skip).collect()
            }
            None => Vec::new(),
        }
    }

    pub fn all(&self, channel: &str) -> Vec<&ChatMessage> {
        match self.channels.get(channel) {
            Some(buf) => buf.iter().collect(),
            None => Vec::new(),
        }
    }

    pub fn clear_channel(&mut self, channel: &str) {
        self.channels.remove(channel);
    }

    /// Total number of stored messages across all chats.
    pub fn total_messages(&self) -> usize {
        self.channels.values().map(|b| b.len()).sum()
    }
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self::new(ChatHistoryConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ChatFeedConfig {
    pub history: ChatHistoryConfig,
    /// Re-fetch period while the transport is not open.
    pub fallback_poll_interval: Duration,
}

impl Default for ChatFeedConfig {
    fn default() -> Self {
        Self {
            history: ChatHistoryConfig::default(),
            fallback_poll_interval: Duration::from_secs(1),
        }
    }
}

/// Live view of one chat.
///
/// Messages arrive through the transport while it is open. While it is not,
/// [`refetch_interval`](Self::refetch_interval) tells the caller how often
/// to re-fetch, and the results go through [`seed`](Self::seed).
pub struct ChatFeed {
    chat_id: String,
    transport: Transport,
    history: Arc<RwLock<ChatHistory>>,
    poll_interval: Duration,
    _subscriptions: [Subscription; 2],
}

impl ChatFeed {
    pub fn attach(transport: &Transport, chat_id: &str, config: ChatFeedConfig) -> Self {
        let history = Arc::new(RwLock::new(ChatHistory::new(config.history)));

        let added = {
            let history = Arc::clone(&history);
            let chat = chat_id.to_string();
            transport.subscribe(&messages_key(chat_id), move |content| {
                if let Some(msg) = decode(content) {
                    debug!(chat_id = %chat, message_id = %msg.id, "Chat message received");
                    write(&history).push(&chat, msg);
                }
            })
        };
        let updated = {
            let history = Arc::clone(&history);
            let chat = chat_id.to_string();
            transport.subscribe(&updates_key(chat_id), move |content| {
                if let Some(msg) = decode(content) {
                    if !write(&history).apply_update(&chat, msg) {
                        debug!(chat_id = %chat, "Update for a message outside history");
                    }
                }
            })
        };

        Self {
            chat_id: chat_id.to_string(),
            transport: transport.clone(),
            history,
            poll_interval: config.fallback_poll_interval,
            _subscriptions: [added, updated],
        }
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn recent(&self, limit: usize) -> Vec<ChatMessage> {
        self.read().recent(&self.chat_id, limit).into_iter().cloned().collect()
    }

    pub fn all(&self) -> Vec<ChatMessage> {
        self.read().all(&self.chat_id).into_iter().cloned().collect()
    }

    /// Merge fetched messages (oldest first) into the history.
    pub fn seed(&self, messages: impl IntoIterator<Item = ChatMessage>) {
        let mut history = write(&self.history);
        for msg in messages {
            history.push(&self.chat_id, msg);
        }
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        self.transport.delivery_mode(self.poll_interval)
    }

    /// `None` while live, otherwise how often to re-fetch.
    pub fn refetch_interval(&self) -> Option<Duration> {
        self.delivery_mode().refetch_interval()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, ChatHistory> {
        self.history.read().unwrap_or_else(PoisonError::into_inner)
    }
}

fn write(history: &RwLock<ChatHistory>) -> std::sync::RwLockWriteGuard<'_, ChatHistory> {
    history.write().unwrap_or_else(PoisonError::into_inner)
}

fn decode(content: &Value) -> Option<ChatMessage> {
    match serde_json::from_value(content.clone()) {
        Ok(msg) => Some(msg),
        Err(e) => {
            warn!(error = %e, "Ignoring malformed chat message");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportConfig;
    use serde_json::json;

    fn make_msg(id: &str, content: &str) -> ChatMessage {
        ChatMessage {
            id: id.into(),
            content: content.into(),
            file_url: None,
            member_id: "m1".into(),
            channel_id: "general".into(),
            deleted: false,
            created_at: "2024-01-01T00:00:00Z".into(),
            updated_at: "2024-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn push_and_recent() {
        let mut history = ChatHistory::default();
        history.push("general", make_msg("1", "hello"));
        history.push("general", make_msg("2", "world"));
        history.push("general", make_msg("3", "!"));

        let recent = history.recent("general", 2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].content, "world");
        assert_eq!(recent[1].content, "!");
    }

    #[test]
    fn ring_buffer_evicts_oldest() {
        let mut history = ChatHistory::new(ChatHistoryConfig {
            max_messages_per_channel: 3,
        });
        for i in 0..5 {
            history.push("ch", make_msg(&i.to_string(), &format!("msg {i}")));
        }
        let all = history.all("ch");
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].content, "msg 2");
        assert_eq!(all[2].content, "msg 4");
    }

    #[test]
    fn push_with_known_id_replaces_in_place() {
        let mut history = ChatHistory::default();
        history.push("ch", make_msg("1", "a"));
        history.push("ch", make_msg("2", "b"));
        history.push("ch", make_msg("1", "a (edited)"));
        let all = history.all("ch");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].content, "a (edited)");
    }

    #[test]
    fn apply_update_ignores_unknown_ids() {
        let mut history = ChatHistory::default();
        history.push("ch", make_msg("1", "a"));
        let mut deleted = make_msg("1", "This message has been deleted.");
        deleted.deleted = true;
        assert!(history.apply_update("ch", deleted));
        assert!(history.all("ch")[0].deleted);

        assert!(!history.apply_update("ch", make_msg("404", "x")));
        assert!(!history.apply_update("other", make_msg("1", "x")));
        assert_eq!(history.total_messages(), 1);
    }

    #[test]
    fn keys_match_backend_channels() {
        assert_eq!(messages_key("abc"), "chat:abc:messages");
        assert_eq!(updates_key("abc"), "chat:abc:messages:update");
    }

    #[test]
    fn decodes_backend_message() {
        let msg = decode(&json!({
            "id": "0190",
            "content": "hi",
            "fileUrl": null,
            "memberID": "m",
            "channelID": "c",
            "member": {"id": "m", "role": "GUEST"},
            "deleted": false,
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(msg.member_id, "m");
        assert_eq!(msg.channel_id, "c");
        assert!(msg.file_url.is_none());
        assert!(decode(&json!({"content": "no id"})).is_none());
    }

    #[test]
    fn feed_follows_both_channels() {
        let transport = Transport::new(TransportConfig::default());
        let feed = ChatFeed::attach(&transport, "c1", ChatFeedConfig::default());
        let msg = |id: &str, content: &str| serde_json::to_value(make_msg(id, content)).unwrap();

        transport.deliver_for_test("chat:c1:messages", msg("1", "first"));
        transport.deliver_for_test("chat:c1:messages", msg("2", "second"));
        transport.deliver_for_test("chat:c1:messages:update", msg("1", "first!"));
        transport.deliver_for_test("chat:c2:messages", msg("3", "elsewhere"));

        let all = feed.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].content, "first!");
        assert_eq!(feed.recent(1)[0].id, "2");
    }

    #[test]
    fn feed_polls_only_while_disconnected() {
        let transport = Transport::new(TransportConfig::default());
        let feed = ChatFeed::attach(&transport, "c1", ChatFeedConfig::default());
        assert_eq!(feed.refetch_interval(), Some(Duration::from_secs(1)));

        let _rx = transport.open_for_test();
        assert_eq!(feed.refetch_interval(), None);
        assert_eq!(feed.delivery_mode(), DeliveryMode::Live);
    }

    #[test]
    fn seed_merges_fetched_pages() {
        let transport = Transport::new(TransportConfig::default());
        let feed = ChatFeed::attach(&transport, "c1", ChatFeedConfig::default());
        feed.seed(vec![make_msg("1", "a"), make_msg("2", "b")]);
        feed.seed(vec![make_msg("2", "b"), make_msg("3", "c")]);
        let ids: Vec<_> = feed.all().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn dropping_feed_unsubscribes() {
        let transport = Transport::new(TransportConfig::default());
        let feed = ChatFeed::attach(&transport, "c1", ChatFeedConfig::default());
        assert_eq!(transport.handler_count("chat:c1:messages"), 1);
        drop(feed);
        assert_eq!(transport.handler_count("chat:c1:messages"), 0);
        assert_eq!(transport.handler_count("chat:c1:messages:update"), 0);
    }
}
