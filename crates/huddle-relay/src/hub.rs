//! Channel registry: maps channel names to subscribed connections.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

/// Identifies one connected client.
pub type ClientKey = u64;

#[derive(Default)]
struct HubState {
    clients: HashMap<ClientKey, mpsc::Sender<String>>,
    channels: HashMap<String, HashSet<ClientKey>>,
}

impl HubState {
    fn drop_client(&mut self, client: ClientKey) -> bool {
        let removed = self.clients.remove(&client).is_some();
        self.channels.retain(|_, subscribers| {
            subscribers.remove(&client);
            !subscribers.is_empty()
        });
        removed
    }
}

/// Thread-safe hub shared by every connection task.
#[derive(Clone, Default)]
pub struct Hub {
    state: Arc<RwLock<HubState>>,
    next_key: Arc<AtomicU64>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection's outbound queue.
    pub async fn register(&self, tx: mpsc::Sender<String>) -> ClientKey {
        let key = self.next_key.fetch_add(1, Ordering::Relaxed) + 1;
        self.state.write().await.clients.insert(key, tx);
        key
    }

    /// Returns true if the client was not already subscribed.
    pub async fn subscribe(&self, client: ClientKey, channel: &str) -> bool {
        let mut state = self.state.write().await;
        if !state.clients.contains_key(&client) {
            return false;
        }
        let added = state
            .channels
            .entry(channel.to_string())
            .or_default()
            .insert(client);
        debug!(client, channel = %channel, "Subscribed");
        added
    }

    pub async fn unsubscribe(&self, client: ClientKey, channel: &str) -> bool {
        let mut state = self.state.write().await;
        let Some(subscribers) = state.channels.get_mut(channel) else {
            return false;
        };
        let removed = subscribers.remove(&client);
        if subscribers.is_empty() {
            state.channels.remove(channel);
        }
        removed
    }

    /// Deliver `text` to every subscriber of `channel`, sender included.
    ///
    /// A subscriber whose queue is full or closed is dropped from the hub.
    /// Returns how many subscribers received the frame.
    pub async fn broadcast(&self, channel: &str, text: &str) -> usize {
        let mut state = self.state.write().await;
        let Some(subscribers) = state.channels.get(channel) else {
            debug!(channel = %channel, "No subscribers in channel");
            return 0;
        };

        let mut delivered = 0;
        let mut stalled = Vec::new();
        for client in subscribers {
            match state.clients.get(client) {
                Some(tx) if tx.try_send(text.to_string()).is_ok() => delivered += 1,
                _ => stalled.push(*client),
            }
        }
        for client in stalled {
            warn!(client, channel = %channel, "Dropping unresponsive client");
            state.drop_client(client);
        }
        delivered
    }

    /// Forget a client and all of its subscriptions.
    pub async fn unregister(&self, client: ClientKey) {
        if self.state.write().await.drop_client(client) {
            info!(client, "Client unregistered");
        }
    }

    pub async fn subscriber_count(&self, channel: &str) -> usize {
        self.state
            .read()
            .await
            .channels
            .get(channel)
            .map_or(0, HashSet::len)
    }

    pub async fn client_count(&self) -> usize {
        self.state.read().await.clients.len()
    }

    pub async fn channel_count(&self) -> usize {
        self.state.read().await.channels.len()
    }
}
