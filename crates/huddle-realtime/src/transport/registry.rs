//! Channel → handler multimap with ordered iteration.

use std::collections::HashMap;

use super::types::{Handler, HandlerId};

/// Result of removing one handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Removal {
    NotFound,
    Remaining,
    /// The channel has no handlers left.
    Last,
}

#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    next_id: u64,
    channels: HashMap<String, Vec<(HandlerId, Handler)>>,
    /// Channels in first-registration order.
    order: Vec<String>,
}

impl SubscriptionRegistry {
    /// Register a handler. The flag is true when this is the channel's first.
    pub(crate) fn add(&mut self, channel: &str, handler: Handler) -> (HandlerId, bool) {
        self.next_id += 1;
        let id = HandlerId(self.next_id);
        let first = match self.channels.get_mut(channel) {
            Some(handlers) => {
                handlers.push((id, handler));
                false
            }
            None => {
                self.channels.insert(channel.to_string(), vec![(id, handler)]);
                self.order.push(channel.to_string());
                true
            }
        };
        (id, first)
    }

    pub(crate) fn remove(&mut self, channel: &str, id: HandlerId) -> Removal {
        let Some(handlers) = self.channels.get_mut(channel) else {
            return Removal::NotFound;
        };
        let Some(pos) = handlers.iter().position(|(h, _)| *h == id) else {
            return Removal::NotFound;
        };
        handlers.remove(pos);
        if !handlers.is_empty() {
            return Removal::Remaining;
        }
        self.channels.remove(channel);
        self.order.retain(|c| c != channel);
        Removal::Last
    }

    /// Snapshot of a channel's handlers in registration order.
    pub(crate) fn handlers(&self, channel: &str) -> Vec<Handler> {
        self.channels
            .get(channel)
            .map(|hs| hs.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn active_channels(&self) -> Vec<String> {
        self.order.clone()
    }

    pub(crate) fn handler_count(&self, channel: &str) -> usize {
        self.channels.get(channel).map_or(0, Vec::len)
    }

    pub(crate) fn clear(&mut self) {
        self.channels.clear();
        self.order.clear();
    }
}
