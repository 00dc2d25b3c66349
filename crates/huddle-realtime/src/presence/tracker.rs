//! Presence tracker bound to one transport channel.

use std::sync::{Arc, PoisonError, RwLock};

use huddle_common::ClientId;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::transport::{Subscription, Transport};

use super::roster::{Roster, RosterChange};
use super::types::{ParticipantRecord, PresenceMessage};

/// Notification sent after a room changed.
#[derive(Debug, Clone)]
pub struct RosterUpdate {
    pub room: String,
    pub change: RosterChange,
    /// The room's participants after the change.
    pub participants: Vec<ParticipantRecord>,
}

/// Keeps the roster of every room in sync with the presence channel.
///
/// Dropping the tracker unsubscribes its handler. The roster survives
/// disconnects; the next snapshot reconciles it.
pub struct PresenceTracker {
    transport: Transport,
    channel: String,
    roster: Arc<RwLock<Roster>>,
    updates: broadcast::Sender<RosterUpdate>,
    _subscription: Subscription,
}

impl PresenceTracker {
    pub fn attach(transport: &Transport, channel: &str) -> Self {
        let roster = Arc::new(RwLock::new(Roster::new()));
        let (updates, _) = broadcast::channel(64);

        let handler_roster = Arc::clone(&roster);
        let handler_updates = updates.clone();
        let subscription = transport.subscribe(channel, move |content| {
            apply_content(&handler_roster, &handler_updates, content);
        });

        debug!(channel = %channel, "Presence tracker attached");
        Self {
            transport: transport.clone(),
            channel: channel.to_string(),
            roster,
            updates,
            _subscription: subscription,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Current participants of `room` in arrival order.
    pub fn roster(&self, room: &str) -> Vec<ParticipantRecord> {
        self.read().room(room).to_vec()
    }

    pub fn rooms(&self) -> Vec<String> {
        self.read().rooms()
    }

    pub fn updates(&self) -> broadcast::Receiver<RosterUpdate> {
        self.updates.subscribe()
    }

    /// Feed one presence payload as if it arrived on the channel.
    pub fn apply(&self, content: &Value) {
        apply_content(&self.roster, &self.updates, content);
    }

    /// Publish the local participant's record for `room`.
    pub fn announce(&self, room: &str, record: ParticipantRecord) -> bool {
        self.publish(PresenceMessage::Participant {
            channel: room.to_string(),
            content: record,
        })
    }

    /// Publish that `client_id` left `room`.
    pub fn announce_left(&self, room: &str, client_id: ClientId) -> bool {
        self.announce(room, ParticipantRecord::left(client_id))
    }

    fn publish(&self, message: PresenceMessage) -> bool {
        match serde_json::to_value(&message) {
            Ok(value) => self.transport.publish(&self.channel, value),
            Err(e) => {
                warn!(error = %e, "Failed to encode presence message");
                false
            }
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Roster> {
        self.roster.read().unwrap_or_else(PoisonError::into_inner)
    }
}

fn apply_content(
    roster: &RwLock<Roster>,
    updates: &broadcast::Sender<RosterUpdate>,
    content: &Value,
) {
    let message = match serde_json::from_value::<PresenceMessage>(content.clone()) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "Ignoring malformed presence message");
            return;
        }
    };

    let mut notify = Vec::new();
    {
        let mut roster = roster.write().unwrap_or_else(PoisonError::into_inner);
        match message {
            PresenceMessage::Participant { channel, content } => {
                debug!(room = %channel, client_id = %content.client_id, left = content.has_left(), "Participant update");
                if let Some(change) = roster.upsert(&channel, content) {
                    let participants = roster.room(&channel).to_vec();
                    notify.push(RosterUpdate {
                        room: channel,
                        change,
                        participants,
                    });
                }
            }
            PresenceMessage::Participants { content } => {
                let rooms = PresenceMessage::snapshot_rooms(&content);
                debug!(rooms = rooms.len(), "Participants snapshot");
                for room in roster.apply_snapshot(rooms) {
                    let participants = roster.room(&room).to_vec();
                    notify.push(RosterUpdate {
                        room,
                        change: RosterChange::Replaced,
                        participants,
                    });
                }
            }
        }
    }

    for update in notify {
        // No receivers is fine.
        let _ = updates.send(update);
    }
}
