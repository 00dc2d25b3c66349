//! Wire types for presence messages.

use huddle_common::ClientId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Presence datum marking a participant that has left.
pub const LEFT_SENTINEL: &str = "left";

/// One participant of a call room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    /// Sent as a string or a number; compared as a string.
    #[serde(rename = "clientId")]
    pub client_id: ClientId,
    #[serde(rename = "streamId", default)]
    pub stream_id: String,
    #[serde(rename = "username", default)]
    pub display_name: String,
    #[serde(rename = "imageURL", default)]
    pub avatar_ref: String,
    #[serde(rename = "data", default)]
    pub presence: String,
}

impl ParticipantRecord {
    pub fn has_left(&self) -> bool {
        self.presence == LEFT_SENTINEL
    }

    /// The record that announces `client_id` leaving.
    pub fn left(client_id: ClientId) -> Self {
        Self {
            client_id,
            stream_id: String::new(),
            display_name: String::new(),
            avatar_ref: String::new(),
            presence: LEFT_SENTINEL.to_string(),
        }
    }
}

/// Content of a frame on the presence channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PresenceMessage {
    /// Incremental update for one participant of room `channel`.
    Participant {
        channel: String,
        content: ParticipantRecord,
    },
    /// Full state: `room -> streamId -> record`, in wire key order.
    Participants { content: Map<String, Value> },
}

impl PresenceMessage {
    /// Decode the rooms of a snapshot. Records that fail to parse are skipped.
    pub fn snapshot_rooms(content: &Map<String, Value>) -> Vec<(String, Vec<ParticipantRecord>)> {
        content
            .iter()
            .map(|(room, by_stream)| {
                let records = by_stream
                    .as_object()
                    .map(|entries| {
                        entries
                            .values()
                            .filter_map(|raw| {
                                match serde_json::from_value::<ParticipantRecord>(raw.clone()) {
                                    Ok(record) => Some(record),
                                    Err(e) => {
                                        warn!(room = %room, error = %e, "Skipping malformed participant");
                                        None
                                    }
                                }
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                (room.clone(), records)
            })
            .collect()
    }
}
