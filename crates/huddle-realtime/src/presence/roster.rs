//! Arrival-ordered participant lists per room.

use std::collections::{HashMap, HashSet};

use huddle_common::ClientId;

use super::types::ParticipantRecord;

/// What a single mutation did to a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterChange {
    Joined(ClientId),
    /// An existing record was replaced and moved to the end.
    Updated(ClientId),
    Left(ClientId),
    /// The room was replaced by a snapshot.
    Replaced,
}

/// `room -> participants`, at most one record per client id per room.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    rooms: HashMap<String, Vec<ParticipantRecord>>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one incremental record.
    ///
    /// A `left` record removes the client; anything else is removed and then
    /// appended. Returns `None` when a `left` names a client that is absent.
    pub fn upsert(&mut self, room: &str, record: ParticipantRecord) -> Option<RosterChange> {
        if record.has_left() {
            let list = self.rooms.get_mut(room)?;
            let before = list.len();
            list.retain(|p| p.client_id != record.client_id);
            if list.len() == before {
                return None;
            }
            if list.is_empty() {
                self.rooms.remove(room);
            }
            return Some(RosterChange::Left(record.client_id));
        }

        let list = self.rooms.entry(room.to_string()).or_default();
        let before = list.len();
        list.retain(|p| p.client_id != record.client_id);
        let change = if list.len() < before {
            RosterChange::Updated(record.client_id.clone())
        } else {
            RosterChange::Joined(record.client_id.clone())
        };
        list.push(record);
        Some(change)
    }

    /// Replace each named room with its snapshot. Unnamed rooms are kept.
    ///
    /// `left` records are dropped and a repeated client id keeps its last
    /// record, at the position of that last occurrence.
    pub fn apply_snapshot(&mut self, rooms: Vec<(String, Vec<ParticipantRecord>)>) -> Vec<String> {
        let mut replaced = Vec::with_capacity(rooms.len());
        for (room, records) in rooms {
            let mut seen = HashSet::new();
            let mut kept: Vec<ParticipantRecord> = records
                .into_iter()
                .rev()
                .filter(|r| !r.has_left() && seen.insert(r.client_id.clone()))
                .collect();
            kept.reverse();

            if kept.is_empty() {
                self.rooms.remove(&room);
            } else {
                self.rooms.insert(room.clone(), kept);
            }
            replaced.push(room);
        }
        replaced
    }

    /// Participants of `room` in arrival order.
    pub fn room(&self, room: &str) -> &[ParticipantRecord] {
        self.rooms.get(room).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn rooms(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rooms.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn contains(&self, room: &str, client_id: &ClientId) -> bool {
        self.room(room).iter().any(|p| &p.client_id == client_id)
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
