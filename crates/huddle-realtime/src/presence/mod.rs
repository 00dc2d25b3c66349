//! Per-room participant rosters fed by the presence channel.
//!
//! Incremental `participant` events upsert or remove one record; a
//! `participants` snapshot replaces whole rooms.

mod roster;
mod tracker;
mod types;

pub use roster::{Roster, RosterChange};
pub use tracker::{PresenceTracker, RosterUpdate};
pub use types::{ParticipantRecord, PresenceMessage, LEFT_SENTINEL};
