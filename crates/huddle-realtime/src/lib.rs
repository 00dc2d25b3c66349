//! Realtime core: the multiplexed transport plus the presence, call
//! signaling, and chat layers built on it.

pub mod chat;
pub mod presence;
pub mod session;
pub mod settings;
pub mod signaling;
pub mod transport;

pub use chat::{ChatFeed, ChatFeedConfig, ChatHistory, ChatHistoryConfig, ChatMessage};
pub use presence::{ParticipantRecord, PresenceTracker, Roster, RosterUpdate};
pub use session::SessionCredential;
pub use signaling::{
    CallHandle, CallOrchestrator, CallService, CallState, MediaDevices, MediaStream,
    OrchestratorConfig, PeerConnection, PeerConnector, StreamConfig,
};
pub use transport::{
    spawn_reconnector, ConnectionState, DeliveryMode, ReconnectPolicy, Subscription, Transport,
    TransportConfig,
};
