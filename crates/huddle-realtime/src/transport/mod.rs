//! Multiplexed WebSocket transport.
//!
//! One physical connection carries any number of logical channels. Handlers
//! are registered per channel; the wire only sees a `subscribe` when a
//! channel gains its first handler and an `unsubscribe` when it loses its
//! last one. Intents issued while the socket is not open are queued and
//! flushed in order once it opens.

mod client;
mod connection;
mod reconnect;
mod registry;
mod types;


pub use client::{Subscription, Transport};
pub use reconnect::{spawn_reconnector, ReconnectPolicy};
pub use types::{ConnectionState, DeliveryMode, Handler, HandlerId, TransportConfig};
