//! Configuration schema types for Huddle.
//!
//! All structs use `serde(default)` so partial configs work correctly.
//! Missing fields are filled with the defaults the web client shipped with.

mod call;
mod connection;
mod system;

pub use call::*;
pub use connection::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for Huddle.
///
/// Only override what you want to change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct HuddleConfig {
    pub connection: ConnectionConfig,
    pub channels: ChannelsConfig,
    pub call: CallConfig,
    pub chat: ChatConfig,
    pub relay: RelayConfig,
    pub logging: LoggingConfig,
}
