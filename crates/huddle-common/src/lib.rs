pub mod errors;
pub mod frame;
pub mod id;

pub use errors::{ConfigError, HuddleError, MediaError, SignalingError};
pub use frame::{Frame, FrameKind};
pub use id::{new_id, ClientId};

pub type Result<T> = std::result::Result<T, HuddleError>;
