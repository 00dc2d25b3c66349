use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Failures while acquiring local capture devices.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    #[error("media device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("media permission denied: {0}")]
    PermissionDenied(String),
}

/// Errors surfaced to callers of the call signaling API.
///
/// Connectivity problems never show up here; the transport reports those
/// through its connection state instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignalingError {
    #[error("room id must be specified")]
    MissingRoomId,

    #[error("call room id must be specified")]
    MissingCallRoomId,

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("peer connection error: {0}")]
    Peer(String),

    #[error("call service is no longer running")]
    ServiceStopped,
}

#[derive(Debug, thiserror::Error)]
pub enum HuddleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Signaling(#[from] SignalingError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("network error: {0}")]
    Network(String),

    #[error("{0}")]
    Other(String),
}

impl From<MediaError> for HuddleError {
    fn from(err: MediaError) -> Self {
        HuddleError::Signaling(SignalingError::Media(err))
    }
}
