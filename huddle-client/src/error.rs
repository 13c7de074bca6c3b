use huddle_core::RoomId;
use thiserror::Error;

/// The local capture device could not be opened.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaAccessError {
    #[error("microphone access denied")]
    Denied,
    #[error("no audio capture device available")]
    Unavailable,
    #[error("audio capture failed: {0}")]
    Device(String),
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("failed to connect to signaling server at {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },
    #[error("signaling connection closed")]
    Closed,
}

/// Failure of one negotiation primitive. Scoped to a single peer link.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NegotiationError {
    #[error("failed to create media transport: {0}")]
    Transport(String),
    #[error("failed to attach local track: {0}")]
    Track(String),
    #[error("session description rejected: {0}")]
    Description(String),
    #[error("network candidate rejected: {0}")]
    Candidate(String),
    #[error("media transport failed: {0}")]
    TransportFailed(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    MediaAccess(#[from] MediaAccessError),
    #[error(transparent)]
    SignalingConnect(#[from] ConnectionError),
    #[error("already in room {0}")]
    AlreadyInRoom(RoomId),
    #[error("not in a room")]
    NotInRoom,
}
