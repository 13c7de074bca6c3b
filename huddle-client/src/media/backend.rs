use crate::error::{MediaAccessError, NegotiationError};
use crate::media::{LocalAudioTrack, LocalStream};
use async_trait::async_trait;
use huddle_core::{IceCandidate, ParticipantId, SessionDescription};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Media received from a remote participant, opaque to the session.
#[derive(Clone)]
pub struct RemoteTrack {
    pub id: String,
    pub media: Arc<dyn Any + Send + Sync>,
}

impl fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTrack").field("id", &self.id).finish()
    }
}

/// Asynchronous notifications from one media transport handle.
#[derive(Debug, Clone)]
pub enum MediaEvent {
    LocalCandidate(IceCandidate),
    RemoteTrack(RemoteTrack),
    PathEstablished,
    TransportFailed(String),
}

/// One media transport toward one remote participant.
#[async_trait]
pub trait PeerHandle: Send + Sync {
    async fn attach_track(&self, track: Arc<LocalAudioTrack>) -> Result<(), NegotiationError>;

    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError>;

    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError>;

    async fn set_local_description(&self, desc: SessionDescription)
    -> Result<(), NegotiationError>;

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), NegotiationError>;

    async fn add_candidate(&self, candidate: IceCandidate) -> Result<(), NegotiationError>;

    /// Drops the pending local offer. Attached tracks stay attached.
    async fn rollback(&self) -> Result<(), NegotiationError>;

    /// Idempotent.
    async fn close(&self);
}

#[async_trait]
pub trait MediaBackend: Send + Sync {
    async fn acquire_local_audio(&self) -> Result<LocalStream, MediaAccessError>;

    /// New handle for `peer`. Its events are pushed into `events` until it is closed.
    async fn create_handle(
        &self,
        peer: &ParticipantId,
        events: mpsc::UnboundedSender<MediaEvent>,
    ) -> Result<Arc<dyn PeerHandle>, NegotiationError>;
}
