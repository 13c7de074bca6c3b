use crate::error::NegotiationError;
use crate::media::{LocalAudioTrack, MediaEvent, PeerHandle};
use crate::transport::SignalingSender;
use huddle_core::{IceCandidate, ParticipantId, RoomId, SessionDescription, SignalMessage};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Negotiation progress of one peer link.
///
/// `OfferSent` doubles as the answer-awaiting state of the initiator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    OfferSent,
    OfferReceived,
    AnswerSent,
    Connected,
    Failed,
    Closed,
}

impl NegotiationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, NegotiationState::Failed | NegotiationState::Closed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationRole {
    Undetermined,
    Initiator,
    Responder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkStatus {
    pub state: NegotiationState,
    pub role: NegotiationRole,
}

impl Default for LinkStatus {
    fn default() -> Self {
        Self {
            state: NegotiationState::Idle,
            role: NegotiationRole::Undetermined,
        }
    }
}

/// Offer/answer state machine for the link between the local participant
/// and one remote participant.
///
/// Every method runs to completion before the next one starts; callers feed
/// it from a single task. A method returning `Err` leaves the engine to be
/// failed by the caller.
pub struct NegotiationEngine {
    local_id: ParticipantId,
    remote_id: ParticipantId,
    room_id: RoomId,
    handle: Arc<dyn PeerHandle>,
    tracks: Vec<Arc<LocalAudioTrack>>,
    signaling: SignalingSender,
    state: NegotiationState,
    role: NegotiationRole,
    tracks_attached: bool,
    path_established: bool,
    local_description: Option<SessionDescription>,
    remote_description: Option<SessionDescription>,
    pending_candidates: VecDeque<IceCandidate>,
    status: Arc<watch::Sender<LinkStatus>>,
    detached: Arc<AtomicBool>,
}

impl NegotiationEngine {
    pub fn new(
        local_id: ParticipantId,
        remote_id: ParticipantId,
        room_id: RoomId,
        handle: Arc<dyn PeerHandle>,
        tracks: Vec<Arc<LocalAudioTrack>>,
        signaling: SignalingSender,
    ) -> Self {
        let (status, _) = watch::channel(LinkStatus::default());
        Self {
            local_id,
            remote_id,
            room_id,
            handle,
            tracks,
            signaling,
            state: NegotiationState::Idle,
            role: NegotiationRole::Undetermined,
            tracks_attached: false,
            path_established: false,
            local_description: None,
            remote_description: None,
            pending_candidates: VecDeque::new(),
            status: Arc::new(status),
            detached: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn role(&self) -> NegotiationRole {
        self.role
    }

    pub fn remote_id(&self) -> &ParticipantId {
        &self.remote_id
    }

    pub fn handle(&self) -> Arc<dyn PeerHandle> {
        Arc::clone(&self.handle)
    }

    pub fn local_description(&self) -> Option<&SessionDescription> {
        self.local_description.as_ref()
    }

    pub fn remote_description(&self) -> Option<&SessionDescription> {
        self.remote_description.as_ref()
    }

    pub fn pending_candidates(&self) -> usize {
        self.pending_candidates.len()
    }

    pub fn status_sender(&self) -> Arc<watch::Sender<LinkStatus>> {
        Arc::clone(&self.status)
    }

    pub fn subscribe(&self) -> watch::Receiver<LinkStatus> {
        self.status.subscribe()
    }

    /// Once set, the engine stops signaling and stops publishing its status.
    /// Set by the owning link when it leaves the registry, so an in-flight
    /// step that still completes has no visible effect.
    pub fn detach_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.detached)
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }

    /// Initiator path: `Idle -> OfferSent`.
    pub async fn start_offer(&mut self) -> Result<(), NegotiationError> {
        if self.state != NegotiationState::Idle {
            debug!(
                "Not offering to {}: link already {:?}",
                self.remote_id, self.state
            );
            return Ok(());
        }

        self.role = NegotiationRole::Initiator;
        self.attach_tracks().await?;

        let offer = self.handle.create_offer().await?;
        self.handle.set_local_description(offer.clone()).await?;
        self.local_description = Some(offer.clone());

        self.send(SignalMessage::Offer {
            room_id: self.room_id.clone(),
            user_id: self.local_id.clone(),
            target_user_id: self.remote_id.clone(),
            offer,
        });
        info!("Offer sent to {}", self.remote_id);
        self.set_state(NegotiationState::OfferSent);
        Ok(())
    }

    pub async fn handle_remote_offer(
        &mut self,
        offer: SessionDescription,
    ) -> Result<(), NegotiationError> {
        match self.state {
            NegotiationState::Idle => self.answer_offer(offer).await,
            NegotiationState::OfferSent if self.local_id < self.remote_id => {
                info!(
                    "Offer collision with {}: yielding, rolling back local offer",
                    self.remote_id
                );
                self.handle.rollback().await?;
                self.local_description = None;
                self.set_state(NegotiationState::Idle);
                self.answer_offer(offer).await
            }
            NegotiationState::OfferSent => {
                info!(
                    "Offer collision with {}: keeping local offer, ignoring theirs",
                    self.remote_id
                );
                Ok(())
            }
            state => {
                debug!("Discarding offer from {} in {:?}", self.remote_id, state);
                Ok(())
            }
        }
    }

    async fn answer_offer(&mut self, offer: SessionDescription) -> Result<(), NegotiationError> {
        self.role = NegotiationRole::Responder;
        self.set_state(NegotiationState::OfferReceived);

        self.handle.set_remote_description(offer.clone()).await?;
        self.remote_description = Some(offer);
        self.flush_candidates().await?;
        self.attach_tracks().await?;

        let answer = self.handle.create_answer().await?;
        self.handle.set_local_description(answer.clone()).await?;
        self.local_description = Some(answer.clone());

        self.send(SignalMessage::Answer {
            room_id: self.room_id.clone(),
            user_id: self.local_id.clone(),
            target_user_id: self.remote_id.clone(),
            answer,
        });
        info!("Answer sent to {}", self.remote_id);
        self.set_state(NegotiationState::AnswerSent);

        if self.path_established {
            self.set_state(NegotiationState::Connected);
        }
        Ok(())
    }

    pub async fn handle_remote_answer(
        &mut self,
        answer: SessionDescription,
    ) -> Result<(), NegotiationError> {
        if self.state != NegotiationState::OfferSent {
            debug!(
                "Discarding answer from {} in {:?}",
                self.remote_id, self.state
            );
            return Ok(());
        }

        self.handle.set_remote_description(answer.clone()).await?;
        self.remote_description = Some(answer);
        self.flush_candidates().await?;

        info!("Answer from {} applied", self.remote_id);
        self.set_state(NegotiationState::Connected);
        Ok(())
    }

    /// Applied at once if a remote description is set, otherwise queued.
    pub async fn handle_remote_candidate(
        &mut self,
        candidate: IceCandidate,
    ) -> Result<(), NegotiationError> {
        if self.state.is_terminal() {
            return Ok(());
        }
        if self.remote_description.is_none() {
            self.pending_candidates.push_back(candidate);
            return Ok(());
        }
        self.handle.add_candidate(candidate).await
    }

    async fn flush_candidates(&mut self) -> Result<(), NegotiationError> {
        if !self.pending_candidates.is_empty() {
            debug!(
                "Applying {} queued candidates from {}",
                self.pending_candidates.len(),
                self.remote_id
            );
        }
        while let Some(candidate) = self.pending_candidates.pop_front() {
            self.handle.add_candidate(candidate).await?;
        }
        Ok(())
    }

    async fn attach_tracks(&mut self) -> Result<(), NegotiationError> {
        if self.tracks_attached {
            return Ok(());
        }
        for track in &self.tracks {
            self.handle.attach_track(Arc::clone(track)).await?;
        }
        self.tracks_attached = true;
        Ok(())
    }

    /// Reacts to a handle notification. Remote tracks are not the engine's
    /// concern and are ignored here.
    pub fn on_media_event(&mut self, event: MediaEvent) -> Result<(), NegotiationError> {
        if self.state.is_terminal() {
            return Ok(());
        }

        match event {
            MediaEvent::LocalCandidate(candidate) => {
                self.send(SignalMessage::IceCandidate {
                    room_id: self.room_id.clone(),
                    user_id: self.local_id.clone(),
                    target_user_id: self.remote_id.clone(),
                    candidate,
                });
                Ok(())
            }
            MediaEvent::PathEstablished => {
                self.path_established = true;
                if self.state == NegotiationState::AnswerSent {
                    self.set_state(NegotiationState::Connected);
                }
                Ok(())
            }
            MediaEvent::TransportFailed(reason) => Err(NegotiationError::TransportFailed(reason)),
            MediaEvent::RemoteTrack(_) => Ok(()),
        }
    }

    pub fn fail(&mut self, error: &NegotiationError) {
        if self.state.is_terminal() {
            return;
        }
        warn!("Link to {} failed: {}", self.remote_id, error);
        self.pending_candidates.clear();
        self.set_state(NegotiationState::Failed);
    }

    pub fn close(&mut self) {
        self.pending_candidates.clear();
        self.set_state(NegotiationState::Closed);
    }

    fn send(&self, msg: SignalMessage) {
        if self.is_detached() {
            debug!("Link {} detached, not sending {}", self.remote_id, msg.kind());
            return;
        }
        if let Err(e) = self.signaling.send(msg) {
            debug!("Dropping signal for {}: {}", self.remote_id, e);
        }
    }

    fn set_state(&mut self, state: NegotiationState) {
        if self.state != state {
            debug!("Link {}: {:?} -> {:?}", self.remote_id, self.state, state);
        }
        self.state = state;
        if self.is_detached() {
            return;
        }
        self.status.send_replace(LinkStatus {
            state,
            role: self.role,
        });
    }
}
