use crate::error::NegotiationError;
use crate::media::{LocalAudioTrack, MediaBackend, MediaEvent, PeerHandle, RemoteTrack};
use crate::peer::engine::{LinkStatus, NegotiationEngine, NegotiationState};
use crate::transport::SignalingSender;
use huddle_core::{IceCandidate, ParticipantId, RoomId, SessionDescription};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

/// Input to a link's negotiation task.
#[derive(Debug, Clone)]
pub enum LinkCommand {
    StartOffer,
    RemoteOffer(SessionDescription),
    RemoteAnswer(SessionDescription),
    RemoteCandidate(IceCandidate),
}

/// What a link reports back to the session. `generation` identifies the
/// link instance that produced it.
#[derive(Debug)]
pub enum LinkEvent {
    RemoteTrack {
        peer: ParticipantId,
        generation: u64,
        track: RemoteTrack,
    },
    Failed {
        peer: ParticipantId,
        generation: u64,
        error: NegotiationError,
    },
}

/// A live link to one remote participant: its negotiation task and the
/// media handle that task drives.
pub struct PeerLink {
    remote_id: ParticipantId,
    generation: u64,
    handle: Arc<dyn PeerHandle>,
    commands: mpsc::UnboundedSender<LinkCommand>,
    status: Arc<watch::Sender<LinkStatus>>,
    detached: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl PeerLink {
    pub fn spawn(
        engine: NegotiationEngine,
        generation: u64,
        media_events: mpsc::UnboundedReceiver<MediaEvent>,
        link_events: mpsc::UnboundedSender<LinkEvent>,
    ) -> Self {
        let remote_id = engine.remote_id().clone();
        let handle = engine.handle();
        let status = engine.status_sender();
        let detached = engine.detach_flag();
        let (commands, commands_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run_link(
            engine,
            generation,
            commands_rx,
            media_events,
            link_events,
        ));

        Self {
            remote_id,
            generation,
            handle,
            commands,
            status,
            detached,
            task,
        }
    }

    pub fn remote_id(&self) -> &ParticipantId {
        &self.remote_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn status(&self) -> LinkStatus {
        *self.status.borrow()
    }

    pub fn state(&self) -> NegotiationState {
        self.status.borrow().state
    }

    pub fn subscribe(&self) -> watch::Receiver<LinkStatus> {
        self.status.subscribe()
    }

    /// Returns false once the link's task has stopped.
    pub fn send(&self, command: LinkCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Stops negotiation without waiting for it and closes the handle.
    ///
    /// Abort is cooperative, so the engine is detached first: a step that
    /// is mid-poll on another worker may finish but can no longer signal
    /// or change the published status.
    pub async fn shutdown(&self) {
        self.detached.store(true, Ordering::SeqCst);
        self.task.abort();
        self.handle.close().await;
        self.status.send_modify(|status| {
            if status.state != NegotiationState::Failed {
                status.state = NegotiationState::Closed;
            }
        });
        debug!("Link {} (gen {}) shut down", self.remote_id, self.generation);
    }
}

impl Drop for PeerLink {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_link(
    mut engine: NegotiationEngine,
    generation: u64,
    mut commands: mpsc::UnboundedReceiver<LinkCommand>,
    mut media_events: mpsc::UnboundedReceiver<MediaEvent>,
    link_events: mpsc::UnboundedSender<LinkEvent>,
) {
    let mut media_open = true;

    loop {
        let outcome = tokio::select! {
            cmd = commands.recv() => match cmd {
                Some(LinkCommand::StartOffer) => engine.start_offer().await,
                Some(LinkCommand::RemoteOffer(offer)) => engine.handle_remote_offer(offer).await,
                Some(LinkCommand::RemoteAnswer(answer)) => engine.handle_remote_answer(answer).await,
                Some(LinkCommand::RemoteCandidate(candidate)) => {
                    engine.handle_remote_candidate(candidate).await
                }
                None => break,
            },
            event = media_events.recv(), if media_open => match event {
                Some(MediaEvent::RemoteTrack(track)) => {
                    let _ = link_events.send(LinkEvent::RemoteTrack {
                        peer: engine.remote_id().clone(),
                        generation,
                        track,
                    });
                    Ok(())
                }
                Some(event) => engine.on_media_event(event),
                None => {
                    media_open = false;
                    Ok(())
                }
            },
        };

        if let Err(error) = outcome {
            engine.fail(&error);
            let _ = link_events.send(LinkEvent::Failed {
                peer: engine.remote_id().clone(),
                generation,
                error,
            });
            break;
        }
    }
}

/// Builds links for one session: a fresh handle from the backend plus an
/// engine bound to the session's room, tracks and signaling sender.
#[derive(Clone)]
pub struct LinkFactory {
    local_id: ParticipantId,
    room_id: RoomId,
    backend: Arc<dyn MediaBackend>,
    tracks: Vec<Arc<LocalAudioTrack>>,
    signaling: SignalingSender,
    link_events: mpsc::UnboundedSender<LinkEvent>,
}

impl LinkFactory {
    pub fn new(
        local_id: ParticipantId,
        room_id: RoomId,
        backend: Arc<dyn MediaBackend>,
        tracks: Vec<Arc<LocalAudioTrack>>,
        signaling: SignalingSender,
        link_events: mpsc::UnboundedSender<LinkEvent>,
    ) -> Self {
        Self {
            local_id,
            room_id,
            backend,
            tracks,
            signaling,
            link_events,
        }
    }

    pub async fn create(
        &self,
        remote_id: &ParticipantId,
        generation: u64,
    ) -> Result<PeerLink, NegotiationError> {
        let (media_tx, media_rx) = mpsc::unbounded_channel();
        let handle = self.backend.create_handle(remote_id, media_tx).await?;

        let engine = NegotiationEngine::new(
            self.local_id.clone(),
            remote_id.clone(),
            self.room_id.clone(),
            handle,
            self.tracks.clone(),
            self.signaling.clone(),
        );
        Ok(PeerLink::spawn(
            engine,
            generation,
            media_rx,
            self.link_events.clone(),
        ))
    }
}
