use crate::config::ClientConfig;
use crate::error::SessionError;
use crate::media::{AudioOutput, LocalAudioTrack, MediaBackend};
use crate::peer::{LinkFactory, LinkStatus};
use crate::room::RoomMembership;
use crate::session::SessionClock;
use crate::session::room_session::{Session, SessionCommand, SessionEnd};
use crate::transport::{DisconnectReason, SignalingConnection, SignalingConnector};
use huddle_core::{ParticipantId, RoomId, SignalMessage};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tracing::{info, warn};

struct ActiveSession {
    room_id: RoomId,
    tracks: Vec<Arc<LocalAudioTrack>>,
    clock: Arc<SessionClock>,
    commands: mpsc::UnboundedSender<SessionCommand>,
    members: watch::Receiver<RoomMembership>,
    task: JoinHandle<SessionEnd>,
}

/// Entry point of the client. Owns at most one room session at a time.
pub struct SessionController {
    local_id: ParticipantId,
    config: ClientConfig,
    backend: Arc<dyn MediaBackend>,
    connector: Arc<dyn SignalingConnector>,
    output: Arc<dyn AudioOutput>,
    muted: bool,
    active: Option<ActiveSession>,
}

impl SessionController {
    pub fn new(
        config: ClientConfig,
        backend: Arc<dyn MediaBackend>,
        connector: Arc<dyn SignalingConnector>,
        output: Arc<dyn AudioOutput>,
    ) -> Self {
        Self::with_participant_id(ParticipantId::random(), config, backend, connector, output)
    }

    pub fn with_participant_id(
        local_id: ParticipantId,
        config: ClientConfig,
        backend: Arc<dyn MediaBackend>,
        connector: Arc<dyn SignalingConnector>,
        output: Arc<dyn AudioOutput>,
    ) -> Self {
        Self {
            local_id,
            config,
            backend,
            connector,
            output,
            muted: false,
            active: None,
        }
    }

    pub fn participant_id(&self) -> &ParticipantId {
        &self.local_id
    }

    /// Captures local audio, connects to signaling and joins `room_id`.
    ///
    /// The capture stream is released again if any later step fails.
    pub async fn join(&mut self, room_id: impl Into<RoomId>) -> Result<(), SessionError> {
        if let Some(active) = &self.active {
            if !active.task.is_finished() {
                return Err(SessionError::AlreadyInRoom(active.room_id.clone()));
            }
        }
        self.active = None;
        let room_id = room_id.into();

        let stream = self.backend.acquire_local_audio().await?;
        stream.set_muted(self.muted);

        let SignalingConnection { sender, events } =
            self.connector.connect(&self.config.signaling_url).await?;
        sender.send(SignalMessage::Join {
            room_id: room_id.clone(),
            user_id: self.local_id.clone(),
        })?;

        let clock = Arc::new(SessionClock::start());
        let (link_tx, link_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (members_tx, members_rx) = watch::channel(RoomMembership::new());
        let tracks = stream.tracks().to_vec();

        let factory = LinkFactory::new(
            self.local_id.clone(),
            room_id.clone(),
            Arc::clone(&self.backend),
            tracks.clone(),
            sender.clone(),
            link_tx,
        );
        let session = Session::new(
            self.local_id.clone(),
            room_id.clone(),
            factory,
            sender,
            Arc::clone(&self.output),
            members_tx,
        );
        let task = tokio::spawn(session.run(
            events,
            link_rx,
            command_rx,
            stream,
            Arc::clone(&clock),
        ));

        info!("Joined room {} as {}", room_id, self.local_id);
        self.active = Some(ActiveSession {
            room_id,
            tracks,
            clock,
            commands: command_tx,
            members: members_rx,
            task,
        });
        Ok(())
    }

    /// Leaves the room. In-flight negotiations are abandoned, not awaited.
    pub async fn leave(&mut self) -> Result<SessionEnd, SessionError> {
        let active = self.active.take().ok_or(SessionError::NotInRoom)?;
        let _ = active.commands.send(SessionCommand::Leave);
        Ok(join_session(active.task).await)
    }

    /// Resolves when the current session ends on its own (or after `leave`
    /// from elsewhere). `None` when no session is running.
    pub async fn wait_closed(&mut self) -> Option<SessionEnd> {
        let active = self.active.as_mut()?;
        let end = join_session(&mut active.task).await;
        self.active = None;
        Some(end)
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if let Some(active) = &self.active {
            for track in &active.tracks {
                track.set_enabled(!muted);
            }
        }
        info!("Microphone {}", if muted { "muted" } else { "live" });
    }

    pub fn toggle_muted(&mut self) -> bool {
        self.set_muted(!self.muted);
        self.muted
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_active(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.task.is_finished())
    }

    pub fn room_id(&self) -> Option<&RoomId> {
        self.active.as_ref().map(|active| &active.room_id)
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.active
            .as_ref()
            .map_or(0, |active| active.clock.elapsed_seconds())
    }

    pub fn elapsed_display(&self) -> String {
        super::format_elapsed(self.elapsed_seconds())
    }

    /// Last membership view, in server order.
    pub fn members(&self) -> Vec<ParticipantId> {
        self.active
            .as_ref()
            .map(|active| active.members.borrow().members().to_vec())
            .unwrap_or_default()
    }

    pub fn display_names(&self) -> Vec<String> {
        self.active
            .as_ref()
            .map(|active| active.members.borrow().display_names(&self.local_id))
            .unwrap_or_default()
    }

    /// Watch on the membership view. Changes on every broadcast that alters it.
    pub fn subscribe_members(&self) -> Option<watch::Receiver<RoomMembership>> {
        self.active.as_ref().map(|active| active.members.clone())
    }

    pub async fn links(&self) -> Vec<(ParticipantId, LinkStatus)> {
        let Some(active) = &self.active else {
            return Vec::new();
        };
        let (reply, rx) = oneshot::channel();
        if active
            .commands
            .send(SessionCommand::QueryLinks { reply })
            .is_err()
        {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    pub async fn link_state(&self, peer: &ParticipantId) -> Option<LinkStatus> {
        self.links()
            .await
            .into_iter()
            .find(|(id, _)| id == peer)
            .map(|(_, status)| status)
    }
}

async fn join_session(task: impl Future<Output = Result<SessionEnd, JoinError>>) -> SessionEnd {
    match task.await {
        Ok(end) => end,
        Err(e) => {
            warn!("Session task ended abnormally: {}", e);
            SessionEnd::Disconnected(DisconnectReason::Error(e.to_string()))
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            let _ = active.commands.send(SessionCommand::Leave);
        }
    }
}
