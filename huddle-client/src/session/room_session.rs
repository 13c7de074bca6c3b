use crate::media::{AudioOutput, LocalStream};
use crate::peer::{LinkCommand, LinkEvent, LinkFactory, LinkStatus, PeerRegistry};
use crate::room::RoomMembership;
use crate::session::SessionClock;
use crate::transport::{DisconnectReason, SignalingEvents, SignalingSender, TransportEvent};
use huddle_core::{ParticipantId, RoomId, SignalMessage};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    Left,
    Disconnected(DisconnectReason),
}

pub(crate) enum SessionCommand {
    Leave,
    QueryLinks {
        reply: oneshot::Sender<Vec<(ParticipantId, LinkStatus)>>,
    },
}

/// State of one joined room. Lives inside the session task, which is its
/// only mutator.
pub(crate) struct Session {
    local_id: ParticipantId,
    room_id: RoomId,
    membership: RoomMembership,
    registry: PeerRegistry,
    factory: LinkFactory,
    signaling: SignalingSender,
    output: Arc<dyn AudioOutput>,
    members: watch::Sender<RoomMembership>,
}

impl Session {
    pub(crate) fn new(
        local_id: ParticipantId,
        room_id: RoomId,
        factory: LinkFactory,
        signaling: SignalingSender,
        output: Arc<dyn AudioOutput>,
        members: watch::Sender<RoomMembership>,
    ) -> Self {
        Self {
            local_id,
            room_id,
            membership: RoomMembership::new(),
            registry: PeerRegistry::new(),
            factory,
            signaling,
            output,
            members,
        }
    }

    pub(crate) async fn run(
        mut self,
        mut events: SignalingEvents,
        mut link_events: mpsc::UnboundedReceiver<LinkEvent>,
        mut commands: mpsc::UnboundedReceiver<SessionCommand>,
        stream: LocalStream,
        clock: Arc<SessionClock>,
    ) -> SessionEnd {
        info!("Session started in room {} as {}", self.room_id, self.local_id);

        let end = loop {
            tokio::select! {
                event = events.next() => match event {
                    Some(TransportEvent::Message(msg)) => self.handle_signal(msg).await,
                    Some(TransportEvent::Closed(reason)) => break SessionEnd::Disconnected(reason),
                    None => break SessionEnd::Disconnected(DisconnectReason::Normal),
                },
                Some(event) = link_events.recv() => self.handle_link_event(event).await,
                command = commands.recv() => match command {
                    Some(SessionCommand::QueryLinks { reply }) => {
                        let _ = reply.send(self.link_statuses());
                    }
                    Some(SessionCommand::Leave) | None => break SessionEnd::Left,
                },
            }
        };

        self.shutdown(&end).await;
        clock.stop();
        stream.release();
        info!(
            "Session in room {} ended after {}: {:?}",
            self.room_id,
            clock.display(),
            end
        );
        end
    }

    async fn handle_signal(&mut self, msg: SignalMessage) {
        if let Some(room_id) = msg.room_id() {
            if room_id != &self.room_id {
                debug!("Ignoring {} for foreign room {}", msg.kind(), room_id);
                return;
            }
        }

        match msg {
            SignalMessage::RoomUpdate { users, .. } => {
                let diff = self.membership.apply_membership_update(&users);
                debug!(
                    "Room {} now has {} members (+{} -{})",
                    self.room_id,
                    self.membership.len(),
                    diff.joined.len(),
                    diff.left.len()
                );
                self.publish_members();
                for peer in diff.left {
                    self.drop_link(&peer).await;
                }
            }
            SignalMessage::UserJoined { user_id, .. } => {
                if self.membership.note_joined(&user_id) {
                    self.publish_members();
                }
                if user_id == self.local_id {
                    return;
                }
                info!("{} joined room {}", user_id, self.room_id);
                self.dispatch(&user_id, LinkCommand::StartOffer, true).await;
            }
            SignalMessage::UserLeft { user_id, .. } => {
                if self.membership.note_left(&user_id) {
                    self.publish_members();
                }
                info!("{} left room {}", user_id, self.room_id);
                self.drop_link(&user_id).await;
            }
            SignalMessage::Offer {
                user_id,
                target_user_id,
                offer,
                ..
            } => {
                if self.is_for_us(&user_id, &target_user_id) {
                    self.dispatch(&user_id, LinkCommand::RemoteOffer(offer), true)
                        .await;
                }
            }
            SignalMessage::Answer {
                user_id,
                target_user_id,
                answer,
                ..
            } => {
                if self.is_for_us(&user_id, &target_user_id) {
                    self.dispatch(&user_id, LinkCommand::RemoteAnswer(answer), false)
                        .await;
                }
            }
            SignalMessage::IceCandidate {
                user_id,
                target_user_id,
                candidate,
                ..
            } => {
                if self.is_for_us(&user_id, &target_user_id) {
                    self.dispatch(&user_id, LinkCommand::RemoteCandidate(candidate), false)
                        .await;
                }
            }
            SignalMessage::Join { .. } | SignalMessage::Leave { .. } => {
                debug!("Ignoring client-only {} frame", msg.kind());
            }
        }
    }

    fn is_for_us(&self, sender: &ParticipantId, target: &ParticipantId) -> bool {
        target == &self.local_id && sender != &self.local_id
    }

    /// Hands `command` to the link for `peer`. Without a link, one is
    /// created when `create` is set, otherwise the command is dropped.
    async fn dispatch(&mut self, peer: &ParticipantId, command: LinkCommand, create: bool) {
        if !create {
            match self.registry.get(peer) {
                Some(link) => {
                    link.send(command);
                }
                None => debug!("No link to {}, dropping {:?}", peer, command),
            }
            return;
        }

        let factory = &self.factory;
        match self
            .registry
            .get_or_create(peer, |generation| factory.create(peer, generation))
            .await
        {
            Ok((link, created)) => {
                if created {
                    info!("Link to {} created (gen {})", peer, link.generation());
                }
                link.send(command);
            }
            Err(e) => warn!("Could not create link to {}: {}", peer, e),
        }
    }

    async fn handle_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::RemoteTrack {
                peer,
                generation,
                track,
            } => {
                if self.is_current(&peer, generation) {
                    self.output.render(&peer, track);
                } else {
                    debug!("Stale track from {} (gen {})", peer, generation);
                }
            }
            LinkEvent::Failed {
                peer,
                generation,
                error,
            } => {
                if self.is_current(&peer, generation) {
                    warn!("Dropping link to {}: {}", peer, error);
                    self.drop_link(&peer).await;
                }
            }
        }
    }

    fn is_current(&self, peer: &ParticipantId, generation: u64) -> bool {
        self.registry
            .get(peer)
            .is_some_and(|link| link.generation() == generation)
    }

    async fn drop_link(&mut self, peer: &ParticipantId) {
        if self.registry.remove(peer).await {
            self.output.remove(peer);
            info!("Link to {} closed", peer);
        }
    }

    fn link_statuses(&self) -> Vec<(ParticipantId, LinkStatus)> {
        let mut statuses = Vec::with_capacity(self.registry.len());
        self.registry
            .for_each_link(|link| statuses.push((link.remote_id().clone(), link.status())));
        statuses.sort_by(|a, b| a.0.cmp(&b.0));
        statuses
    }

    fn publish_members(&self) {
        self.members.send_replace(self.membership.clone());
    }

    async fn shutdown(&mut self, end: &SessionEnd) {
        if *end == SessionEnd::Left {
            let leave = SignalMessage::Leave {
                room_id: self.room_id.clone(),
                user_id: self.local_id.clone(),
            };
            if let Err(e) = self.signaling.send(leave) {
                debug!("Leave not sent: {}", e);
            }
        }

        for peer in self.registry.close_all().await {
            self.output.remove(&peer);
        }
        self.output.clear();
        self.membership.clear();
        self.publish_members();
    }
}
