use crate::room::{ConnectionId, Room};
use dashmap::DashMap;
use huddle_core::{ParticipantId, RoomId, SignalMessage};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

struct Connection {
    tx: mpsc::UnboundedSender<SignalMessage>,
    membership: Option<(RoomId, ParticipantId)>,
}

struct SignalingInner {
    connections: DashMap<ConnectionId, Connection>,
    rooms: DashMap<RoomId, Room>,
    next_connection: AtomicU64,
}

/// Room hub shared by every WebSocket connection.
///
/// A `rooms` guard may be held while reading `connections`, never the
/// other way round.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl Default for SignalingService {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalingService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                connections: DashMap::new(),
                rooms: DashMap::new(),
                next_connection: AtomicU64::new(1),
            }),
        }
    }

    /// Registers a connection whose outbound frames go to `tx`.
    pub fn register(&self, tx: mpsc::UnboundedSender<SignalMessage>) -> ConnectionId {
        let id = ConnectionId(self.inner.next_connection.fetch_add(1, Ordering::Relaxed));
        self.inner.connections.insert(
            id,
            Connection {
                tx,
                membership: None,
            },
        );
        debug!("Registered {}", id);
        id
    }

    pub fn handle_message(&self, connection: ConnectionId, msg: SignalMessage) {
        match msg {
            SignalMessage::Join { room_id, user_id } => self.join(connection, room_id, user_id),
            SignalMessage::Leave { room_id, user_id } => {
                match self.membership(connection) {
                    Some((current, member)) if current == room_id && member == user_id => {
                        self.leave(connection)
                    }
                    _ => warn!(
                        "{} sent leave for {} in {} it does not hold",
                        connection, user_id, room_id
                    ),
                }
            }
            msg @ (SignalMessage::Offer { .. }
            | SignalMessage::Answer { .. }
            | SignalMessage::IceCandidate { .. }) => self.relay(connection, msg),
            other => warn!("{} sent server-only frame {}", connection, other.kind()),
        }
    }

    /// Drops the connection, leaving its room first.
    pub fn disconnect(&self, connection: ConnectionId) {
        self.leave(connection);
        self.inner.connections.remove(&connection);
        debug!("Unregistered {}", connection);
    }

    pub fn room_members(&self, room_id: &RoomId) -> Vec<ParticipantId> {
        self.inner
            .rooms
            .get(room_id)
            .map(|room| room.user_ids())
            .unwrap_or_default()
    }

    pub fn room_count(&self) -> usize {
        self.inner.rooms.len()
    }

    pub fn connection_count(&self) -> usize {
        self.inner.connections.len()
    }

    fn membership(&self, connection: ConnectionId) -> Option<(RoomId, ParticipantId)> {
        self.inner
            .connections
            .get(&connection)
            .and_then(|c| c.membership.clone())
    }

    fn join(&self, connection: ConnectionId, room_id: RoomId, user_id: ParticipantId) {
        // One room per connection: a second join replaces the first.
        self.leave(connection);

        let Some(tx) = self.inner.connections.get(&connection).map(|c| c.tx.clone()) else {
            warn!("Join from unknown {}", connection);
            return;
        };

        let mut room = self
            .inner
            .rooms
            .entry(room_id.clone())
            .or_insert_with(|| Room::new(room_id.clone()));

        if !room.add(user_id.clone(), connection, tx) {
            warn!("{} is already in room {}, rejecting join", user_id, room_id);
            let empty = room.is_empty();
            drop(room);
            if empty {
                self.inner.rooms.remove_if(&room_id, |_, r| r.is_empty());
            }
            return;
        }

        room.broadcast(&room.snapshot());
        room.broadcast(&SignalMessage::UserJoined {
            room_id: Some(room_id.clone()),
            user_id: user_id.clone(),
        });
        info!("{} joined room {} ({} members)", user_id, room_id, room.len());
        drop(room);

        if let Some(mut c) = self.inner.connections.get_mut(&connection) {
            c.membership = Some((room_id, user_id));
        }
    }

    fn leave(&self, connection: ConnectionId) {
        let Some((room_id, user_id)) = self
            .inner
            .connections
            .get_mut(&connection)
            .and_then(|mut c| c.membership.take())
        else {
            return;
        };

        if let Some(mut room) = self.inner.rooms.get_mut(&room_id) {
            if room.remove(connection).is_some() {
                room.broadcast(&SignalMessage::UserLeft {
                    room_id: Some(room_id.clone()),
                    user_id: user_id.clone(),
                });
                room.broadcast(&room.snapshot());
                info!("{} left room {} ({} members)", user_id, room_id, room.len());
            }
        }

        if self
            .inner
            .rooms
            .remove_if(&room_id, |_, room| room.is_empty())
            .is_some()
        {
            info!("Room {} is empty, dropped", room_id);
        }
    }

    fn relay(&self, connection: ConnectionId, msg: SignalMessage) {
        let Some((room_id, user_id)) = self.membership(connection) else {
            warn!("{} sent {} outside a room", connection, msg.kind());
            return;
        };

        if msg.room_id() != Some(&room_id) || msg.user_id() != Some(&user_id) {
            warn!(
                "Dropping {} from {}: envelope does not match membership",
                msg.kind(),
                user_id
            );
            return;
        }
        let Some(target) = msg.target_user_id().cloned() else {
            return;
        };

        if let Some(room) = self.inner.rooms.get(&room_id) {
            debug!("Relaying {} {} -> {}", msg.kind(), user_id, target);
            room.send_to(&target, msg);
        }
    }
}
