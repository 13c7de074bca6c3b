use huddle_core::{ParticipantId, RoomId, SignalMessage};
use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Server-side handle of one WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

struct Member {
    user_id: ParticipantId,
    connection: ConnectionId,
    tx: mpsc::UnboundedSender<SignalMessage>,
}

/// Members of one room in join order, each with its outbound queue.
pub struct Room {
    id: RoomId,
    members: Vec<Member>,
}

impl Room {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            members: Vec::new(),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn user_ids(&self) -> Vec<ParticipantId> {
        self.members.iter().map(|m| m.user_id.clone()).collect()
    }

    pub fn contains(&self, user_id: &ParticipantId) -> bool {
        self.members.iter().any(|m| &m.user_id == user_id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns false if `user_id` is already taken in this room.
    pub fn add(
        &mut self,
        user_id: ParticipantId,
        connection: ConnectionId,
        tx: mpsc::UnboundedSender<SignalMessage>,
    ) -> bool {
        if self.contains(&user_id) {
            return false;
        }
        self.members.push(Member {
            user_id,
            connection,
            tx,
        });
        true
    }

    pub fn remove(&mut self, connection: ConnectionId) -> Option<ParticipantId> {
        let idx = self.members.iter().position(|m| m.connection == connection)?;
        Some(self.members.remove(idx).user_id)
    }

    pub fn broadcast(&self, msg: &SignalMessage) {
        for member in &self.members {
            if member.tx.send(msg.clone()).is_err() {
                debug!("{} in room {} is gone", member.user_id, self.id);
            }
        }
    }

    pub fn snapshot(&self) -> SignalMessage {
        SignalMessage::RoomUpdate {
            room_id: Some(self.id.clone()),
            users: self.user_ids(),
        }
    }

    /// Delivers a point-to-point frame. Returns false when the target is
    /// not in this room.
    pub fn send_to(&self, target: &ParticipantId, msg: SignalMessage) -> bool {
        let Some(member) = self.members.iter().find(|m| &m.user_id == target) else {
            warn!("Dropping {} for {}: not in room {}", msg.kind(), target, self.id);
            return false;
        };
        if member.tx.send(msg).is_err() {
            debug!("{} in room {} is gone", target, self.id);
        }
        true
    }
}
