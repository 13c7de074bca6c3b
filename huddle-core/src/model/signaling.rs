use crate::model::participant::ParticipantId;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

/// Negotiation description exchanged between two clients, in the same
/// `{type, sdp}` shape browsers use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Network candidate, kept opaque apart from the fields needed to route it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(
        rename = "sdpMLineIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
            username_fragment: None,
        }
    }
}

/// One signaling frame. Serialized as a single JSON object whose `type`
/// field selects the variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SignalMessage {
    Join {
        room_id: RoomId,
        user_id: ParticipantId,
    },
    Leave {
        room_id: RoomId,
        user_id: ParticipantId,
    },
    RoomUpdate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<RoomId>,
        users: Vec<ParticipantId>,
    },
    UserJoined {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<RoomId>,
        user_id: ParticipantId,
    },
    UserLeft {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<RoomId>,
        user_id: ParticipantId,
    },
    Offer {
        room_id: RoomId,
        user_id: ParticipantId,
        target_user_id: ParticipantId,
        offer: SessionDescription,
    },
    Answer {
        room_id: RoomId,
        user_id: ParticipantId,
        target_user_id: ParticipantId,
        answer: SessionDescription,
    },
    IceCandidate {
        room_id: RoomId,
        user_id: ParticipantId,
        target_user_id: ParticipantId,
        candidate: IceCandidate,
    },
}

impl SignalMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            SignalMessage::Join { .. } => "join",
            SignalMessage::Leave { .. } => "leave",
            SignalMessage::RoomUpdate { .. } => "roomUpdate",
            SignalMessage::UserJoined { .. } => "userJoined",
            SignalMessage::UserLeft { .. } => "userLeft",
            SignalMessage::Offer { .. } => "offer",
            SignalMessage::Answer { .. } => "answer",
            SignalMessage::IceCandidate { .. } => "iceCandidate",
        }
    }

    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            SignalMessage::Join { room_id, .. }
            | SignalMessage::Leave { room_id, .. }
            | SignalMessage::Offer { room_id, .. }
            | SignalMessage::Answer { room_id, .. }
            | SignalMessage::IceCandidate { room_id, .. } => Some(room_id),
            SignalMessage::RoomUpdate { room_id, .. }
            | SignalMessage::UserJoined { room_id, .. }
            | SignalMessage::UserLeft { room_id, .. } => room_id.as_ref(),
        }
    }

    /// Participant the message is about: the sender for client frames,
    /// the subject for `userJoined`/`userLeft`.
    pub fn user_id(&self) -> Option<&ParticipantId> {
        match self {
            SignalMessage::RoomUpdate { .. } => None,
            SignalMessage::Join { user_id, .. }
            | SignalMessage::Leave { user_id, .. }
            | SignalMessage::UserJoined { user_id, .. }
            | SignalMessage::UserLeft { user_id, .. }
            | SignalMessage::Offer { user_id, .. }
            | SignalMessage::Answer { user_id, .. }
            | SignalMessage::IceCandidate { user_id, .. } => Some(user_id),
        }
    }

    /// Addressee of point-to-point frames.
    pub fn target_user_id(&self) -> Option<&ParticipantId> {
        match self {
            SignalMessage::Offer { target_user_id, .. }
            | SignalMessage::Answer { target_user_id, .. }
            | SignalMessage::IceCandidate { target_user_id, .. } => Some(target_user_id),
            _ => None,
        }
    }
}
