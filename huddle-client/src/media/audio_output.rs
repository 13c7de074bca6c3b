use crate::media::RemoteTrack;
use huddle_core::ParticipantId;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;

/// Where remote audio ends up.
pub trait AudioOutput: Send + Sync {
    fn render(&self, peer: &ParticipantId, track: RemoteTrack);

    fn remove(&self, peer: &ParticipantId);

    fn clear(&self);
}

/// Keeps track of what would be playing and logs changes. Used where no
/// playback device is wired in.
#[derive(Debug, Default)]
pub struct LoggingOutput {
    rendered: Mutex<HashMap<ParticipantId, String>>,
}

impl LoggingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rendered(&self) -> Vec<ParticipantId> {
        let mut peers: Vec<_> = self
            .rendered
            .lock()
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default();
        peers.sort();
        peers
    }
}

impl AudioOutput for LoggingOutput {
    fn render(&self, peer: &ParticipantId, track: RemoteTrack) {
        info!("Playing audio from {} (track {})", peer, track.id);
        if let Ok(mut rendered) = self.rendered.lock() {
            rendered.insert(peer.clone(), track.id);
        }
    }

    fn remove(&self, peer: &ParticipantId) {
        let removed = self
            .rendered
            .lock()
            .map(|mut r| r.remove(peer).is_some())
            .unwrap_or(false);
        if removed {
            info!("Stopped audio from {}", peer);
        }
    }

    fn clear(&self) {
        if let Ok(mut rendered) = self.rendered.lock() {
            rendered.clear();
        }
    }
}
