use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// One captured audio track. The backend-specific sink lives in `source`.
pub struct LocalAudioTrack {
    id: String,
    enabled: AtomicBool,
    stopped: AtomicBool,
    source: Arc<dyn Any + Send + Sync>,
}

impl LocalAudioTrack {
    pub fn new(id: impl Into<String>, source: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            id: id.into(),
            enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
            source,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// A disabled track keeps its place in every link but carries silence.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            debug!("Local track {} stopped", self.id);
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Backend sink, if it is of type `T`.
    pub fn source<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.source).downcast::<T>().ok()
    }
}

impl fmt::Debug for LocalAudioTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalAudioTrack")
            .field("id", &self.id)
            .field("enabled", &self.is_enabled())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// The local capture stream. Owned by the session; links borrow its tracks.
/// Dropping it releases the device.
#[derive(Debug)]
pub struct LocalStream {
    tracks: Vec<Arc<LocalAudioTrack>>,
}

impl LocalStream {
    pub fn new(tracks: Vec<Arc<LocalAudioTrack>>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[Arc<LocalAudioTrack>] {
        &self.tracks
    }

    pub fn set_muted(&self, muted: bool) {
        for track in &self.tracks {
            track.set_enabled(!muted);
        }
    }

    pub fn is_muted(&self) -> bool {
        !self.tracks.iter().any(|t| t.is_enabled())
    }

    pub fn release(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }

    pub fn is_released(&self) -> bool {
        self.tracks.iter().all(|t| t.is_stopped())
    }
}

impl Drop for LocalStream {
    fn drop(&mut self) {
        self.release();
    }
}
