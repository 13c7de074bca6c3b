mod audio_output;
mod backend;
mod local_stream;
#[cfg(feature = "webrtc-backend")]
mod rtc;

pub use audio_output::{AudioOutput, LoggingOutput};
pub use backend::{MediaBackend, MediaEvent, PeerHandle, RemoteTrack};
pub use local_stream::{LocalAudioTrack, LocalStream};
#[cfg(feature = "webrtc-backend")]
pub use rtc::{RtcMediaBackend, RtcPeerHandle};
