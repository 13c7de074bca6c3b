use crate::config::ClientConfig;
use crate::error::{MediaAccessError, NegotiationError};
use crate::media::{LocalAudioTrack, LocalStream, MediaBackend, MediaEvent, PeerHandle, RemoteTrack};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use huddle_core::{IceCandidate, IceServerConfig, ParticipantId, SdpKind, SessionDescription};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, mpsc};
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MediaEngine};
use webrtc::api::{API, APIBuilder};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::media::Sample;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

const FRAME_DURATION: Duration = Duration::from_millis(20);

// A single Opus frame decoding to 20ms of silence.
static OPUS_SILENCE: [u8; 3] = [0xf8, 0xff, 0xfe];

/// Media backend on top of the `webrtc` crate.
///
/// No capture device is opened: the local track is an Opus sample track fed
/// with silence frames while it is enabled.
#[derive(Debug, Clone)]
pub struct RtcMediaBackend {
    ice_servers: Vec<IceServerConfig>,
}

impl RtcMediaBackend {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self { ice_servers }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.ice_servers.clone())
    }
}

#[async_trait]
impl MediaBackend for RtcMediaBackend {
    async fn acquire_local_audio(&self) -> Result<LocalStream, MediaAccessError> {
        let sink = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48000,
                channels: 2,
                ..Default::default()
            },
            "audio".to_owned(),
            "huddle-mic".to_owned(),
        ));
        let track = Arc::new(LocalAudioTrack::new(
            "audio",
            Arc::clone(&sink) as Arc<dyn std::any::Any + Send + Sync>,
        ));

        let pump = Arc::clone(&track);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(FRAME_DURATION);
            while !pump.is_stopped() {
                ticker.tick().await;
                if !pump.is_enabled() {
                    continue;
                }
                let sample = Sample {
                    data: Bytes::from_static(&OPUS_SILENCE),
                    duration: FRAME_DURATION,
                    ..Default::default()
                };
                if let Err(e) = sink.write_sample(&sample).await {
                    debug!("Dropping local audio frame: {}", e);
                }
            }
            debug!("Local audio pump finished");
        });

        info!("Local audio track ready");
        Ok(LocalStream::new(vec![track]))
    }

    async fn create_handle(
        &self,
        peer: &ParticipantId,
        events: mpsc::UnboundedSender<MediaEvent>,
    ) -> Result<Arc<dyn PeerHandle>, NegotiationError> {
        let handle = RtcPeerHandle::new(peer.clone(), &self.ice_servers, events)
            .await
            .map_err(|e| NegotiationError::Transport(format!("{e:#}")))?;
        Ok(Arc::new(handle))
    }
}

/// One `RTCPeerConnection` toward one participant.
///
/// Rollback replaces the connection with a fresh one carrying the same
/// tracks. Callbacks of a replaced connection are muted through `epoch`.
pub struct RtcPeerHandle {
    peer_id: ParticipantId,
    api: API,
    ice_servers: Vec<RTCIceServer>,
    events: mpsc::UnboundedSender<MediaEvent>,
    connection: RwLock<Arc<RTCPeerConnection>>,
    epoch: Arc<AtomicU64>,
    tracks: Mutex<Vec<Arc<TrackLocalStaticSample>>>,
    closed: AtomicBool,
}

impl RtcPeerHandle {
    pub async fn new(
        peer_id: ParticipantId,
        ice_servers: &[IceServerConfig],
        events: mpsc::UnboundedSender<MediaEvent>,
    ) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let ice_servers: Vec<RTCIceServer> = ice_servers
            .iter()
            .map(|s| RTCIceServer {
                urls: s.urls.clone(),
                username: s.username.clone().unwrap_or_default(),
                credential: s.credential.clone().unwrap_or_default(),
            })
            .collect();

        let epoch = Arc::new(AtomicU64::new(0));
        let connection = open_connection(&api, &ice_servers, &peer_id, &events, &epoch, 0)
            .await
            .with_context(|| format!("Failed to open peer connection to {peer_id}"))?;

        Ok(Self {
            peer_id,
            api,
            ice_servers,
            events,
            connection: RwLock::new(connection),
            epoch,
            tracks: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }

    async fn current(&self) -> Arc<RTCPeerConnection> {
        Arc::clone(&*self.connection.read().await)
    }
}

async fn open_connection(
    api: &API,
    ice_servers: &[RTCIceServer],
    peer_id: &ParticipantId,
    events: &mpsc::UnboundedSender<MediaEvent>,
    epoch: &Arc<AtomicU64>,
    generation: u64,
) -> Result<Arc<RTCPeerConnection>> {
    let rtc_config = RTCConfiguration {
        ice_servers: ice_servers.to_vec(),
        ..Default::default()
    };
    let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

    let state_tx = events.clone();
    let state_epoch = Arc::clone(epoch);
    let uid_state = peer_id.clone();
    peer_connection.on_peer_connection_state_change(Box::new(
        move |s: RTCPeerConnectionState| {
            let tx = state_tx.clone();
            let live = state_epoch.load(Ordering::SeqCst) == generation;
            let uid = uid_state.clone();

            Box::pin(async move {
                if !live {
                    return;
                }
                info!("Peer connection state for {}: {:?}", uid, s);
                match s {
                    RTCPeerConnectionState::Connected => {
                        let _ = tx.send(MediaEvent::PathEstablished);
                    }
                    RTCPeerConnectionState::Failed => {
                        let _ = tx.send(MediaEvent::TransportFailed(format!(
                            "connection to {uid} failed"
                        )));
                    }
                    _ => {}
                }
            })
        },
    ));

    let ice_tx = events.clone();
    let ice_epoch = Arc::clone(epoch);
    peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
        let tx = ice_tx.clone();
        let live = ice_epoch.load(Ordering::SeqCst) == generation;

        Box::pin(async move {
            let Some(candidate) = c else { return };
            if !live {
                return;
            }
            let Ok(init) = candidate.to_json() else {
                return;
            };
            let _ = tx.send(MediaEvent::LocalCandidate(IceCandidate {
                candidate: init.candidate,
                sdp_mid: init.sdp_mid,
                sdp_m_line_index: init.sdp_mline_index,
                username_fragment: init.username_fragment,
            }));
        })
    }));

    let track_tx = events.clone();
    let track_epoch = Arc::clone(epoch);
    let uid_track = peer_id.clone();
    peer_connection.on_track(Box::new(move |track, _receiver, _transceiver| {
        let tx = track_tx.clone();
        let live = track_epoch.load(Ordering::SeqCst) == generation;
        let uid = uid_track.clone();

        Box::pin(async move {
            if !live {
                return;
            }
            debug!("Remote track from {}: ssrc={}", uid, track.ssrc());
            let _ = tx.send(MediaEvent::RemoteTrack(RemoteTrack {
                id: format!("{}-{}", uid, track.ssrc()),
                media: track,
            }));
        })
    }));

    Ok(peer_connection)
}

fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription, NegotiationError> {
    let res = match desc.kind {
        SdpKind::Offer => RTCSessionDescription::offer(desc.sdp),
        SdpKind::Answer => RTCSessionDescription::answer(desc.sdp),
    };
    res.map_err(|e| NegotiationError::Description(e.to_string()))
}

#[async_trait]
impl PeerHandle for RtcPeerHandle {
    async fn attach_track(&self, track: Arc<LocalAudioTrack>) -> Result<(), NegotiationError> {
        let Some(sink) = track.source::<TrackLocalStaticSample>() else {
            return Err(NegotiationError::Track(format!(
                "track {} was not created by this backend",
                track.id()
            )));
        };

        self.current()
            .await
            .add_track(Arc::clone(&sink) as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .map_err(|e| NegotiationError::Track(e.to_string()))?;
        self.tracks.lock().await.push(sink);
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError> {
        let offer = self
            .current()
            .await
            .create_offer(None)
            .await
            .map_err(|e| NegotiationError::Description(e.to_string()))?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError> {
        let answer = self
            .current()
            .await
            .create_answer(None)
            .await
            .map_err(|e| NegotiationError::Description(e.to_string()))?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), NegotiationError> {
        let desc = to_rtc(desc)?;
        self.current()
            .await
            .set_local_description(desc)
            .await
            .map_err(|e| NegotiationError::Description(e.to_string()))
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), NegotiationError> {
        let desc = to_rtc(desc)?;
        self.current()
            .await
            .set_remote_description(desc)
            .await
            .map_err(|e| NegotiationError::Description(e.to_string()))
    }

    async fn add_candidate(&self, candidate: IceCandidate) -> Result<(), NegotiationError> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.current()
            .await
            .add_ice_candidate(init)
            .await
            .map_err(|e| NegotiationError::Candidate(e.to_string()))
    }

    async fn rollback(&self) -> Result<(), NegotiationError> {
        let mut connection = self.connection.write().await;
        let generation = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        let fresh = open_connection(
            &self.api,
            &self.ice_servers,
            &self.peer_id,
            &self.events,
            &self.epoch,
            generation,
        )
        .await
        .map_err(|e| NegotiationError::Transport(format!("{e:#}")))?;

        for sink in self.tracks.lock().await.iter() {
            fresh
                .add_track(Arc::clone(sink) as Arc<dyn TrackLocal + Send + Sync>)
                .await
                .map_err(|e| NegotiationError::Track(e.to_string()))?;
        }

        let stale = std::mem::replace(&mut *connection, fresh);
        if let Err(e) = stale.close().await {
            debug!("Closing rolled back connection to {}: {}", self.peer_id, e);
        }
        info!("Rolled back pending offer to {}", self.peer_id);
        Ok(())
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.current().await.close().await {
            warn!("Failed to close connection to {}: {}", self.peer_id, e);
        }
    }
}
