use huddle_client::{ClientConfig, MediaAccessError, SessionController, SessionEnd, SessionError};
use huddle_core::{ParticipantId, RoomId, SignalMessage};
use std::time::Duration;

use super::{Joined, LOCAL};
use crate::integration::init_tracing;
use crate::utils::{MockMediaBackend, RecordingOutput, ScriptedConnector, next_sent};

#[tokio::test]
async fn test_join_then_leave() {
    init_tracing();
    let mut s = Joined::new(MockMediaBackend::new()).await;

    assert!(s.controller.is_active());
    assert_eq!(s.controller.room_id(), Some(&RoomId::from("R1")));

    let again = s.controller.join("R2").await;
    assert!(matches!(again, Err(SessionError::AlreadyInRoom(room)) if room == RoomId::from("R1")));

    let end = s.controller.leave().await.unwrap();
    assert_eq!(end, SessionEnd::Left);
    assert_eq!(
        next_sent(&mut s.endpoint).await,
        SignalMessage::Leave {
            room_id: RoomId::from("R1"),
            user_id: ParticipantId::from(LOCAL),
        }
    );

    assert!(s.backend.all_released());
    assert!(!s.controller.is_active());
    assert_eq!(s.controller.elapsed_seconds(), 0);
    assert!(s.controller.members().is_empty());
    assert!(matches!(
        s.controller.leave().await,
        Err(SessionError::NotInRoom)
    ));
}

#[tokio::test]
async fn test_denied_microphone_aborts_join() {
    init_tracing();
    let backend = MockMediaBackend::new();
    backend.deny_audio();
    let (connector, _endpoints) = ScriptedConnector::new();
    let mut controller = SessionController::new(
        ClientConfig::default(),
        backend.clone(),
        connector.clone(),
        RecordingOutput::new(),
    );

    let res = controller.join("R1").await;
    assert!(matches!(
        res,
        Err(SessionError::MediaAccess(MediaAccessError::Denied))
    ));
    assert_eq!(connector.attempts(), 0);
    assert!(!controller.is_active());
}

#[tokio::test]
async fn test_refused_connection_releases_microphone() {
    init_tracing();
    let backend = MockMediaBackend::new();
    let (connector, _endpoints) = ScriptedConnector::new();
    connector.refuse();
    let mut controller = SessionController::new(
        ClientConfig::default(),
        backend.clone(),
        connector.clone(),
        RecordingOutput::new(),
    );

    let res = controller.join("R1").await;
    assert!(matches!(res, Err(SessionError::SignalingConnect(_))));
    assert_eq!(backend.local_tracks().len(), 1);
    assert!(backend.all_released());
    assert!(!controller.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_elapsed_time_counts_from_join() {
    init_tracing();
    let mut s = Joined::new(MockMediaBackend::new()).await;

    tokio::time::advance(Duration::from_secs(65)).await;
    assert_eq!(s.controller.elapsed_seconds(), 65);
    assert_eq!(s.controller.elapsed_display(), "1:05");

    s.controller.leave().await.unwrap();
    assert_eq!(s.controller.elapsed_display(), "0:00");
}
