use huddle_client::media::MediaEvent;
use huddle_client::peer::{NegotiationRole, NegotiationState};
use huddle_core::{IceCandidate, SdpKind, SessionDescription, SignalMessage};

use crate::integration::init_tracing;
use crate::utils::{EngineHarness, HandleCall};

#[tokio::test]
async fn test_responder_answers_offer() {
    init_tracing();
    let mut h = EngineHarness::new("bob", "alice").await;

    h.engine
        .handle_remote_offer(SessionDescription::offer("o1"))
        .await
        .unwrap();

    assert_eq!(h.engine.state(), NegotiationState::AnswerSent);
    assert_eq!(h.engine.role(), NegotiationRole::Responder);
    assert_eq!(
        h.handle.calls(),
        vec![
            HandleCall::SetRemote(SdpKind::Offer),
            HandleCall::AttachTrack("mic".into()),
            HandleCall::CreateAnswer,
            HandleCall::SetLocal(SdpKind::Answer),
        ]
    );

    let sent = h.sent();
    assert!(matches!(sent.as_slice(), [SignalMessage::Answer { .. }]));
}

#[tokio::test]
async fn test_path_established_connects_responder() {
    init_tracing();
    let mut h = EngineHarness::new("bob", "alice").await;
    h.engine
        .handle_remote_offer(SessionDescription::offer("o1"))
        .await
        .unwrap();

    h.engine.on_media_event(MediaEvent::PathEstablished).unwrap();

    assert_eq!(h.engine.state(), NegotiationState::Connected);
}

#[tokio::test]
async fn test_duplicate_offer_after_answer_is_discarded() {
    init_tracing();
    let mut h = EngineHarness::new("bob", "alice").await;
    h.engine
        .handle_remote_offer(SessionDescription::offer("o1"))
        .await
        .unwrap();
    h.sent();

    h.engine
        .handle_remote_offer(SessionDescription::offer("o1"))
        .await
        .unwrap();

    assert_eq!(h.engine.state(), NegotiationState::AnswerSent);
    assert_eq!(h.handle.count(&HandleCall::CreateAnswer), 1);
    assert!(h.sent().is_empty());
}

#[tokio::test]
async fn test_local_candidates_are_forwarded() {
    init_tracing();
    let mut h = EngineHarness::new("bob", "alice").await;

    h.engine
        .on_media_event(MediaEvent::LocalCandidate(IceCandidate::new("candidate:9")))
        .unwrap();

    let sent = h.sent();
    let [SignalMessage::IceCandidate {
        target_user_id,
        candidate,
        ..
    }] = sent.as_slice()
    else {
        panic!("expected one candidate, got {:?}", sent);
    };
    assert_eq!(target_user_id.as_str(), "alice");
    assert_eq!(candidate.candidate, "candidate:9");
}
