use huddle_client::peer::NegotiationState;
use huddle_client::NegotiationError;
use huddle_core::{IceCandidate, SdpKind, SessionDescription};

use crate::integration::init_tracing;
use crate::utils::{EngineHarness, HandleCall};

#[tokio::test]
async fn test_early_candidates_flush_in_order() {
    init_tracing();
    let mut h = EngineHarness::new("bob", "alice").await;

    for n in 1..=3 {
        h.engine
            .handle_remote_candidate(IceCandidate::new(format!("c{n}")))
            .await
            .unwrap();
    }
    assert_eq!(h.engine.pending_candidates(), 3);
    assert!(h.handle.calls().is_empty());

    h.engine
        .handle_remote_offer(SessionDescription::offer("o1"))
        .await
        .unwrap();

    let calls = h.handle.calls();
    assert_eq!(
        &calls[..4],
        &[
            HandleCall::SetRemote(SdpKind::Offer),
            HandleCall::AddCandidate("c1".into()),
            HandleCall::AddCandidate("c2".into()),
            HandleCall::AddCandidate("c3".into()),
        ]
    );
    assert_eq!(h.engine.pending_candidates(), 0);
}

#[tokio::test]
async fn test_initiator_flushes_after_answer() {
    init_tracing();
    let mut h = EngineHarness::new("alice", "bob").await;
    h.engine.start_offer().await.unwrap();

    h.engine
        .handle_remote_candidate(IceCandidate::new("early"))
        .await
        .unwrap();
    assert_eq!(h.handle.count(&HandleCall::AddCandidate("early".into())), 0);

    h.engine
        .handle_remote_answer(SessionDescription::answer("a1"))
        .await
        .unwrap();
    h.engine
        .handle_remote_candidate(IceCandidate::new("late"))
        .await
        .unwrap();

    let calls = h.handle.calls();
    let tail = &calls[calls.len() - 3..];
    assert_eq!(
        tail,
        &[
            HandleCall::SetRemote(SdpKind::Answer),
            HandleCall::AddCandidate("early".into()),
            HandleCall::AddCandidate("late".into()),
        ]
    );
}

#[tokio::test]
async fn test_candidates_dropped_once_failed() {
    init_tracing();
    let mut h = EngineHarness::new("bob", "alice").await;
    h.engine
        .handle_remote_candidate(IceCandidate::new("queued"))
        .await
        .unwrap();

    h.engine.fail(&NegotiationError::TransportFailed("gone".into()));
    assert_eq!(h.engine.state(), NegotiationState::Failed);
    assert_eq!(h.engine.pending_candidates(), 0);

    h.engine
        .handle_remote_candidate(IceCandidate::new("late"))
        .await
        .unwrap();
    assert_eq!(h.engine.pending_candidates(), 0);
    assert!(h.handle.calls().is_empty());
}
