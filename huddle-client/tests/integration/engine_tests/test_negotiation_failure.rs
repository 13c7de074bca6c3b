use huddle_client::media::MediaEvent;
use huddle_client::peer::NegotiationState;
use huddle_client::NegotiationError;
use huddle_core::SessionDescription;

use crate::integration::init_tracing;
use crate::utils::{EngineHarness, FailPoint, HandleCall};

#[tokio::test]
async fn test_answer_failure_surfaces_error() {
    init_tracing();
    let mut h = EngineHarness::failing("bob", "alice", FailPoint::CreateAnswer).await;

    let err = h
        .engine
        .handle_remote_offer(SessionDescription::offer("o1"))
        .await
        .unwrap_err();
    assert!(matches!(err, NegotiationError::Description(_)));
    assert!(h.sent().is_empty());

    h.engine.fail(&err);
    assert_eq!(h.engine.state(), NegotiationState::Failed);

    h.engine
        .handle_remote_offer(SessionDescription::offer("o2"))
        .await
        .unwrap();
    assert_eq!(h.handle.count(&HandleCall::CreateAnswer), 1);
}

#[tokio::test]
async fn test_transport_failure_is_an_error() {
    init_tracing();
    let mut h = EngineHarness::new("alice", "bob").await;
    h.engine.start_offer().await.unwrap();

    let res = h
        .engine
        .on_media_event(MediaEvent::TransportFailed("ice failed".into()));
    assert_eq!(
        res,
        Err(NegotiationError::TransportFailed("ice failed".into()))
    );
}

#[tokio::test]
async fn test_close_is_terminal() {
    init_tracing();
    let mut h = EngineHarness::new("alice", "bob").await;
    h.engine.close();

    assert_eq!(h.engine.state(), NegotiationState::Closed);
    h.engine
        .handle_remote_answer(SessionDescription::answer("a"))
        .await
        .unwrap();
    h.engine.start_offer().await.unwrap();
    assert!(h.handle.calls().is_empty());
}
