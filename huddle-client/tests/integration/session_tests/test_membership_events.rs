use huddle_client::{NegotiationRole, NegotiationState};
use huddle_core::{ParticipantId, RoomId, SessionDescription, SignalMessage};
use std::time::Duration;

use super::{Joined, LOCAL};
use crate::integration::init_tracing;
use crate::utils::{
    MockMediaBackend, WAIT_TIMEOUT_MS, wait_for_link_state, wait_for_no_link, wait_until,
};

#[tokio::test]
async fn test_snapshot_updates_view_without_links() {
    init_tracing();
    let s = Joined::new(MockMediaBackend::new()).await;

    s.room_update(&["bobby", LOCAL]);
    assert!(wait_until(WAIT_TIMEOUT_MS, || s.controller.members().len() == 2).await);
    assert_eq!(
        s.controller.display_names(),
        vec!["User bobb".to_owned(), "You".to_owned()]
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(s.controller.links().await.is_empty());
}

#[tokio::test]
async fn test_user_joined_starts_offer() {
    init_tracing();
    let mut s = Joined::new(MockMediaBackend::new()).await;

    s.user_joined("carol");
    let offer = s.next_sent_kind("offer").await;
    assert_eq!(offer.target_user_id(), Some(&ParticipantId::from("carol")));
    assert!(wait_for_link_state(&s.controller, "carol", NegotiationState::OfferSent).await);

    s.answer_from("carol");
    assert!(wait_for_link_state(&s.controller, "carol", NegotiationState::Connected).await);
    let status = s
        .controller
        .link_state(&ParticipantId::from("carol"))
        .await
        .unwrap();
    assert_eq!(status.role, NegotiationRole::Initiator);
    assert!(wait_until(WAIT_TIMEOUT_MS, || s.output.is_playing("carol")).await);

    s.user_left("carol");
    assert!(wait_for_no_link(&s.controller, "carol").await);
    assert!(wait_until(WAIT_TIMEOUT_MS, || s.output.was_removed("carol")).await);
    assert!(s.backend.handle_for("carol").unwrap().is_closed());
}

#[tokio::test]
async fn test_own_join_event_creates_nothing() {
    init_tracing();
    let s = Joined::new(MockMediaBackend::new()).await;

    s.room_update(&[LOCAL]);
    s.user_joined(LOCAL);

    assert!(wait_until(WAIT_TIMEOUT_MS, || s.controller.members().len() == 1).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(s.controller.links().await.is_empty());
    assert!(s.backend.handles().is_empty());
}

#[tokio::test]
async fn test_offer_from_unknown_peer_creates_responder() {
    init_tracing();
    let mut s = Joined::new(MockMediaBackend::new()).await;

    s.offer_from("dave");
    let answer = s.next_sent_kind("answer").await;
    assert_eq!(answer.target_user_id(), Some(&ParticipantId::from("dave")));

    assert!(wait_for_link_state(&s.controller, "dave", NegotiationState::Connected).await);
    let status = s
        .controller
        .link_state(&ParticipantId::from("dave"))
        .await
        .unwrap();
    assert_eq!(status.role, NegotiationRole::Responder);
}

#[tokio::test]
async fn test_unroutable_messages_are_dropped() {
    init_tracing();
    let s = Joined::new(MockMediaBackend::new()).await;

    // No link to zed: an answer must not create one.
    s.answer_from("zed");
    // Offer addressed to someone else.
    s.deliver(SignalMessage::Offer {
        room_id: RoomId::from("R1"),
        user_id: ParticipantId::from("erin"),
        target_user_id: ParticipantId::from("frank"),
        offer: SessionDescription::offer("x"),
    });
    // Offer for another room.
    s.deliver(SignalMessage::Offer {
        room_id: RoomId::from("R9"),
        user_id: ParticipantId::from("gina"),
        target_user_id: ParticipantId::from(LOCAL),
        offer: SessionDescription::offer("x"),
    });
    s.user_left("nobody");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(s.controller.links().await.is_empty());
    assert!(s.backend.handles().is_empty());
    assert!(s.controller.is_active());
}

#[tokio::test]
async fn test_snapshot_departure_closes_link() {
    init_tracing();
    let s = Joined::new(MockMediaBackend::new()).await;

    s.room_update(&[LOCAL, "hank"]);
    s.offer_from("hank");
    assert!(wait_for_link_state(&s.controller, "hank", NegotiationState::Connected).await);

    s.room_update(&[LOCAL]);
    assert!(wait_for_no_link(&s.controller, "hank").await);
    assert!(s.backend.handle_for("hank").unwrap().is_closed());
}

#[tokio::test]
async fn test_member_watch_follows_broadcasts() {
    init_tracing();
    let s = Joined::new(MockMediaBackend::new()).await;
    let mut members = s.controller.subscribe_members().unwrap();

    s.room_update(&[LOCAL, "olga"]);
    tokio::time::timeout(Duration::from_secs(2), members.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(members.borrow_and_update().len(), 2);

    s.user_left("olga");
    tokio::time::timeout(Duration::from_secs(2), members.changed())
        .await
        .unwrap()
        .unwrap();
    let view = members.borrow_and_update().clone();
    assert!(view.contains(&ParticipantId::from(LOCAL)));
    assert!(!view.contains(&ParticipantId::from("olga")));
}
