use huddle_client::{ClientConfig, NegotiationRole, NegotiationState, SessionEnd};
use huddle_core::ParticipantId;

use super::TestPeer;
use crate::integration::init_tracing;
use crate::utils::{
    HubConnector, WAIT_TIMEOUT_MS, wait_for_link_state, wait_for_no_link, wait_until,
};

#[tokio::test]
async fn test_two_peers_connect() {
    init_tracing();
    let hub = HubConnector::new();
    let mut alice = TestPeer::new("alice", ClientConfig::default(), hub.clone());
    let mut bruno = TestPeer::new("bruno", ClientConfig::default(), hub.clone());

    alice.join_and_settle("R1").await;
    bruno.join_and_settle("R1").await;

    assert!(wait_for_link_state(&alice.controller, "bruno", NegotiationState::Connected).await);
    assert!(wait_for_link_state(&bruno.controller, "alice", NegotiationState::Connected).await);

    // The member already in the room offers to the newcomer.
    let a_to_b = alice
        .controller
        .link_state(&ParticipantId::from("bruno"))
        .await
        .unwrap();
    let b_to_a = bruno
        .controller
        .link_state(&ParticipantId::from("alice"))
        .await
        .unwrap();
    assert_eq!(a_to_b.role, NegotiationRole::Initiator);
    assert_eq!(b_to_a.role, NegotiationRole::Responder);

    assert!(wait_until(WAIT_TIMEOUT_MS, || alice.output.is_playing("bruno")).await);
    assert!(wait_until(WAIT_TIMEOUT_MS, || bruno.output.is_playing("alice")).await);
    assert_eq!(
        hub.service.room_members(&"R1".into()),
        vec![ParticipantId::from("alice"), ParticipantId::from("bruno")]
    );

    assert_eq!(bruno.controller.leave().await.unwrap(), SessionEnd::Left);
    assert!(wait_for_no_link(&alice.controller, "bruno").await);
    assert!(wait_until(WAIT_TIMEOUT_MS, || alice.output.was_removed("bruno")).await);
    assert!(wait_until(WAIT_TIMEOUT_MS, || alice.controller.members().len() == 1).await);

    alice.controller.leave().await.unwrap();
    assert!(wait_until(WAIT_TIMEOUT_MS, || hub.service.room_count() == 0).await);
}

#[tokio::test]
async fn test_three_peer_mesh() {
    init_tracing();
    let hub = HubConnector::new();
    let ids = ["ann", "ben", "cat"];
    let mut peers: Vec<TestPeer> = ids
        .iter()
        .map(|id| TestPeer::new(id, ClientConfig::default(), hub.clone()))
        .collect();

    for peer in peers.iter_mut() {
        peer.join_and_settle("R1").await;
    }

    for (peer, me) in peers.iter().zip(ids) {
        for other in ids.iter().filter(|id| **id != me) {
            assert!(
                wait_for_link_state(&peer.controller, other, NegotiationState::Connected).await,
                "{me} -> {other} never connected"
            );
        }
        assert_eq!(peer.controller.links().await.len(), 2);
        assert!(wait_until(WAIT_TIMEOUT_MS, || peer.output.playing_count() == 2).await);
    }

    let mut cat = peers.pop().unwrap();
    cat.controller.leave().await.unwrap();
    assert!(cat.backend.all_released());

    for peer in &peers {
        assert!(wait_for_no_link(&peer.controller, "cat").await);
        assert_eq!(peer.controller.links().await.len(), 1);
        assert!(wait_until(WAIT_TIMEOUT_MS, || peer.output.playing_count() == 1).await);
    }
}

#[tokio::test]
async fn test_rooms_do_not_mix() {
    init_tracing();
    let hub = HubConnector::new();
    let mut left = TestPeer::new("lena", ClientConfig::default(), hub.clone());
    let mut right = TestPeer::new("rudi", ClientConfig::default(), hub.clone());

    left.join_and_settle("R1").await;
    right.join_and_settle("R2").await;

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(left.controller.links().await.is_empty());
    assert!(right.controller.links().await.is_empty());
    assert_eq!(left.controller.members(), vec![ParticipantId::from("lena")]);
    assert_eq!(hub.service.room_count(), 2);
}
