//! Integration tests for the gateway's intent routing.
//!
//! The gateway sits between parsed intents and session tasks; these tests
//! feed it intents directly, with channels standing in for connections.

use tambola_core::{ClaimPattern, PlayerId, SessionId};
use tambola_proto::{ClientIntent, ErrorKind, ServerMessage};
use tokio::sync::mpsc;
use tambola_server::{ConnectionCtx, ConnectionHandle, Gateway, SessionRegistry};

fn connection(conn_id: u64) -> (ConnectionCtx, mpsc::UnboundedReceiver<ServerMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ConnectionCtx::new(ConnectionHandle::new(conn_id, tx)), rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut messages = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        messages.push(msg);
    }
    messages
}

#[tokio::test]
async fn create_intent_creates_joins_and_acknowledges() {
    let gateway = Gateway::new(SessionRegistry::new());
    let (mut ctx, mut rx) = connection(1);

    gateway
        .handle_intent(
            &mut ctx,
            ClientIntent::Create { host_id: PlayerId(1), host_name: "host".to_string() },
        )
        .await;

    let messages = drain(&mut rx);
    let session_id = messages
        .iter()
        .find_map(|m| match m {
            ServerMessage::Created { session_id } => Some(*session_id),
            _ => None,
        })
        .expect("no created ack");

    assert_eq!(ctx.membership(), Some((session_id, PlayerId(1))));
    assert!(messages.iter().any(|m| matches!(m, ServerMessage::State { .. })));
    assert_eq!(gateway.registry().count().await, 1);
}

#[tokio::test]
async fn join_to_unknown_session_reports_not_found() {
    let gateway = Gateway::new(SessionRegistry::new());
    let (mut ctx, mut rx) = connection(1);

    gateway
        .handle_intent(
            &mut ctx,
            ClientIntent::Join {
                session_id: SessionId(0xbad),
                player_id: PlayerId(5),
                player_name: "nobody".to_string(),
            },
        )
        .await;

    assert_eq!(ctx.membership(), None);
    assert!(drain(&mut rx).iter().any(|m| matches!(
        m,
        ServerMessage::Error { kind: ErrorKind::SessionNotFound, .. }
    )));
}

#[tokio::test]
async fn second_connection_joins_and_sees_broadcasts() {
    let gateway = Gateway::new(SessionRegistry::new());
    let (mut host_ctx, mut host_rx) = connection(1);
    let (mut guest_ctx, mut guest_rx) = connection(2);

    gateway
        .handle_intent(
            &mut host_ctx,
            ClientIntent::Create { host_id: PlayerId(1), host_name: "host".to_string() },
        )
        .await;
    let session_id = drain(&mut host_rx)
        .iter()
        .find_map(|m| match m {
            ServerMessage::Created { session_id } => Some(*session_id),
            _ => None,
        })
        .expect("no created ack");

    gateway
        .handle_intent(
            &mut guest_ctx,
            ClientIntent::Join {
                session_id,
                player_id: PlayerId(2),
                player_name: "guest".to_string(),
            },
        )
        .await;
    gateway
        .handle_intent(
            &mut host_ctx,
            ClientIntent::Start { session_id, requester_id: PlayerId(1) },
        )
        .await;
    gateway
        .handle_intent(
            &mut host_ctx,
            ClientIntent::Draw { session_id, requester_id: PlayerId(1) },
        )
        .await;

    let guest_messages = drain(&mut guest_rx);
    assert!(guest_messages.iter().any(|m| matches!(m, ServerMessage::Ticket { .. })));
    assert!(guest_messages.iter().any(|m| matches!(m, ServerMessage::Number { .. })));
}

#[tokio::test]
async fn invalid_claim_comes_back_as_unicast_error() {
    let gateway = Gateway::new(SessionRegistry::new());
    let (mut host_ctx, mut host_rx) = connection(1);

    gateway
        .handle_intent(
            &mut host_ctx,
            ClientIntent::Create { host_id: PlayerId(1), host_name: "host".to_string() },
        )
        .await;
    let session_id = drain(&mut host_rx)
        .iter()
        .find_map(|m| match m {
            ServerMessage::Created { session_id } => Some(*session_id),
            _ => None,
        })
        .expect("no created ack");

    gateway
        .handle_intent(
            &mut host_ctx,
            ClientIntent::Start { session_id, requester_id: PlayerId(1) },
        )
        .await;
    gateway
        .handle_intent(
            &mut host_ctx,
            ClientIntent::Claim {
                session_id,
                player_id: PlayerId(1),
                pattern: ClaimPattern::EarlyFive,
            },
        )
        .await;

    assert!(drain(&mut host_rx).iter().any(|m| matches!(
        m,
        ServerMessage::Error { kind: ErrorKind::InvalidClaim, .. }
    )));
}

#[tokio::test]
async fn kick_tears_down_target_subscription() {
    let gateway = Gateway::new(SessionRegistry::new());
    let (mut host_ctx, mut host_rx) = connection(1);
    let (mut guest_ctx, mut guest_rx) = connection(2);

    gateway
        .handle_intent(
            &mut host_ctx,
            ClientIntent::Create { host_id: PlayerId(1), host_name: "host".to_string() },
        )
        .await;
    let session_id = drain(&mut host_rx)
        .iter()
        .find_map(|m| match m {
            ServerMessage::Created { session_id } => Some(*session_id),
            _ => None,
        })
        .expect("no created ack");

    gateway
        .handle_intent(
            &mut guest_ctx,
            ClientIntent::Join {
                session_id,
                player_id: PlayerId(2),
                player_name: "guest".to_string(),
            },
        )
        .await;
    drain(&mut host_rx);
    drain(&mut guest_rx);

    gateway
        .handle_intent(
            &mut host_ctx,
            ClientIntent::Kick {
                session_id,
                requester_id: PlayerId(1),
                target_id: PlayerId(2),
            },
        )
        .await;

    // The kicked connection's own teardown finds no membership left and
    // must not replay the departure to the remaining members.
    gateway.handle_disconnect(&mut guest_ctx).await;
    assert_eq!(guest_ctx.membership(), None);

    let departures = drain(&mut host_rx)
        .iter()
        .filter(|m| matches!(m, ServerMessage::Roster { left: Some(p), .. } if *p == PlayerId(2)))
        .count();
    assert_eq!(departures, 1, "kick departure broadcast exactly once");
}

#[tokio::test]
async fn disconnect_surfaces_as_departure() {
    let gateway = Gateway::new(SessionRegistry::new());
    let (mut host_ctx, mut host_rx) = connection(1);
    let (mut guest_ctx, _guest_rx) = connection(2);

    gateway
        .handle_intent(
            &mut host_ctx,
            ClientIntent::Create { host_id: PlayerId(1), host_name: "host".to_string() },
        )
        .await;
    let session_id = drain(&mut host_rx)
        .iter()
        .find_map(|m| match m {
            ServerMessage::Created { session_id } => Some(*session_id),
            _ => None,
        })
        .expect("no created ack");

    gateway
        .handle_intent(
            &mut guest_ctx,
            ClientIntent::Join {
                session_id,
                player_id: PlayerId(2),
                player_name: "guest".to_string(),
            },
        )
        .await;
    drain(&mut host_rx);

    gateway.handle_disconnect(&mut guest_ctx).await;
    assert_eq!(guest_ctx.membership(), None);

    // Leave is applied asynchronously by the session task.
    let left = tokio::time::timeout(std::time::Duration::from_secs(1), async {
        loop {
            if let Some(msg) = host_rx.recv().await {
                if matches!(msg, ServerMessage::Roster { left: Some(p), .. } if p == PlayerId(2)) {
                    break;
                }
            }
        }
    })
    .await;
    assert!(left.is_ok(), "host never saw the leave");
}
