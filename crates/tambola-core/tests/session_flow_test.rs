//! End-to-end session scenarios through the coordinator.
//!
//! These tests drive whole games the way the server does: one intent at a
//! time against a single coordinator, asserting on the emitted actions.

use std::sync::{Arc, Mutex};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tambola_core::{
    ClaimPattern, EndReason, Envelope, GameError, PlayerId, SessionAction, SessionCoordinator,
    SessionEvent, SessionId, SessionStatus,
};

const HOST: PlayerId = PlayerId(10);
const GUEST: PlayerId = PlayerId(20);

fn coordinator(seed: u64) -> SessionCoordinator<ChaCha8Rng> {
    SessionCoordinator::new(SessionId(0xc0ffee), HOST, "host", ChaCha8Rng::seed_from_u64(seed))
}

fn drawn_numbers(actions: &[SessionAction]) -> Vec<(u8, usize)> {
    actions
        .iter()
        .filter_map(|a| match a {
            SessionAction::Broadcast(Envelope {
                event: SessionEvent::NumberDrawn { number, position },
                ..
            }) => Some((*number, *position)),
            _ => None,
        })
        .collect()
}

/// A full game: lobby, start, 90 draws, all five claims, full house ends
/// the session.
#[test]
fn full_game_resolves_all_patterns() {
    let mut coord = coordinator(3);
    coord.join(GUEST, "guest").expect("join failed");
    coord.start(HOST).expect("start failed");
    assert_eq!(coord.session().status(), SessionStatus::Playing);

    // Claims before any draw cannot be satisfied.
    assert_eq!(
        coord.submit_claim(GUEST, ClaimPattern::EarlyFive),
        Err(GameError::InvalidClaim(ClaimPattern::EarlyFive))
    );

    let mut all_drawn = Vec::new();
    for _ in 0..90 {
        let actions = coord.draw_next(HOST).expect("draw failed");
        all_drawn.extend(drawn_numbers(&actions));
    }

    // The caller must emit each of 1–90 exactly once, positions 1..=90.
    let mut numbers: Vec<u8> = all_drawn.iter().map(|(n, _)| *n).collect();
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=90).collect::<Vec<u8>>());
    assert_eq!(all_drawn.last().map(|(_, p)| *p), Some(90));

    assert_eq!(coord.draw_next(HOST), Err(GameError::Exhausted));

    // Everything is drawn, so every pattern is claimable once.
    for pattern in [
        ClaimPattern::EarlyFive,
        ClaimPattern::TopLine,
        ClaimPattern::MiddleLine,
        ClaimPattern::BottomLine,
    ] {
        coord.submit_claim(GUEST, pattern).expect("claim failed");
        assert_eq!(
            coord.submit_claim(HOST, pattern),
            Err(GameError::DuplicateClaim(pattern))
        );
    }

    let actions = coord.submit_claim(GUEST, ClaimPattern::FullHouse).expect("claim failed");
    assert_eq!(coord.session().status(), SessionStatus::Ended);
    assert!(actions.iter().any(|a| matches!(
        a,
        SessionAction::Broadcast(Envelope {
            event: SessionEvent::Ended { reason: EndReason::FullHouse },
            ..
        })
    )));

    assert_eq!(coord.session().claims().count(), 5);
    assert_eq!(
        coord.draw_next(HOST),
        Err(GameError::IllegalState(SessionStatus::Ended))
    );
}

/// A line claim succeeds as soon as its five numbers are drawn, not before.
#[test]
fn top_line_claim_tracks_drawn_numbers() {
    let mut coord = coordinator(11);
    coord.join(GUEST, "guest").expect("join failed");
    coord.start(HOST).expect("start failed");

    let target: Vec<u8> =
        coord.session().ticket(GUEST).expect("no ticket").row_numbers(0).collect();

    let mut covered = 0usize;
    while covered < target.len() {
        let actions = coord.draw_next(HOST).expect("draw failed");
        let hit = drawn_numbers(&actions).iter().any(|(n, _)| target.contains(n));

        if hit {
            covered += 1;
        }
        if covered < target.len() {
            assert_eq!(
                coord.submit_claim(GUEST, ClaimPattern::TopLine),
                Err(GameError::InvalidClaim(ClaimPattern::TopLine))
            );
        }
    }

    let actions = coord.submit_claim(GUEST, ClaimPattern::TopLine).expect("claim failed");
    assert!(actions.iter().any(|a| matches!(
        a,
        SessionAction::Broadcast(Envelope {
            event: SessionEvent::ClaimResolved { pattern: ClaimPattern::TopLine, winner },
            ..
        }) if *winner == GUEST
    )));
}

/// Two threads racing the same claim through a shared coordinator resolve
/// to exactly one winner and one `DuplicateClaim`.
#[test]
fn racing_claims_resolve_exactly_once() {
    let mut coord = coordinator(5);
    coord.join(GUEST, "guest").expect("join failed");
    coord.start(HOST).expect("start failed");
    for _ in 0..90 {
        coord.draw_next(HOST).expect("draw failed");
    }

    let coord = Arc::new(Mutex::new(coord));
    let mut handles = Vec::new();
    for player in [HOST, GUEST] {
        let coord = Arc::clone(&coord);
        handles.push(std::thread::spawn(move || {
            let mut coord = coord.lock().expect("coordinator poisoned");
            coord.submit_claim(player, ClaimPattern::EarlyFive)
        }));
    }

    let outcomes: Vec<_> =
        handles.into_iter().map(|h| h.join().expect("claim thread panicked")).collect();

    let wins = outcomes.iter().filter(|r| r.is_ok()).count();
    let duplicates = outcomes
        .iter()
        .filter(|r| matches!(r, Err(GameError::DuplicateClaim(ClaimPattern::EarlyFive))))
        .count();
    assert_eq!((wins, duplicates), (1, 1));

    let coord = coord.lock().expect("coordinator poisoned");
    assert_eq!(coord.session().claims().count(), 1);
}

/// A rejoining player gets their snapshot and original ticket back.
#[test]
fn rejoin_resends_snapshot_and_ticket() {
    let mut coord = coordinator(9);
    coord.join(GUEST, "guest").expect("join failed");
    coord.start(HOST).expect("start failed");
    let issued = coord.session().ticket(GUEST).cloned().expect("no ticket");

    coord.draw_next(HOST).expect("draw failed");
    coord.leave(GUEST).expect("leave failed");
    let actions = coord.join(GUEST, "guest").expect("rejoin failed");

    let mut got_snapshot = false;
    let mut got_ticket = false;
    for action in &actions {
        match action {
            SessionAction::ToPlayer {
                player,
                event: tambola_core::DirectEvent::Snapshot(snapshot),
            } if *player == GUEST => {
                assert_eq!(snapshot.drawn.len(), 1);
                assert_eq!(snapshot.status, SessionStatus::Playing);
                got_snapshot = true;
            },
            SessionAction::ToPlayer {
                player,
                event: tambola_core::DirectEvent::Ticket(ticket),
            } if *player == GUEST => {
                assert_eq!(*ticket, issued);
                got_ticket = true;
            },
            _ => {},
        }
    }
    assert!(got_snapshot, "rejoin without snapshot");
    assert!(got_ticket, "rejoin without ticket");
}
