use super::{RestartCoordinator, RestartPhase};
use crate::utils::GatewayError;
use std::time::Duration;

fn run_full_cycle(coordinator: &RestartCoordinator) {
    coordinator
        .transition(RestartPhase::Draining, RestartPhase::Waiting)
        .unwrap();
    coordinator
        .transition(RestartPhase::Waiting, RestartPhase::Rebinding)
        .unwrap();
    coordinator
        .transition(RestartPhase::Rebinding, RestartPhase::Idle)
        .unwrap();
}

#[test]
fn test_starts_idle() {
    let coordinator = RestartCoordinator::new();
    assert_eq!(coordinator.phase(), RestartPhase::Idle);
    assert_eq!(coordinator.completed_restarts(), 0);
}

#[test]
fn test_request_enters_draining() {
    let coordinator = RestartCoordinator::new();
    assert!(coordinator.request());
    assert_eq!(coordinator.phase(), RestartPhase::Draining);
}

#[test]
fn test_request_while_in_progress_is_noop() {
    let coordinator = RestartCoordinator::new();
    assert!(coordinator.request());

    // every phase other than Idle swallows the request
    assert!(!coordinator.request());
    coordinator
        .transition(RestartPhase::Draining, RestartPhase::Waiting)
        .unwrap();
    assert!(!coordinator.request());
    coordinator
        .transition(RestartPhase::Waiting, RestartPhase::Rebinding)
        .unwrap();
    assert!(!coordinator.request());
    assert_eq!(coordinator.phase(), RestartPhase::Rebinding);
}

#[test]
fn test_full_cycle_counts_one_restart() {
    let coordinator = RestartCoordinator::new();
    assert!(coordinator.request());
    run_full_cycle(&coordinator);

    assert_eq!(coordinator.phase(), RestartPhase::Idle);
    assert_eq!(coordinator.completed_restarts(), 1);

    // a later request starts a fresh cycle
    assert!(coordinator.request());
    run_full_cycle(&coordinator);
    assert_eq!(coordinator.completed_restarts(), 2);
}

#[test]
fn test_illegal_transitions_are_rejected() {
    let coordinator = RestartCoordinator::new();

    // skipping Draining
    let err = coordinator
        .transition(RestartPhase::Idle, RestartPhase::Waiting)
        .unwrap_err();
    assert!(matches!(
        err,
        GatewayError::InvalidTransition {
            current: RestartPhase::Idle,
            ..
        }
    ));

    // right edge, wrong current phase
    let err = coordinator
        .transition(RestartPhase::Waiting, RestartPhase::Rebinding)
        .unwrap_err();
    assert!(matches!(err, GatewayError::InvalidTransition { .. }));
    assert_eq!(coordinator.phase(), RestartPhase::Idle);
}

#[test]
fn test_clones_share_state() {
    let coordinator = RestartCoordinator::new();
    let other = coordinator.clone();
    assert!(other.request());
    assert!(!coordinator.request());
    assert_eq!(coordinator.phase(), RestartPhase::Draining);
}

#[test]
fn test_concurrent_requests_start_one_restart() {
    let coordinator = RestartCoordinator::new();
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let coordinator = coordinator.clone();
            std::thread::spawn(move || coordinator.request())
        })
        .collect();

    let started = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|started| *started)
        .count();
    assert_eq!(started, 1);
}

#[tokio::test]
async fn test_subscribers_observe_phase_changes() {
    let coordinator = RestartCoordinator::new();
    let mut rx = coordinator.subscribe();

    let waiter = tokio::spawn(async move {
        rx.wait_for(|phase| *phase == RestartPhase::Draining)
            .await
            .map(|phase| *phase)
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(coordinator.request());

    let observed = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("waiter timed out")
        .unwrap()
        .unwrap();
    assert_eq!(observed, RestartPhase::Draining);
}

#[test]
fn test_phase_successors() {
    assert_eq!(RestartPhase::Idle.next(), RestartPhase::Draining);
    assert_eq!(RestartPhase::Rebinding.next(), RestartPhase::Idle);
    assert!(!RestartPhase::Idle.in_progress());
    assert!(RestartPhase::Waiting.in_progress());
}
