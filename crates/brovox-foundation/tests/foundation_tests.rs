//! Foundation crate tests
//!
//! Tests cover:
//! - Session state cell transition validation and subscription
//! - Clock abstraction (RealClock, TestClock)
//! - Capture error recovery classification

use brovox_foundation::clock::{Clock, RealClock, TestClock};
use brovox_foundation::error::{AppError, CaptureError, RecoveryStrategy};
use brovox_foundation::state::{SessionState, SessionStateCell};
use std::time::Duration;

#[test]
fn initial_state_is_dormant() {
    let cell = SessionStateCell::new();
    assert_eq!(cell.current(), SessionState::Dormant);
}

#[test]
fn wake_path_transitions_are_valid() {
    let cell = SessionStateCell::new();
    cell.transition(SessionState::Speaking).unwrap();
    cell.transition(SessionState::Awake).unwrap();
    cell.transition(SessionState::Processing).unwrap();
    cell.transition(SessionState::Speaking).unwrap();
    cell.transition(SessionState::Dormant).unwrap();
}

#[test]
fn muted_wake_skips_speaking() {
    let cell = SessionStateCell::new();
    cell.transition(SessionState::Awake).unwrap();
    assert_eq!(cell.current(), SessionState::Awake);
}

#[test]
fn dormant_cannot_jump_to_processing() {
    let cell = SessionStateCell::new();
    let err = cell.transition(SessionState::Processing).unwrap_err();
    assert!(matches!(err, AppError::Fatal(_)));
    assert_eq!(cell.current(), SessionState::Dormant);
}

#[test]
fn speaking_resolves_only_to_awake_or_dormant() {
    let cell = SessionStateCell::new();
    cell.transition(SessionState::Speaking).unwrap();
    assert!(cell.transition(SessionState::Processing).is_err());
    assert_eq!(cell.current(), SessionState::Speaking);
    cell.transition(SessionState::Awake).unwrap();
}

#[test]
fn subscribers_observe_transitions_in_order() {
    let cell = SessionStateCell::new();
    let rx = cell.subscribe();
    cell.transition(SessionState::Speaking).unwrap();
    cell.transition(SessionState::Awake).unwrap();
    assert_eq!(rx.try_recv().unwrap(), SessionState::Speaking);
    assert_eq!(rx.try_recv().unwrap(), SessionState::Awake);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn real_clock_sleeps_roughly_as_asked() {
    let clock = RealClock::new();
    let before = clock.now();
    clock.sleep(Duration::from_millis(10)).await;
    assert!(clock.now().duration_since(before) >= Duration::from_millis(10));
}

#[tokio::test]
async fn test_clock_sleep_is_virtual() {
    let clock = TestClock::new();
    let t0 = clock.now();
    clock.sleep(Duration::from_secs(5)).await;
    assert_eq!(clock.now().duration_since(t0), Duration::from_secs(5));
    assert_eq!(clock.recorded_sleeps(), vec![Duration::from_secs(5)]);
}

#[test]
fn test_clock_advance_accumulates() {
    let clock = TestClock::new();
    let start = clock.now();
    clock.advance(Duration::from_millis(100));
    clock.advance(Duration::from_millis(200));
    assert_eq!(
        clock.now().duration_since(start),
        Duration::from_millis(300)
    );
}

#[test]
fn network_error_is_fatal_not_restart() {
    assert_eq!(
        CaptureError::Network.recovery_strategy(),
        RecoveryStrategy::Fatal
    );
}
