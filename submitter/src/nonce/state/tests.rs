use crate::operation::Address;

use super::{NonceEntry, NonceManagerState};

#[test]
fn test_next_nonce_uses_remote_when_nothing_cached() {
    let entry = NonceEntry::default();
    assert_eq!(entry.next_nonce(7), 7);
    assert_eq!(entry.cached(), None);
}

#[test]
fn test_next_nonce_remote_is_only_a_floor() {
    let mut entry = NonceEntry::default();
    entry.set(5);

    // remote lags behind dispatched operations
    assert_eq!(entry.next_nonce(3), 5);
    // some other service moved the account ahead
    assert_eq!(entry.next_nonce(9), 9);
}

#[test]
fn test_reserve_advances_cache() {
    let mut entry = NonceEntry::default();

    assert_eq!(entry.reserve(3), Some(3));
    assert_eq!(entry.reserve(3), Some(4));
    assert_eq!(entry.reserve(0), Some(5));
    assert_eq!(entry.cached(), Some(6));
}

#[test]
fn test_reserve_refuses_last_nonce() {
    let mut entry = NonceEntry::default();
    entry.set(u64::MAX - 1);

    assert_eq!(entry.reserve(0), Some(u64::MAX - 1));
    // u64::MAX can't be handed out without repeating it
    assert_eq!(entry.reserve(0), None);
    assert_eq!(entry.reserve(0), None);
    assert_eq!(entry.cached(), Some(u64::MAX));
}

#[test]
fn test_roll_back_only_moves_down() {
    let mut entry = NonceEntry::default();
    entry.set(6);

    assert!(entry.roll_back(5));
    assert_eq!(entry.cached(), Some(5));

    // never moved upward
    assert!(!entry.roll_back(8));
    assert_eq!(entry.cached(), Some(5));

    // equal value is a no-op
    assert!(!entry.roll_back(5));
    assert_eq!(entry.cached(), Some(5));
}

#[test]
fn test_roll_back_without_cache_is_noop() {
    let mut entry = NonceEntry::default();
    assert!(!entry.roll_back(1));
    assert_eq!(entry.cached(), None);
}

#[tokio::test]
async fn test_entries_are_per_address() {
    let state = NonceManagerState::new();
    let alice = Address::new("alice");
    let bob = Address::new("bob");

    state.set_cached_nonce(&alice, 10).await;

    assert_eq!(state.cached_nonce(&alice).await, Some(10));
    assert_eq!(state.cached_nonce(&bob).await, None);

    // holding one address lock does not block another address
    let _alice_guard = state.entry(&alice).lock_owned().await;
    let bob_guard = state.entry(&bob).try_lock_owned();
    assert!(bob_guard.is_ok());
}
