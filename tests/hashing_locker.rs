/*!
 * Hashing Entity Locker Integration Tests
 *
 * Slot sizing, forced collisions, holder policies and unlock policies
 */

mod common;

use common::{wait_until, Identity};
use entity_locker::{
    EntityLocker, HashingConfig, HashingEntityLocker, HolderPolicy, LockError, UnlockPolicy,
};
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

fn identity_locker(config: HashingConfig) -> Arc<HashingEntityLocker<u64, Identity>> {
    Arc::new(HashingEntityLocker::with_config_and_hasher(config, Identity::default()).unwrap())
}

#[test]
fn test_zero_sizing_rejected() {
    for (count, factor) in [(0, 1), (1, 0), (0, 0)] {
        let result = HashingEntityLocker::<u64>::new(count, factor);
        assert!(
            matches!(result, Err(LockError::InvalidArgument(_))),
            "({}, {}) should be rejected",
            count,
            factor
        );
    }
}

#[test]
fn test_invalid_argument_names_parameter() {
    let err = HashingEntityLocker::<u64>::new(0, 1).err().unwrap();
    assert!(err.to_string().contains("should be more than 0"), "{}", err);
}

#[test]
fn test_two_slot_scenario() {
    // Ids 1 and 3 share slot 1, id 2 has slot 0 to itself
    let locker = identity_locker(HashingConfig::new(2, 1));
    assert_eq!(locker.slot_count(), 2);
    assert_eq!(locker.slot_of(&1), locker.slot_of(&3));
    assert!(locker.slot_of(&1) != locker.slot_of(&2));

    locker.lock(&1).unwrap();

    let other = locker.clone();
    let (shared, separate) = thread::spawn(move || {
        let shared = other.try_lock_for(&3, Duration::from_millis(30)).unwrap();
        let separate = other.try_lock_for(&2, Duration::from_millis(30)).unwrap();
        if separate {
            other.unlock(&2).unwrap();
        }
        (shared, separate)
    })
    .join()
    .unwrap();

    assert!(!shared, "colliding id acquired while its slot was held");
    assert!(separate);
    locker.unlock(&1).unwrap();
}

#[test]
#[serial]
fn test_colliding_id_waits_for_release() {
    let locker = identity_locker(HashingConfig::new(4, 1));
    locker.lock(&1).unwrap();

    let acquired = Arc::new(AtomicBool::new(false));
    let waiter = {
        let locker = locker.clone();
        let acquired = acquired.clone();
        thread::spawn(move || {
            // 5 routes to the same slot as 1
            locker.lock(&5).unwrap();
            acquired.store(true, Ordering::SeqCst);
            locker.unlock(&5).unwrap();
        })
    };

    wait_until(|| locker.queued_threads(&1) == 1, "colliding waiter to queue");
    assert!(!acquired.load(Ordering::SeqCst));

    locker.unlock(&1).unwrap();
    waiter.join().unwrap();
    assert!(acquired.load(Ordering::SeqCst));
}

#[test]
fn test_colliding_id_counts_as_reentry() {
    let locker = identity_locker(HashingConfig::new(2, 1));

    locker.lock(&1).unwrap();
    assert!(locker.try_lock_for(&3, Duration::ZERO).unwrap());
    assert!(locker.is_held_by_current_thread(&3));

    locker.unlock(&3).unwrap();
    assert!(locker.is_held_by_current_thread(&1));
    locker.unlock(&1).unwrap();
    assert!(!locker.is_held_by_current_thread(&1));
}

#[test]
fn test_unlock_policies() {
    let suppress = identity_locker(HashingConfig::new(8, 1));
    assert_eq!(suppress.unlock(&1), Ok(()));
    assert_eq!(suppress.stats().suppressed_unlocks, 1);

    let propagate =
        identity_locker(HashingConfig::new(8, 1).with_unlock_policy(UnlockPolicy::Propagate));
    assert_eq!(propagate.unlock(&1), Err(LockError::NotOwner));
}

#[test]
fn test_foreign_unlock_leaves_holder_intact() {
    let locker = identity_locker(HashingConfig::new(8, 1));
    locker.lock(&1).unwrap();

    let other = locker.clone();
    let result = thread::spawn(move || other.unlock(&1)).join().unwrap();

    assert_eq!(result, Ok(()));
    assert!(locker.is_held_by_current_thread(&1));
    locker.unlock(&1).unwrap();
}

#[test]
fn test_lazy_holders_behave_like_eager() {
    for holder in [HolderPolicy::Eager, HolderPolicy::Lazy] {
        let locker = identity_locker(HashingConfig::new(16, 2).with_holder(holder));
        assert_eq!(locker.slot_count(), 8);

        locker.lock(&9).unwrap();
        let other = locker.clone();
        let blocked = thread::spawn(move || other.try_lock_for(&9, Duration::from_millis(10)))
            .join()
            .unwrap()
            == Ok(false);
        assert!(blocked, "{:?} holder let a second thread in", holder);
        locker.unlock(&9).unwrap();
    }
}

#[test]
#[serial]
fn test_fair_slot_serves_waiters_in_order() {
    let locker = identity_locker(HashingConfig::new(1, 1).with_fairness(true));
    locker.lock(&0).unwrap();

    let (tx, rx) = mpsc::channel();
    let mut handles = Vec::new();
    for id in 1..=3u64 {
        let worker = locker.clone();
        let tx = tx.clone();
        handles.push(thread::spawn(move || {
            worker.lock(&id).unwrap();
            tx.send(id).unwrap();
            worker.unlock(&id).unwrap();
        }));

        // Slot queue grows by one per waiter
        wait_until(|| locker.queued_threads(&0) == id as usize, "waiter to queue");
    }
    drop(tx);

    locker.unlock(&0).unwrap();
    for handle in handles {
        handle.join().unwrap();
    }

    let order: Vec<u64> = rx.iter().collect();
    assert_eq!(order, vec![1, 2, 3]);
}

#[test]
fn test_presets_build() {
    let low = HashingEntityLocker::<u64>::with_config(HashingConfig::low_memory()).unwrap();
    let fine = HashingEntityLocker::<u64>::with_config(HashingConfig::fine_grained()).unwrap();
    assert!(low.slot_count() < fine.slot_count());

    low.with_lock(&1, || ()).unwrap();
    fine.with_lock(&1, || ()).unwrap();
}
