// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::cast_possible_truncation)] // Test parameters
#![allow(clippy::missing_panics_doc)] // Tests/examples panic on failure

//! HISTORY / RESOURCE_LIMITS / OWNERSHIP / LIFESPAN admission tests
//!
//! Drives the reader history cache through its public API.

use hdds_subscriber::core::{CacheChange, ChangeKind, InstanceHandle, ViewState, GUID};
use hdds_subscriber::qos::{History, Lifespan, OwnershipKind, ResourceLimits, LENGTH_UNLIMITED};
use hdds_subscriber::rtps::{Admission, HistoryCache, RejectReason, ResourceLimitKind};

fn writer(id: u8) -> GUID {
    GUID::new([id; 12], [0, 0, 1, 0x02])
}

fn alive(w: u8, seq: u64, instance: u64) -> CacheChange {
    CacheChange::new(
        writer(w),
        seq,
        InstanceHandle::from(instance),
        ChangeKind::Alive,
        seq.to_le_bytes().to_vec(),
    )
}

fn stored(cache: &HistoryCache) -> Vec<u64> {
    cache.iter().map(CacheChange::sequence_number).collect()
}

// ============================================================================
// Depth and resource limits
// ============================================================================

#[test]
fn test_keep_last_two_holds_latest_two() {
    let mut cache = HistoryCache::new(History::KeepLast(2), ResourceLimits::unlimited());

    for seq in 1..=3 {
        assert_eq!(cache.admit(alive(1, seq, 1)), Admission::Admitted);
    }

    assert_eq!(stored(&cache), vec![2, 3]);
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.len_for_instance(InstanceHandle::from(1u64)), 2);
}

#[test]
fn test_keep_all_rejects_third_sample() {
    let limits = ResourceLimits {
        max_samples: LENGTH_UNLIMITED,
        max_instances: LENGTH_UNLIMITED,
        max_samples_per_instance: 2,
    };
    let mut cache = HistoryCache::new(History::KeepAll, limits);

    assert!(cache.admit(alive(1, 1, 1)).is_admitted());
    assert!(cache.admit(alive(1, 2, 1)).is_admitted());

    match cache.admit(alive(1, 3, 1)) {
        Admission::Rejected(RejectReason::ResourceLimitExceeded(kind)) => {
            assert_eq!(kind, ResourceLimitKind::SamplesPerInstance);
        }
        other => panic!("expected resource limit rejection, got {:?}", other),
    }
    assert_eq!(stored(&cache), vec![1, 2]);
}

#[test]
fn test_keep_last_never_exceeds_limits() {
    let limits = ResourceLimits {
        max_samples: 6,
        max_instances: 4,
        max_samples_per_instance: 3,
    };
    let mut cache = HistoryCache::new(History::KeepLast(3), limits);

    let mut seq = 0;
    for round in 0..20u64 {
        for instance in 0..4u64 {
            seq += 1;
            let _ = cache.admit(alive(1, seq, instance + round % 2));
            assert!(cache.len() <= 6);
            for i in 0..6u64 {
                assert!(cache.len_for_instance(InstanceHandle::from(i)) <= 3);
            }
            assert!(cache.instance_count() <= 4);
        }
    }
}

// ============================================================================
// Ordering and staleness
// ============================================================================

#[test]
fn test_out_of_order_is_stale() {
    let mut cache = HistoryCache::new(History::KeepLast(10), ResourceLimits::unlimited());

    assert!(cache.admit(alive(1, 5, 1)).is_admitted());
    assert_eq!(
        cache.admit(alive(1, 3, 1)),
        Admission::Rejected(RejectReason::StaleInstance)
    );
    assert_eq!(stored(&cache), vec![5]);
}

#[test]
fn test_per_instance_order_preserved_across_interleaving() {
    let mut cache = HistoryCache::new(History::KeepLast(100), ResourceLimits::unlimited());
    let mut rng = fastrand::Rng::with_seed(7);

    let mut next = [1u64; 4];
    for _ in 0..200 {
        let instance = rng.usize(0..4);
        let seq = next[instance];
        next[instance] += 1 + rng.u64(0..3);
        assert!(cache.admit(alive(1, seq, instance as u64)).is_admitted());
    }

    for instance in 0..4u64 {
        let handle = InstanceHandle::from(instance);
        let seqs: Vec<u64> = cache
            .iter()
            .filter(|c| c.instance_handle() == handle)
            .map(CacheChange::sequence_number)
            .collect();
        assert!(seqs.windows(2).all(|w| w[0] < w[1]), "instance {} out of order", instance);
    }
}

// ============================================================================
// View state
// ============================================================================

#[test]
fn test_view_state_new_then_not_new() {
    let mut cache = HistoryCache::new(History::KeepLast(10), ResourceLimits::unlimited());

    for seq in 1..=3 {
        assert!(cache.admit(alive(1, seq, 1)).is_admitted());
    }
    let states: Vec<ViewState> = cache.iter().map(CacheChange::view_state).collect();
    assert_eq!(states, vec![ViewState::New, ViewState::NotNew, ViewState::NotNew]);
}

#[test]
fn test_view_state_new_again_after_unregister() {
    let mut cache = HistoryCache::new(History::KeepLast(10), ResourceLimits::unlimited());
    let handle = InstanceHandle::from(3u64);

    assert!(cache.admit(alive(1, 1, 3)).is_admitted());
    let unregister = CacheChange::new(
        writer(1),
        2,
        handle,
        ChangeKind::NotAliveUnregistered,
        Vec::<u8>::new(),
    );
    assert!(cache.admit(unregister).is_admitted());
    assert!(cache.admit(alive(1, 3, 3)).is_admitted());

    let last = cache.iter().last().expect("change");
    assert_eq!(last.view_state(), ViewState::New);
}

// ============================================================================
// Ownership and lifespan
// ============================================================================

#[test]
fn test_exclusive_ownership_takeover_by_stronger_writer() {
    let mut cache = HistoryCache::new(History::KeepLast(10), ResourceLimits::unlimited())
        .with_ownership(OwnershipKind::Exclusive);
    cache.set_writer_strength(writer(1), 10);
    cache.set_writer_strength(writer(2), 30);
    let handle = InstanceHandle::from(1u64);

    assert!(cache.admit(alive(1, 1, 1)).is_admitted());
    assert!(cache.admit(alive(2, 1, 1)).is_admitted());
    assert_eq!(cache.instance_owner(handle), Some(writer(2)));
    assert_eq!(
        cache.admit(alive(1, 2, 1)),
        Admission::Rejected(RejectReason::OwnershipRejected)
    );
}

#[test]
fn test_shared_ownership_accepts_all_writers() {
    let mut cache = HistoryCache::new(History::KeepLast(10), ResourceLimits::unlimited());
    cache.set_writer_strength(writer(1), 100);

    assert!(cache.admit(alive(1, 1, 1)).is_admitted());
    assert!(cache.admit(alive(2, 1, 1)).is_admitted());
    assert_eq!(cache.instance_owner(InstanceHandle::from(1u64)), None);
}

#[test]
fn test_lifespan_expired_on_arrival() {
    let mut cache = HistoryCache::new(History::KeepLast(10), ResourceLimits::unlimited())
        .with_lifespan(Lifespan::from_millis(10));
    let sent = 5_000_000_000;

    let late = alive(1, 1, 1).with_source_timestamp(sent);
    assert_eq!(
        cache.admit_at(late, sent + 20_000_000),
        Admission::Rejected(RejectReason::LifespanExpired)
    );
    let fresh = alive(1, 2, 1).with_source_timestamp(sent);
    assert!(cache.admit_at(fresh, sent + 5_000_000).is_admitted());
    assert_eq!(cache.remove_expired(sent + 11_000_000), 1);
    assert!(cache.is_empty());
}
