// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests/examples panic on failure
#![allow(clippy::cast_possible_truncation)] // Test parameters

//! Pull and push delivery through DataReaderImpl.
//!
//! Covers blocking read, take, listener precedence between
//! DATA_ON_READERS and DATA_AVAILABLE, and the rejected/lost statuses.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use hdds_subscriber::core::{CacheChange, ChangeKind, InstanceHandle, SampleState, GUID};
use hdds_subscriber::dds::{
    DataReaderImpl, DataReaderListener, DataReaderQos, Participant, ReaderHandle,
    SampleRejectedReason, SampleRejectedStatus, StatusMask, SubscriberImpl, SubscriberListener,
    WriterMatch,
};
use hdds_subscriber::qos::{Ownership, ResourceLimits};
use hdds_subscriber::rtps::AcknackDecision;
use hdds_subscriber::Error;

const WRITER: GUID = GUID {
    prefix: [0xAB; 12],
    entity_id: [0, 0, 1, 0x02],
};

fn sample(seq: u64) -> CacheChange {
    CacheChange::new(
        WRITER,
        seq,
        InstanceHandle::from(1u64),
        ChangeKind::Alive,
        vec![seq as u8],
    )
}

struct Fixture {
    _participant: Arc<Participant>,
    subscriber: Arc<SubscriberImpl>,
    reader: ReaderHandle,
}

fn fixture(
    qos: DataReaderQos,
    subscriber_listener: Option<Arc<dyn SubscriberListener>>,
    subscriber_mask: StatusMask,
    reader_listener: Option<Arc<dyn DataReaderListener>>,
    reader_mask: StatusMask,
) -> Fixture {
    let participant = Participant::new("delivery");
    participant.enable().expect("enable participant");
    let topic = participant
        .create_topic("telemetry", "Telemetry", None)
        .expect("topic");
    let subscriber = participant
        .create_subscriber(None, subscriber_listener, subscriber_mask)
        .expect("subscriber");
    let reader = subscriber
        .create_datareader(&topic, Some(qos), reader_listener, reader_mask)
        .expect("reader");
    assert!(reader.is_enabled());
    reader
        .matched_writer_add(WriterMatch::new(WRITER))
        .expect("match writer");
    Fixture {
        _participant: participant,
        subscriber,
        reader,
    }
}

fn plain(qos: DataReaderQos) -> Fixture {
    fixture(qos, None, StatusMask::NONE, None, StatusMask::NONE)
}

#[derive(Default)]
struct Counting {
    data_available: AtomicUsize,
    data_on_readers: AtomicUsize,
    rejected: AtomicUsize,
    matched: AtomicUsize,
    lost: AtomicUsize,
}

impl DataReaderListener for Counting {
    fn on_data_available(&self, _reader: &DataReaderImpl) {
        self.data_available.fetch_add(1, Ordering::SeqCst);
    }

    fn on_sample_rejected(&self, _reader: &DataReaderImpl, _status: SampleRejectedStatus) {
        self.rejected.fetch_add(1, Ordering::SeqCst);
    }

    fn on_subscription_matched(
        &self,
        _reader: &DataReaderImpl,
        _status: hdds_subscriber::dds::SubscriptionMatchedStatus,
    ) {
        self.matched.fetch_add(1, Ordering::SeqCst);
    }

    fn on_sample_lost(&self, _reader: &DataReaderImpl, _status: hdds_subscriber::dds::SampleLostStatus) {
        self.lost.fetch_add(1, Ordering::SeqCst);
    }
}

impl SubscriberListener for Counting {
    fn on_data_on_readers(&self, _subscriber: &SubscriberImpl) {
        self.data_on_readers.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Pull path
// ============================================================================

#[test]
fn test_read_returns_each_sample_once() {
    let fx = plain(DataReaderQos::reliable().keep_last(10));

    for seq in 1..=3 {
        assert!(fx.subscriber.on_new_cache_change_added(&sample(seq)));
    }

    for seq in 1..=3 {
        let change = fx.reader.read_next_sample().expect("read").expect("sample");
        assert_eq!(change.sequence_number(), seq);
        assert_eq!(change.sample_state(), SampleState::Unread);
    }
    assert_eq!(fx.reader.unread_count(), 0);

    // Read samples stay in the cache for take.
    let taken = fx.reader.take_next_sample().expect("take").expect("sample");
    assert_eq!(taken.sequence_number(), 1);
    assert_eq!(taken.sample_state(), SampleState::Read);
}

#[test]
fn test_read_all_drains_unread_only() {
    let fx = plain(DataReaderQos::reliable().keep_last(10));
    for seq in 1..=4 {
        fx.subscriber.on_new_cache_change_added(&sample(seq));
    }

    let first = fx.reader.read_next_sample().expect("read").expect("sample");
    assert_eq!(first.sequence_number(), 1);

    let mut out = Vec::new();
    assert_eq!(fx.reader.read_all_samples(&mut out).expect("read all"), 3);
    let seqs: Vec<u64> = out.iter().map(CacheChange::sequence_number).collect();
    assert_eq!(seqs, vec![2, 3, 4]);
    assert_eq!(fx.reader.read_all_samples(&mut out).expect("read all"), 0);
}

#[test]
fn test_blocking_read_wakes_on_arrival() {
    let fx = plain(DataReaderQos::reliable().keep_last(10));
    let reader = Arc::clone(&fx.reader);

    let waiter = thread::spawn(move || reader.read_next_sample());
    thread::sleep(Duration::from_millis(50));
    assert!(fx.subscriber.on_new_cache_change_added(&sample(9)));

    let change = waiter
        .join()
        .expect("join")
        .expect("read")
        .expect("sample");
    assert_eq!(change.sequence_number(), 9);
}

#[test]
fn test_delete_wakes_blocked_reader() {
    let fx = plain(DataReaderQos::reliable().keep_last(10));
    let reader = Arc::clone(&fx.reader);

    let waiter = thread::spawn(move || reader.read_next_sample());
    thread::sleep(Duration::from_millis(50));
    fx.subscriber
        .delete_datareader(&fx.reader)
        .expect("delete reader");

    let result = waiter.join().expect("join").expect("read");
    assert!(result.is_none());
    assert_eq!(fx.reader.read_next_sample(), Err(Error::AlreadyDeleted));
}

#[test]
fn test_read_before_enable_is_not_enabled() {
    let participant = Participant::new("disabled");
    let topic = participant.create_topic("t", "T", None).expect("topic");
    let subscriber = participant
        .create_subscriber(None, None, StatusMask::NONE)
        .expect("subscriber");
    let reader = subscriber
        .create_datareader(&topic, None, None, StatusMask::NONE)
        .expect("reader");

    assert!(!reader.is_enabled());
    assert_eq!(reader.take_next_sample(), Err(Error::NotEnabled));
    assert_eq!(reader.enable(), Err(Error::PreconditionNotMet("subscriber is not enabled".to_string())));
}

// ============================================================================
// Push path
// ============================================================================

#[test]
fn test_listener_and_pull_do_not_duplicate() {
    struct Taker(AtomicUsize);
    impl DataReaderListener for Taker {
        fn on_data_available(&self, reader: &DataReaderImpl) {
            while let Ok(Some(_)) = reader.take_next_sample() {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    let taker = Arc::new(Taker(AtomicUsize::new(0)));
    let fx = fixture(
        DataReaderQos::reliable().keep_last(10),
        None,
        StatusMask::NONE,
        Some(taker.clone()),
        StatusMask::DATA_AVAILABLE,
    );

    for seq in 1..=5 {
        assert!(fx.subscriber.on_new_cache_change_added(&sample(seq)));
    }

    assert_eq!(taker.0.load(Ordering::SeqCst), 5);
    assert_eq!(fx.reader.take_next_sample().expect("take"), None);
}

#[test]
fn test_data_on_readers_takes_precedence() {
    let sub_listener = Arc::new(Counting::default());
    let reader_listener = Arc::new(Counting::default());
    let fx = fixture(
        DataReaderQos::reliable().keep_last(10),
        Some(sub_listener.clone()),
        StatusMask::DATA_ON_READERS | StatusMask::DATA_AVAILABLE,
        Some(reader_listener.clone()),
        StatusMask::DATA_AVAILABLE,
    );

    fx.subscriber.on_new_cache_change_added(&sample(1));

    assert_eq!(sub_listener.data_on_readers.load(Ordering::SeqCst), 1);
    assert_eq!(sub_listener.data_available.load(Ordering::SeqCst), 0);
    assert_eq!(reader_listener.data_available.load(Ordering::SeqCst), 0);
}

#[test]
fn test_reader_listener_before_subscriber_fallback() {
    let sub_listener = Arc::new(Counting::default());
    let reader_listener = Arc::new(Counting::default());
    let fx = fixture(
        DataReaderQos::reliable().keep_last(10),
        Some(sub_listener.clone()),
        StatusMask::DATA_AVAILABLE,
        Some(reader_listener.clone()),
        StatusMask::DATA_AVAILABLE,
    );

    fx.subscriber.on_new_cache_change_added(&sample(1));
    assert_eq!(reader_listener.data_available.load(Ordering::SeqCst), 1);
    assert_eq!(sub_listener.data_available.load(Ordering::SeqCst), 0);

    // Without a reader listener the subscriber's is used.
    fx.reader
        .set_listener(None, StatusMask::NONE)
        .expect("clear listener");
    fx.subscriber.on_new_cache_change_added(&sample(2));
    assert_eq!(sub_listener.data_available.load(Ordering::SeqCst), 1);
}

#[test]
fn test_masked_out_status_is_silent() {
    let listener = Arc::new(Counting::default());
    let fx = fixture(
        DataReaderQos::reliable().keep_last(10),
        None,
        StatusMask::NONE,
        Some(listener.clone()),
        StatusMask::SAMPLE_REJECTED,
    );

    fx.subscriber.on_new_cache_change_added(&sample(1));
    assert_eq!(listener.data_available.load(Ordering::SeqCst), 0);
    assert_eq!(fx.reader.unread_count(), 1);
}

#[test]
fn test_subscription_matched_status() {
    let listener = Arc::new(Counting::default());
    let fx = fixture(
        DataReaderQos::best_effort(),
        None,
        StatusMask::NONE,
        Some(listener.clone()),
        StatusMask::SUBSCRIPTION_MATCHED,
    );
    assert_eq!(listener.matched.load(Ordering::SeqCst), 1);

    // Second add of the same writer is a no-op.
    assert!(!fx.reader.matched_writer_add(WriterMatch::new(WRITER)).expect("add"));
    assert!(fx.reader.matched_writer_remove(WRITER).expect("remove"));

    let status = fx.reader.get_subscription_matched_status().expect("status");
    assert_eq!(status.total_count, 1);
    assert_eq!(status.current_count, 0);
    assert_eq!(status.last_publication_handle, Some(WRITER));
    assert_eq!(listener.matched.load(Ordering::SeqCst), 2);

    let again = fx.reader.get_subscription_matched_status().expect("status");
    assert_eq!(again.total_count_change, 0);
    assert_eq!(again.current_count_change, 0);
}

// ============================================================================
// Rejections and losses
// ============================================================================

#[test]
fn test_sample_rejected_status_and_listener() {
    let listener = Arc::new(Counting::default());
    let limits = ResourceLimits {
        max_samples: 10,
        max_instances: 1,
        max_samples_per_instance: 2,
    };
    let fx = fixture(
        DataReaderQos::reliable().keep_all().resource_limits(limits),
        None,
        StatusMask::NONE,
        Some(listener.clone()),
        StatusMask::SAMPLE_REJECTED,
    );

    assert!(fx.subscriber.on_new_cache_change_added(&sample(1)));
    assert!(fx.subscriber.on_new_cache_change_added(&sample(2)));
    assert!(!fx.subscriber.on_new_cache_change_added(&sample(3)));

    assert_eq!(listener.rejected.load(Ordering::SeqCst), 1);
    let status = fx.reader.get_sample_rejected_status().expect("status");
    assert_eq!(status.total_count, 1);
    assert_eq!(status.total_count_change, 1);
    assert_eq!(status.last_reason, SampleRejectedReason::SamplesPerInstanceLimit);
    assert_eq!(
        fx.reader.get_sample_rejected_status().expect("status").total_count_change,
        0
    );

    // Taking one frees room; the same sequence number is accepted on retransmission.
    fx.reader.take_next_sample().expect("take");
    assert!(fx.subscriber.on_new_cache_change_added(&sample(3)));
}

#[test]
fn test_heartbeat_reports_lost_samples() {
    let listener = Arc::new(Counting::default());
    let fx = fixture(
        DataReaderQos::reliable().keep_last(10),
        None,
        StatusMask::NONE,
        Some(listener.clone()),
        StatusMask::SAMPLE_LOST,
    );

    fx.subscriber.on_new_cache_change_added(&sample(1));
    fx.subscriber.on_new_cache_change_added(&sample(2));
    // 3..=5 never arrive; the writer no longer holds anything below 6.
    let decision = fx.reader.on_heartbeat(WRITER, 6, 8, 1).expect("heartbeat");
    assert!(decision.is_some());

    assert_eq!(listener.lost.load(Ordering::SeqCst), 1);
    let status = fx.reader.get_sample_lost_status().expect("status");
    assert_eq!(status.total_count, 3);
}

#[test]
fn test_out_of_range_sequence_keeps_receive_path_alive() {
    let fx = plain(DataReaderQos::reliable().keep_last(10));

    assert!(fx.subscriber.on_new_cache_change_added(&sample(u64::MAX)));
    let other_instance = CacheChange::new(
        WRITER,
        1,
        InstanceHandle::from(2u64),
        ChangeKind::Alive,
        vec![1],
    );
    assert!(fx.subscriber.on_new_cache_change_added(&other_instance));

    let decision = fx
        .reader
        .on_heartbeat(WRITER, 1, u64::MAX, 1)
        .expect("heartbeat");
    assert_eq!(decision, Some(AcknackDecision::NeedData { bitmap_base: 2 }));
    assert_eq!(fx.reader.get_sample_lost_status().expect("status").total_count, 0);
}

#[test]
fn test_writer_match_strength_decides_exclusive_owner() {
    let fx = plain(DataReaderQos::reliable().ownership(Ownership::exclusive()));
    let strong = GUID {
        prefix: [0xCD; 12],
        entity_id: [0, 0, 2, 0x02],
    };
    fx.reader
        .matched_writer_add(WriterMatch::new(strong).with_strength(50))
        .expect("match strong writer");

    assert!(fx.subscriber.on_new_cache_change_added(&sample(1)));
    let from_strong = CacheChange::new(
        strong,
        1,
        InstanceHandle::from(1u64),
        ChangeKind::Alive,
        vec![1],
    );
    assert!(fx.subscriber.on_new_cache_change_added(&from_strong));
    // WRITER matched with the default strength 0 has lost the instance
    assert!(!fx.subscriber.on_new_cache_change_added(&sample(2)));
    let status = fx.reader.get_sample_rejected_status().expect("status");
    assert_eq!(status.total_count, 1);
    assert_eq!(
        status.last_reason,
        SampleRejectedReason::Policy(hdds_subscriber::rtps::RejectReason::OwnershipRejected)
    );
}

// ============================================================================
// Instance bookkeeping
// ============================================================================

#[test]
fn test_taken_unregistered_instances_are_not_retained() {
    let fx = plain(
        DataReaderQos::reliable()
            .keep_last(1)
            .resource_limits(ResourceLimits::unlimited()),
    );

    for instance in 1..=50_000u64 {
        let unregister = CacheChange::new(
            WRITER,
            instance,
            InstanceHandle::from(instance),
            ChangeKind::NotAliveUnregistered,
            Vec::<u8>::new(),
        );
        assert!(fx.subscriber.on_new_cache_change_added(&unregister));
        assert!(fx.reader.take_next_sample().expect("take").is_some());
    }

    let tracked = fx
        .reader
        .rtps_reader()
        .with_cache(|cache| cache.tracked_instance_count());
    assert_eq!(tracked, 0);
}
