// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Untyped DataReader over one RTPS reader.
//!
//! Owned by its [`SubscriberImpl`]; holds a non-owning back-reference to it
//! for listener fallback and `get_subscriber`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwapOption;
use parking_lot::{Mutex, RwLock};

use super::listener::{DataReaderListener, SubscriberListener};
use super::qos::DataReaderQos;
use super::status::{
    SampleLostStatus, SampleRejectedStatus, StatusMask, SubscriptionMatchedStatus,
};
use super::subscriber::SubscriberImpl;
use super::topic::Topic;
use super::{Error, Result};
use crate::core::{CacheChange, InstanceHandle, GUID};
use crate::qos::Durability;
use crate::rtps::{
    AcknackDecision, ReaderAttributes, ReaderListener, RejectReason, RtpsReader,
};

/// Shared handle to a registered reader.
pub type ReaderHandle = Arc<DataReaderImpl>;

/// A remote writer reported by discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterMatch {
    pub guid: GUID,
    /// OWNERSHIP_STRENGTH offered by the writer.
    pub strength: i32,
}

impl WriterMatch {
    pub fn new(guid: GUID) -> Self {
        Self { guid, strength: 0 }
    }

    #[must_use]
    pub fn with_strength(mut self, strength: i32) -> Self {
        self.strength = strength;
        self
    }
}

struct ListenerEntry {
    listener: Arc<dyn DataReaderListener>,
    mask: StatusMask,
}

/// Forwards protocol-reader events to the owning DataReader.
struct ReaderBridge {
    reader: Weak<DataReaderImpl>,
}

impl ReaderListener for ReaderBridge {
    fn on_data_available(&self, _rtps: &RtpsReader) {
        if let Some(reader) = self.reader.upgrade() {
            reader.dispatch_data_available();
        }
    }

    fn on_sample_rejected(&self, _rtps: &RtpsReader, reason: RejectReason, _change: &CacheChange) {
        if let Some(reader) = self.reader.upgrade() {
            reader.record_rejection(reason);
        }
    }
}

/// Invoke a reader status callback: the reader's listener if its mask
/// has the status, else the subscriber's.
macro_rules! dispatch {
    ($reader:expr, $mask:expr, $method:ident($($arg:expr),*)) => {{
        if let Some(listener) = $reader.reader_listener($mask) {
            listener.$method($reader, $($arg),*);
        } else if let Some(listener) = $reader.subscriber_listener($mask) {
            listener.$method($reader, $($arg),*);
        }
    }};
}

/// Application-facing untyped reader.
pub struct DataReaderImpl {
    guid: GUID,
    topic: Arc<Topic>,
    rtps: RtpsReader,
    qos: RwLock<DataReaderQos>,
    subscriber: Weak<SubscriberImpl>,
    listener: ArcSwapOption<ListenerEntry>,
    deleted: AtomicBool,
    rejected_status: Mutex<SampleRejectedStatus>,
    matched_status: Mutex<SubscriptionMatchedStatus>,
    lost_status: Mutex<SampleLostStatus>,
}

impl DataReaderImpl {
    pub(crate) fn new(
        guid: GUID,
        topic: Arc<Topic>,
        qos: DataReaderQos,
        subscriber: Weak<SubscriberImpl>,
        listener: Option<Arc<dyn DataReaderListener>>,
        mask: StatusMask,
    ) -> ReaderHandle {
        Arc::new_cyclic(|weak| {
            let rtps = RtpsReader::new(guid, ReaderAttributes::from(&qos));
            rtps.set_listener(Some(Arc::new(ReaderBridge {
                reader: weak.clone(),
            })));
            Self {
                guid,
                topic,
                rtps,
                qos: RwLock::new(qos),
                subscriber,
                listener: ArcSwapOption::new(
                    listener.map(|listener| Arc::new(ListenerEntry { listener, mask })),
                ),
                deleted: AtomicBool::new(false),
                rejected_status: Mutex::new(SampleRejectedStatus::default()),
                matched_status: Mutex::new(SubscriptionMatchedStatus::default()),
                lost_status: Mutex::new(SampleLostStatus::default()),
            }
        })
    }

    pub fn guid(&self) -> GUID {
        self.guid
    }

    /// Instance handle of the reader entity (its GUID bytes).
    pub fn instance_handle(&self) -> InstanceHandle {
        InstanceHandle::new(self.guid.as_bytes())
    }

    pub fn topic(&self) -> &Arc<Topic> {
        &self.topic
    }

    pub fn topic_name(&self) -> &str {
        self.topic.name()
    }

    pub fn get_qos(&self) -> DataReaderQos {
        self.qos.read().clone()
    }

    /// Change the reader QoS.
    ///
    /// Reliability, history, resource limits and ownership are fixed at
    /// creation; durability is fixed once enabled. Lifespan and user data
    /// may change at any time.
    pub fn set_qos(&self, qos: DataReaderQos) -> Result<()> {
        self.check_alive()?;
        qos.validate()?;
        if qos.durability == Durability::Persistent {
            return Err(Error::Unsupported("PERSISTENT durability".to_string()));
        }

        let mut current = self.qos.write();
        if let Some(policy) = current.immutable_change(&qos) {
            if policy != "durability" || self.rtps.is_enabled() {
                return Err(Error::ImmutablePolicy(policy.to_string()));
            }
        }
        if current.lifespan != qos.lifespan {
            self.rtps.set_lifespan(qos.lifespan);
        }
        *current = qos;
        Ok(())
    }

    pub fn set_listener(
        &self,
        listener: Option<Arc<dyn DataReaderListener>>,
        mask: StatusMask,
    ) -> Result<()> {
        self.check_alive()?;
        self.listener
            .store(listener.map(|listener| Arc::new(ListenerEntry { listener, mask })));
        Ok(())
    }

    pub fn get_listener(&self) -> Option<Arc<dyn DataReaderListener>> {
        self.listener
            .load_full()
            .map(|entry| Arc::clone(&entry.listener))
    }

    /// Enable the reader. The owning subscriber must be enabled.
    pub fn enable(&self) -> Result<()> {
        self.check_alive()?;
        if let Some(subscriber) = self.subscriber.upgrade() {
            if !subscriber.is_enabled() {
                return Err(Error::PreconditionNotMet(
                    "subscriber is not enabled".to_string(),
                ));
            }
        }
        if self.rtps.enable() {
            Ok(())
        } else {
            Err(Error::PreconditionNotMet("reader was disabled".to_string()))
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.rtps.is_enabled()
    }

    /// Block until an unread sample exists, read it (it stays in the cache).
    ///
    /// `Ok(None)` if the reader is deleted while waiting.
    pub fn read_next_sample(&self) -> Result<Option<CacheChange>> {
        self.check_readable()?;
        Ok(self.rtps.read_next_cache_change())
    }

    /// Remove and return the oldest sample without blocking.
    pub fn take_next_sample(&self) -> Result<Option<CacheChange>> {
        self.check_readable()?;
        Ok(self.rtps.take_next_cache_change())
    }

    /// Read every unread sample into `out` without blocking.
    pub fn read_all_samples(&self, out: &mut Vec<CacheChange>) -> Result<usize> {
        self.check_readable()?;
        Ok(self.rtps.read_all_cache_changes(out))
    }

    pub fn unread_count(&self) -> usize {
        self.rtps.unread_count()
    }

    /// Register a matched writer and raise SUBSCRIPTION_MATCHED.
    /// `Ok(false)` if it was already matched.
    pub fn matched_writer_add(&self, writer: WriterMatch) -> Result<bool> {
        self.check_alive()?;
        if !self.rtps.matched_writer_add(writer.guid, writer.strength) {
            return Ok(false);
        }
        let status = {
            let mut status = self.matched_status.lock();
            status.total_count += 1;
            status.total_count_change += 1;
            status.current_count += 1;
            status.current_count_change += 1;
            status.last_publication_handle = Some(writer.guid);
            status.clone()
        };
        dispatch!(self, StatusMask::SUBSCRIPTION_MATCHED, on_subscription_matched(status));
        Ok(true)
    }

    /// Forget a matched writer and raise SUBSCRIPTION_MATCHED.
    pub fn matched_writer_remove(&self, writer: GUID) -> Result<bool> {
        self.check_alive()?;
        if !self.rtps.matched_writer_remove(writer) {
            return Ok(false);
        }
        let status = {
            let mut status = self.matched_status.lock();
            status.current_count = status.current_count.saturating_sub(1);
            status.current_count_change -= 1;
            status.last_publication_handle = Some(writer);
            status.clone()
        };
        dispatch!(self, StatusMask::SUBSCRIPTION_MATCHED, on_subscription_matched(status));
        Ok(true)
    }

    pub fn is_matched_writer(&self, writer: GUID) -> bool {
        self.rtps.is_matched_writer(writer)
    }

    /// HEARTBEAT from a matched writer.
    ///
    /// Missing samples below the writer's first available sequence number
    /// are counted as lost.
    pub fn on_heartbeat(
        &self,
        writer: GUID,
        first_seq: u64,
        last_seq: u64,
        count: u32,
    ) -> Result<Option<AcknackDecision>> {
        self.check_alive()?;
        let lost = self.rtps.unreceived_below(writer, first_seq);
        let decision = self.rtps.on_heartbeat(writer, first_seq, last_seq, count);
        let fresh = !matches!(decision, None | Some(AcknackDecision::Ignore));

        if fresh && lost > 0 {
            let status = {
                let mut status = self.lost_status.lock();
                let lost = u32::try_from(lost).unwrap_or(u32::MAX);
                status.total_count = status.total_count.saturating_add(lost);
                status.total_count_change = status
                    .total_count_change
                    .saturating_add(i32::try_from(lost).unwrap_or(i32::MAX));
                status.clone()
            };
            log::debug!("[DataReader] {} lost {} samples from {}", self.guid, lost, writer);
            dispatch!(self, StatusMask::SAMPLE_LOST, on_sample_lost(status));
        }
        Ok(decision)
    }

    /// GAP from a matched writer: `[start, end)` is irrelevant.
    pub fn on_gap(&self, writer: GUID, start: u64, end: u64) -> Result<bool> {
        self.check_alive()?;
        Ok(self.rtps.on_gap(writer, start, end))
    }

    /// Read and reset the change counter.
    pub fn get_sample_rejected_status(&self) -> Result<SampleRejectedStatus> {
        self.check_alive()?;
        let mut status = self.rejected_status.lock();
        let snapshot = status.clone();
        status.total_count_change = 0;
        Ok(snapshot)
    }

    /// Read and reset the change counters.
    pub fn get_subscription_matched_status(&self) -> Result<SubscriptionMatchedStatus> {
        self.check_alive()?;
        let mut status = self.matched_status.lock();
        let snapshot = status.clone();
        status.total_count_change = 0;
        status.current_count_change = 0;
        Ok(snapshot)
    }

    /// Read and reset the change counter.
    pub fn get_sample_lost_status(&self) -> Result<SampleLostStatus> {
        self.check_alive()?;
        let mut status = self.lost_status.lock();
        let snapshot = status.clone();
        status.total_count_change = 0;
        Ok(snapshot)
    }

    pub fn get_subscriber(&self) -> Option<Arc<SubscriberImpl>> {
        self.subscriber.upgrade()
    }

    /// Protocol reader, for the receive path (heartbeats, statistics).
    pub fn rtps_reader(&self) -> &RtpsReader {
        &self.rtps
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::Acquire)
    }

    /// `true` while a listener callback runs on this reader.
    pub fn has_pending_callbacks(&self) -> bool {
        self.rtps.has_pending_callbacks()
    }

    pub(crate) fn deliver(&self, change: CacheChange) -> bool {
        self.rtps.on_new_cache_change_added(change)
    }

    /// Raise DATA_AVAILABLE outside the receive path.
    pub(crate) fn notify_data_available(&self) {
        let _guard = self.rtps.callback_guard();
        dispatch!(self, StatusMask::DATA_AVAILABLE, on_data_available());
    }

    pub(crate) fn clear_listener(&self) {
        self.listener.store(None);
    }

    pub(crate) fn belongs_to(&self, subscriber: &SubscriberImpl) -> bool {
        std::ptr::eq(self.subscriber.as_ptr(), subscriber)
    }

    /// Disable and mark deleted. `false` if it already was.
    pub(crate) fn retire(&self) -> bool {
        if self.deleted.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.listener.store(None);
        self.rtps.disable();
        log::debug!("[DataReader] Deleted {} on '{}'", self.guid, self.topic.name());
        true
    }

    fn dispatch_data_available(&self) {
        if let Some(subscriber) = self.subscriber.upgrade() {
            if let Some(listener) = subscriber.listener_for(StatusMask::DATA_ON_READERS) {
                listener.on_data_on_readers(&subscriber);
                return;
            }
        }
        dispatch!(self, StatusMask::DATA_AVAILABLE, on_data_available());
    }

    fn record_rejection(&self, reason: RejectReason) {
        let status = {
            let mut status = self.rejected_status.lock();
            status.total_count = status.total_count.saturating_add(1);
            status.total_count_change = status.total_count_change.saturating_add(1);
            status.last_reason = reason.into();
            status.clone()
        };
        dispatch!(self, StatusMask::SAMPLE_REJECTED, on_sample_rejected(status));
    }

    fn reader_listener(&self, status: StatusMask) -> Option<Arc<dyn DataReaderListener>> {
        self.listener
            .load_full()
            .filter(|entry| entry.mask.contains(status))
            .map(|entry| Arc::clone(&entry.listener))
    }

    fn subscriber_listener(&self, status: StatusMask) -> Option<Arc<dyn SubscriberListener>> {
        self.subscriber.upgrade()?.listener_for(status)
    }

    fn check_alive(&self) -> Result<()> {
        if self.is_deleted() {
            Err(Error::AlreadyDeleted)
        } else {
            Ok(())
        }
    }

    fn check_readable(&self) -> Result<()> {
        self.check_alive()?;
        if self.rtps.is_enabled() {
            Ok(())
        } else {
            Err(Error::NotEnabled)
        }
    }
}

impl std::fmt::Debug for DataReaderImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataReaderImpl")
            .field("guid", &self.guid)
            .field("topic", &self.topic.name())
            .field("deleted", &self.is_deleted())
            .finish_non_exhaustive()
    }
}
