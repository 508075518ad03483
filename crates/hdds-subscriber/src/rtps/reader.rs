// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RTPS reader entity.
//!
//! Single admission entry point for the receive path, owner of the reader
//! [`HistoryCache`], and rendezvous between the network thread (push) and
//! application threads (pull).
//!
//! # Architecture
//!
//! ```text
//! receive thread                         application thread
//!      |                                        |
//!      v                                        v
//! on_new_cache_change_added        read_next_cache_change (blocks)
//!      |  lock(cache)                           |  lock(cache)
//!      |  admit + writer tracking               |  wait(data_ready) until
//!      |  unlock                                |  unread change or disabled
//!      |  data_ready.notify_all  ------------>  |
//!      |  listener.on_data_available            v
//!      v                                    read_next
//! ```
//!
//! Waiters are signalled before the listener runs, so a listener that
//! performs a blocking read on its own reader finds the change already
//! visible.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};

use super::history_cache::{Admission, HistoryCache, RejectReason};
use super::writer_proxy::{AcknackDecision, WriterProxy};
use crate::core::{current_time_ns, CacheChange, GUID};
use crate::qos::{History, Lifespan, OwnershipKind, Reliability, ResourceLimits};

/// Reader state machine, fixed at construction from the reliability QoS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderKind {
    /// Best-effort: admits changes from any writer, no per-writer tracking.
    Stateless,
    /// Reliable: tracks every matched writer, refuses unmatched ones.
    Stateful,
}

impl ReaderKind {
    pub fn from_reliability(reliability: Reliability) -> Self {
        match reliability {
            Reliability::BestEffort => ReaderKind::Stateless,
            Reliability::Reliable => ReaderKind::Stateful,
        }
    }
}

/// Reader lifecycle. `Disabled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderLifecycle {
    Created,
    Enabled,
    Disabled,
}

/// QoS subset the protocol reader needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderAttributes {
    pub reliability: Reliability,
    pub history: History,
    pub resource_limits: ResourceLimits,
    pub ownership: OwnershipKind,
    pub lifespan: Lifespan,
}

/// Callbacks raised by the reader on the delivering thread.
///
/// Implementations must be `Send + Sync`: they are invoked from the receive
/// path, outside every reader lock.
pub trait ReaderListener: Send + Sync {
    /// A change was admitted.
    fn on_data_available(&self, _reader: &RtpsReader) {}

    /// A change was refused by QoS policy.
    fn on_sample_rejected(&self, _reader: &RtpsReader, _reason: RejectReason, _change: &CacheChange) {}
}

struct ListenerSlot {
    listener: Arc<dyn ReaderListener>,
}

/// Counts a callback in flight for as long as it lives.
pub(crate) struct CallbackGuard<'a>(&'a AtomicUsize);

impl<'a> CallbackGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for CallbackGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Admission counters.
#[derive(Debug, Default)]
pub struct ReaderStats {
    admitted: AtomicU64,
    resource_limit: AtomicU64,
    stale: AtomicU64,
    ownership: AtomicU64,
    unknown_writer: AtomicU64,
    lifespan: AtomicU64,
    not_enabled: AtomicU64,
}

impl ReaderStats {
    fn record(&self, admission: Admission) {
        let counter = match admission {
            Admission::Admitted => &self.admitted,
            Admission::Rejected(reason) => self.counter(reason),
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn counter(&self, reason: RejectReason) -> &AtomicU64 {
        match reason {
            RejectReason::ResourceLimitExceeded(_) => &self.resource_limit,
            RejectReason::StaleInstance => &self.stale,
            RejectReason::OwnershipRejected => &self.ownership,
            RejectReason::UnknownWriter => &self.unknown_writer,
            RejectReason::LifespanExpired => &self.lifespan,
            RejectReason::ReaderNotEnabled => &self.not_enabled,
        }
    }

    pub fn admitted(&self) -> u64 {
        self.admitted.load(Ordering::Relaxed)
    }

    /// Rejections for one reason (resource-limit kinds are counted together).
    pub fn rejected(&self, reason: RejectReason) -> u64 {
        self.counter(reason).load(Ordering::Relaxed)
    }

    pub fn rejected_total(&self) -> u64 {
        [
            &self.resource_limit,
            &self.stale,
            &self.ownership,
            &self.unknown_writer,
            &self.lifespan,
            &self.not_enabled,
        ]
        .iter()
        .map(|c| c.load(Ordering::Relaxed))
        .sum()
    }
}

struct Inner {
    cache: HistoryCache,
    lifecycle: ReaderLifecycle,
}

/// Protocol-level reader.
pub struct RtpsReader {
    guid: GUID,
    kind: ReaderKind,
    inner: Mutex<Inner>,
    data_ready: Condvar,
    writers: DashMap<GUID, WriterProxy>,
    listener: ArcSwapOption<ListenerSlot>,
    callbacks_in_flight: AtomicUsize,
    stats: ReaderStats,
}

impl RtpsReader {
    /// Create a reader in the `Created` state.
    pub fn new(guid: GUID, attributes: ReaderAttributes) -> Self {
        let cache = HistoryCache::new(attributes.history, attributes.resource_limits)
            .with_ownership(attributes.ownership)
            .with_lifespan(attributes.lifespan);
        let kind = ReaderKind::from_reliability(attributes.reliability);
        log::debug!("[RtpsReader] Created {} kind={:?}", guid, kind);

        Self {
            guid,
            kind,
            inner: Mutex::new(Inner {
                cache,
                lifecycle: ReaderLifecycle::Created,
            }),
            data_ready: Condvar::new(),
            writers: DashMap::new(),
            listener: ArcSwapOption::empty(),
            callbacks_in_flight: AtomicUsize::new(0),
            stats: ReaderStats::default(),
        }
    }

    pub fn guid(&self) -> GUID {
        self.guid
    }

    pub fn kind(&self) -> ReaderKind {
        self.kind
    }

    pub fn lifecycle(&self) -> ReaderLifecycle {
        self.inner.lock().lifecycle
    }

    pub fn is_enabled(&self) -> bool {
        self.lifecycle() == ReaderLifecycle::Enabled
    }

    /// `Created -> Enabled`. Returns `false` if the reader was disabled.
    pub fn enable(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.lifecycle {
            ReaderLifecycle::Created => {
                inner.lifecycle = ReaderLifecycle::Enabled;
                log::debug!("[RtpsReader] Enabled {}", self.guid);
                true
            }
            ReaderLifecycle::Enabled => true,
            ReaderLifecycle::Disabled => false,
        }
    }

    /// Stop the reader: clear the listener, wake every blocked reader
    /// thread, refuse further admissions. Idempotent.
    pub fn disable(&self) {
        {
            let mut inner = self.inner.lock();
            if inner.lifecycle == ReaderLifecycle::Disabled {
                return;
            }
            inner.lifecycle = ReaderLifecycle::Disabled;
        }
        self.listener.store(None);
        self.data_ready.notify_all();
        log::debug!("[RtpsReader] Disabled {}", self.guid);
    }

    /// Install or clear the listener. Ignored once disabled.
    pub fn set_listener(&self, listener: Option<Arc<dyn ReaderListener>>) {
        if self.lifecycle() == ReaderLifecycle::Disabled {
            return;
        }
        self.listener
            .store(listener.map(|listener| Arc::new(ListenerSlot { listener })));
    }

    pub fn has_listener(&self) -> bool {
        self.listener.load().is_some()
    }

    /// Admission entry point for the receive path. `true` iff admitted.
    pub fn on_new_cache_change_added(&self, change: CacheChange) -> bool {
        self.process_change(change).is_admitted()
    }

    /// Same as [`on_new_cache_change_added`](Self::on_new_cache_change_added),
    /// reporting the rejection reason.
    pub fn process_change(&self, change: CacheChange) -> Admission {
        let writer = change.writer_guid();
        let seq = change.sequence_number();

        let sample = change.clone();
        let admission = {
            let mut inner = self.inner.lock();
            if inner.lifecycle != ReaderLifecycle::Enabled {
                Admission::Rejected(RejectReason::ReaderNotEnabled)
            } else if self.kind == ReaderKind::Stateful && !self.writers.contains_key(&writer) {
                log::warn!(
                    "[RtpsReader] {} dropping seq={} from unmatched writer {}",
                    self.guid,
                    seq,
                    writer
                );
                Admission::Rejected(RejectReason::UnknownWriter)
            } else {
                let admission = inner.cache.admit(change);
                let tracked = admission.reason().map_or(true, |r| r.is_final());
                if self.kind == ReaderKind::Stateful && tracked {
                    if let Some(mut proxy) = self.writers.get_mut(&writer) {
                        proxy.on_data(seq);
                    }
                }
                admission
            }
        };
        self.stats.record(admission);

        match admission {
            Admission::Admitted => {
                self.data_ready.notify_all();
                if let Some(slot) = self.listener.load_full() {
                    let _guard = CallbackGuard::enter(&self.callbacks_in_flight);
                    slot.listener.on_data_available(self);
                }
            }
            Admission::Rejected(RejectReason::ReaderNotEnabled) => {
                log::trace!("[RtpsReader] {} not enabled, seq={} ignored", self.guid, seq);
            }
            Admission::Rejected(RejectReason::UnknownWriter) => {}
            Admission::Rejected(reason) => {
                if let Some(slot) = self.listener.load_full() {
                    let _guard = CallbackGuard::enter(&self.callbacks_in_flight);
                    slot.listener.on_sample_rejected(self, reason, &sample);
                }
            }
        }
        admission
    }

    /// Block until an UNREAD change exists, then read it.
    ///
    /// Returns `None` only when the reader is (or becomes) disabled.
    /// The returned change stays in the cache, marked READ.
    pub fn read_next_cache_change(&self) -> Option<CacheChange> {
        let mut inner = self.inner.lock();
        loop {
            if inner.lifecycle == ReaderLifecycle::Disabled {
                return None;
            }
            if let Some(change) = inner.cache.read_next() {
                return Some(change);
            }
            self.data_ready.wait(&mut inner);
        }
    }

    /// Read every UNREAD change into `out` without blocking.
    pub fn read_all_cache_changes(&self, out: &mut Vec<CacheChange>) -> usize {
        let mut inner = self.inner.lock();
        let before = out.len();
        while let Some(change) = inner.cache.read_next() {
            out.push(change);
        }
        out.len() - before
    }

    /// Remove and return the oldest change without blocking.
    pub fn take_next_cache_change(&self) -> Option<CacheChange> {
        self.inner.lock().cache.take_next()
    }

    pub fn unread_count(&self) -> usize {
        self.inner.lock().cache.unread_count()
    }

    /// Drop stored changes whose lifespan elapsed.
    pub fn remove_expired_changes(&self) -> usize {
        let mut inner = self.inner.lock();
        if !inner.cache.has_finite_lifespan() {
            return 0;
        }
        inner.cache.remove_expired(current_time_ns())
    }

    /// Lifespan is the one cache policy that may change after creation.
    pub fn set_lifespan(&self, lifespan: Lifespan) {
        self.inner.lock().cache.set_lifespan(lifespan);
    }

    /// Inspect the history cache under the reader lock.
    pub fn with_cache<R>(&self, f: impl FnOnce(&HistoryCache) -> R) -> R {
        f(&self.inner.lock().cache)
    }

    /// Register a matched writer. Returns `false` if it was already matched.
    pub fn matched_writer_add(&self, writer: GUID, strength: i32) -> bool {
        self.inner.lock().cache.set_writer_strength(writer, strength);
        let mut added = false;
        self.writers.entry(writer).or_insert_with(|| {
            added = true;
            WriterProxy::new(writer)
        });
        if added {
            log::debug!("[RtpsReader] {} matched writer {}", self.guid, writer);
        }
        added
    }

    /// Forget a matched writer and release any instance it owns.
    pub fn matched_writer_remove(&self, writer: GUID) -> bool {
        let removed = self.writers.remove(&writer).is_some();
        self.inner.lock().cache.release_writer(writer);
        if removed {
            log::debug!("[RtpsReader] {} unmatched writer {}", self.guid, writer);
        }
        removed
    }

    pub fn is_matched_writer(&self, writer: GUID) -> bool {
        self.writers.contains_key(&writer)
    }

    pub fn matched_writers(&self) -> Vec<GUID> {
        self.writers.iter().map(|entry| *entry.key()).collect()
    }

    /// HEARTBEAT from a matched writer. `None` if the writer is unknown or
    /// the reader is stateless.
    pub fn on_heartbeat(
        &self,
        writer: GUID,
        first_seq: u64,
        last_seq: u64,
        count: u32,
    ) -> Option<AcknackDecision> {
        if self.kind != ReaderKind::Stateful {
            return None;
        }
        let mut proxy = self.writers.get_mut(&writer)?;
        let decision = proxy.on_heartbeat(first_seq, last_seq, count);
        if matches!(
            decision,
            AcknackDecision::Synchronized { .. } | AcknackDecision::NeedData { .. }
        ) {
            proxy.mark_acknack_sent();
        }
        Some(decision)
    }

    /// GAP from a matched writer: `[start, end)` will never be sent.
    pub fn on_gap(&self, writer: GUID, start: u64, end: u64) -> bool {
        match self.writers.get_mut(&writer) {
            Some(mut proxy) => {
                proxy.on_gap(start..end);
                true
            }
            None => false,
        }
    }

    pub fn missing_changes(&self, writer: GUID) -> Vec<Range<u64>> {
        self.writers
            .get(&writer)
            .map(|proxy| proxy.missing_changes())
            .unwrap_or_default()
    }

    /// Sequence numbers below `seq` not received from `writer`.
    pub fn unreceived_below(&self, writer: GUID, seq: u64) -> u64 {
        self.writers
            .get(&writer)
            .map_or(0, |proxy| proxy.unreceived_below(seq))
    }

    pub fn highest_contiguous(&self, writer: GUID) -> Option<u64> {
        self.writers.get(&writer).map(|proxy| proxy.highest_contiguous())
    }

    /// `true` while a listener callback is executing.
    pub fn has_pending_callbacks(&self) -> bool {
        self.callbacks_in_flight.load(Ordering::Acquire) > 0
    }

    pub(crate) fn callback_guard(&self) -> CallbackGuard<'_> {
        CallbackGuard::enter(&self.callbacks_in_flight)
    }

    pub fn stats(&self) -> &ReaderStats {
        &self.stats
    }

    pub fn evicted_count(&self) -> u64 {
        self.inner.lock().cache.evicted_count()
    }
}

impl std::fmt::Debug for RtpsReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RtpsReader")
            .field("guid", &self.guid)
            .field("kind", &self.kind)
            .field("writers", &self.writers.len())
            .finish_non_exhaustive()
    }
}
