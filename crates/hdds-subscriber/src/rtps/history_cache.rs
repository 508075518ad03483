// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! History cache for reader-side sample admission.
//!
//! Ordered store of received changes, partitioned by instance. Admission
//! applies QoS policy in a fixed order:
//!
//! 1. LIFESPAN: samples already expired on arrival are refused
//! 2. Staleness: a (writer, instance) sequence number must strictly increase
//! 3. EXCLUSIVE OWNERSHIP: weaker writers are refused regardless of limits
//! 4. RESOURCE_LIMITS / HISTORY: KEEP_LAST evicts (FIFO), KEEP_ALL refuses
//!
//! The cache does no locking of its own; the owning reader guards it.
//!
//! ```text
//! changes: [A1][B1][A2][B2][A3]      (arrival order)
//!           ^
//!           take_next() pops here, read_next() marks the first UNREAD
//! instances: A -> {samples: 3, alive, high-water per writer}
//!            B -> {samples: 2, ...}
//! ```

use std::collections::{HashMap, VecDeque};
use std::fmt;

use crate::core::{current_time_ns, CacheChange, ChangeKind, InstanceHandle, SampleState, ViewState, GUID};
use crate::qos::{
    History, InstanceOwner, Lifespan, LifespanChecker, OwnershipKind, ResourceLimits,
    LENGTH_UNLIMITED,
};

/// Which resource limit refused a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceLimitKind {
    /// Total `max_samples`.
    Samples,
    /// `max_instances` (a new instance would not fit).
    Instances,
    /// `max_samples_per_instance`.
    SamplesPerInstance,
}

/// Why a change was not admitted.
///
/// These are expected QoS outcomes, surfaced for statistics and listeners,
/// never escalated as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// KEEP_ALL history hit a resource limit, or `max_instances` was reached.
    ResourceLimitExceeded(ResourceLimitKind),
    /// Sequence number not greater than one already seen for that writer/instance.
    StaleInstance,
    /// EXCLUSIVE ownership: a stronger writer owns the instance.
    OwnershipRejected,
    /// Writer is not matched with a stateful reader.
    UnknownWriter,
    /// Source timestamp plus lifespan is already in the past.
    LifespanExpired,
    /// Reader is not enabled yet, or has been disabled.
    ReaderNotEnabled,
}

impl RejectReason {
    /// Stable upper-case code for logs and statistics.
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::ResourceLimitExceeded(_) => "RESOURCE_LIMIT_EXCEEDED",
            RejectReason::StaleInstance => "STALE_INSTANCE",
            RejectReason::OwnershipRejected => "OWNERSHIP_REJECTED",
            RejectReason::UnknownWriter => "UNKNOWN_WRITER",
            RejectReason::LifespanExpired => "LIFESPAN_EXPIRED",
            RejectReason::ReaderNotEnabled => "READER_NOT_ENABLED",
        }
    }

    /// `true` if the writer should not be asked for this sample again.
    ///
    /// Resource-limit refusals are transient: a reliable writer may resend
    /// once the reader has taken samples.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            RejectReason::StaleInstance
                | RejectReason::OwnershipRejected
                | RejectReason::LifespanExpired
        )
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::ResourceLimitExceeded(kind) => write!(f, "{} ({:?})", self.code(), kind),
            _ => f.write_str(self.code()),
        }
    }
}

/// Outcome of [`HistoryCache::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Rejected(RejectReason),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }

    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            Admission::Admitted => None,
            Admission::Rejected(reason) => Some(*reason),
        }
    }
}

/// Per-instance bookkeeping. An ALIVE or owned instance keeps its record
/// after its samples are gone, so staleness and view state stay correct;
/// a NOT_ALIVE, unowned instance with no samples left is forgotten.
#[derive(Debug, Default)]
struct InstanceRecord {
    samples: usize,
    alive: bool,
    owner: InstanceOwner,
    high_water: HashMap<GUID, u64>,
}

impl InstanceRecord {
    fn is_forgettable(&self) -> bool {
        self.samples == 0 && !self.alive && self.owner.owner().is_none()
    }
}

/// Reader history cache.
pub struct HistoryCache {
    changes: VecDeque<CacheChange>,
    instances: HashMap<InstanceHandle, InstanceRecord>,
    history: History,
    limits: ResourceLimits,
    ownership: OwnershipKind,
    lifespan: LifespanChecker,
    writer_strengths: HashMap<GUID, i32>,
    /// Instances currently holding at least one sample.
    live_instances: usize,
    evicted: u64,
}

impl HistoryCache {
    /// Create a cache with SHARED ownership and infinite lifespan.
    pub fn new(history: History, limits: ResourceLimits) -> Self {
        let capacity = if limits.max_samples == LENGTH_UNLIMITED {
            16
        } else {
            limits.max_samples.min(1024)
        };
        Self {
            changes: VecDeque::with_capacity(capacity),
            instances: HashMap::new(),
            history,
            limits,
            ownership: OwnershipKind::Shared,
            lifespan: LifespanChecker::new(Lifespan::infinite()),
            writer_strengths: HashMap::new(),
            live_instances: 0,
            evicted: 0,
        }
    }

    #[must_use]
    pub fn with_ownership(mut self, ownership: OwnershipKind) -> Self {
        self.ownership = ownership;
        self
    }

    #[must_use]
    pub fn with_lifespan(mut self, lifespan: Lifespan) -> Self {
        self.lifespan = LifespanChecker::new(lifespan);
        self
    }

    /// Replace the LIFESPAN policy. Applies to admissions and purges from now on.
    pub fn set_lifespan(&mut self, lifespan: Lifespan) {
        self.lifespan = LifespanChecker::new(lifespan);
    }

    /// Register the OWNERSHIP_STRENGTH of a matched writer (default 0).
    pub fn set_writer_strength(&mut self, writer: GUID, strength: i32) {
        self.writer_strengths.insert(writer, strength);
    }

    /// Forget a writer: drop its strength, its high-water marks and any
    /// instance ownership it holds.
    pub fn release_writer(&mut self, writer: GUID) {
        self.writer_strengths.remove(&writer);
        for record in self.instances.values_mut() {
            record.owner.release(writer);
            record.high_water.remove(&writer);
        }
        self.prune_instances();
    }

    /// Admit a change using the current wall clock for lifespan checks.
    pub fn admit(&mut self, change: CacheChange) -> Admission {
        self.admit_at(change, current_time_ns())
    }

    /// Admit a change as of `now_ns`.
    pub fn admit_at(&mut self, mut change: CacheChange, now_ns: u64) -> Admission {
        if let Err(reason) = self.check_admission(&change, now_ns) {
            log::debug!(
                "[HistoryCache] Rejected seq={} writer={} reason={}",
                change.sequence_number(),
                change.writer_guid(),
                reason
            );
            return Admission::Rejected(reason);
        }

        self.make_room(change.instance_handle());

        let writer = change.writer_guid();
        let strength = self.writer_strength(writer);
        let exclusive = self.ownership == OwnershipKind::Exclusive;
        let record = self.instances.entry(change.instance_handle()).or_default();

        if exclusive {
            record.owner.offer(writer, strength);
        }

        change.view_state = if record.alive {
            ViewState::NotNew
        } else {
            ViewState::New
        };
        match change.kind() {
            ChangeKind::Alive => record.alive = true,
            ChangeKind::NotAliveDisposed => record.alive = false,
            ChangeKind::NotAliveUnregistered => {
                record.alive = false;
                record.owner.release(writer);
            }
        }

        record.high_water.insert(writer, change.sequence_number());
        if record.samples == 0 {
            self.live_instances += 1;
        }
        record.samples += 1;

        change.sample_state = SampleState::Unread;
        self.changes.push_back(change);
        Admission::Admitted
    }

    fn check_admission(&self, change: &CacheChange, now_ns: u64) -> Result<(), RejectReason> {
        if self.lifespan.is_expired(change.source_timestamp_ns(), now_ns) {
            return Err(RejectReason::LifespanExpired);
        }

        let writer = change.writer_guid();
        let record = self.instances.get(&change.instance_handle());

        if let Some(record) = record {
            if record
                .high_water
                .get(&writer)
                .is_some_and(|&high| change.sequence_number() <= high)
            {
                return Err(RejectReason::StaleInstance);
            }
            if self.ownership == OwnershipKind::Exclusive
                && !record.owner.accepts(writer, self.writer_strength(writer))
            {
                return Err(RejectReason::OwnershipRejected);
            }
        }

        let instance_samples = record.map_or(0, |r| r.samples);
        if instance_samples == 0 && self.live_instances >= self.limits.max_instances {
            return Err(RejectReason::ResourceLimitExceeded(
                ResourceLimitKind::Instances,
            ));
        }

        if matches!(self.history, History::KeepAll) {
            if instance_samples >= self.limits.max_samples_per_instance {
                return Err(RejectReason::ResourceLimitExceeded(
                    ResourceLimitKind::SamplesPerInstance,
                ));
            }
            if self.changes.len() >= self.limits.max_samples {
                return Err(RejectReason::ResourceLimitExceeded(
                    ResourceLimitKind::Samples,
                ));
            }
        }

        Ok(())
    }

    /// KEEP_LAST: evict the instance's oldest change at depth, then the
    /// oldest change overall if the cache is full.
    fn make_room(&mut self, handle: InstanceHandle) {
        if !matches!(self.history, History::KeepLast(_)) {
            return;
        }
        if self.len_for_instance(handle) >= self.instance_depth() {
            if let Some(pos) = self
                .changes
                .iter()
                .position(|c| c.instance_handle() == handle)
            {
                self.evict_at(pos);
            }
        }
        if self.changes.len() >= self.limits.max_samples {
            self.evict_at(0);
        }
    }

    fn evict_at(&mut self, pos: usize) {
        if let Some(change) = self.changes.remove(pos) {
            log::trace!(
                "[HistoryCache] Evicted seq={} writer={}",
                change.sequence_number(),
                change.writer_guid()
            );
            self.evicted += 1;
            self.on_removed(change.instance_handle());
        }
    }

    fn on_removed(&mut self, handle: InstanceHandle) {
        let Some(record) = self.instances.get_mut(&handle) else {
            return;
        };
        record.samples = record.samples.saturating_sub(1);
        if record.samples == 0 {
            self.live_instances = self.live_instances.saturating_sub(1);
            if record.is_forgettable() {
                self.instances.remove(&handle);
            }
        }
    }

    fn prune_instances(&mut self) {
        let before = self.instances.len();
        self.instances.retain(|_, record| !record.is_forgettable());
        let pruned = before - self.instances.len();
        if pruned > 0 {
            log::trace!("[HistoryCache] Forgot {} not-alive instances", pruned);
        }
    }

    fn instance_depth(&self) -> usize {
        match self.history {
            History::KeepLast(depth) => {
                (depth.max(1) as usize).min(self.limits.max_samples_per_instance)
            }
            History::KeepAll => self.limits.max_samples_per_instance,
        }
    }

    fn writer_strength(&self, writer: GUID) -> i32 {
        self.writer_strengths.get(&writer).copied().unwrap_or(0)
    }

    /// Oldest UNREAD change in arrival order. Does not change any state.
    pub fn next_unread(&self) -> Option<&CacheChange> {
        self.changes
            .iter()
            .find(|c| c.sample_state() == SampleState::Unread)
    }

    /// Return the oldest UNREAD change and mark it READ.
    ///
    /// The returned snapshot still shows `SampleState::Unread` (the state it
    /// had when it was read); the stored change stays until taken or evicted.
    pub fn read_next(&mut self) -> Option<CacheChange> {
        let stored = self
            .changes
            .iter_mut()
            .find(|c| c.sample_state() == SampleState::Unread)?;
        let snapshot = stored.clone();
        stored.sample_state = SampleState::Read;
        Some(snapshot)
    }

    /// Remove and return the oldest change, read or unread.
    pub fn take_next(&mut self) -> Option<CacheChange> {
        let change = self.changes.pop_front()?;
        self.on_removed(change.instance_handle());
        Some(change)
    }

    /// Drop every change whose lifespan elapsed as of `now_ns`.
    pub fn remove_expired(&mut self, now_ns: u64) -> usize {
        if self.lifespan.is_infinite() {
            return 0;
        }
        let lifespan = self.lifespan;
        let mut expired = Vec::new();
        self.changes.retain(|c| {
            if lifespan.is_expired(c.source_timestamp_ns(), now_ns) {
                expired.push(c.instance_handle());
                false
            } else {
                true
            }
        });
        for handle in &expired {
            self.on_removed(*handle);
        }
        if !expired.is_empty() {
            log::trace!("[HistoryCache] Purged {} expired changes", expired.len());
        }
        expired.len()
    }

    /// `true` if a lifespan shorter than infinity is configured.
    pub fn has_finite_lifespan(&self) -> bool {
        !self.lifespan.is_infinite()
    }

    /// Drop all stored changes. Bookkeeping of ALIVE or owned instances
    /// (staleness, view state) is kept.
    pub fn clear(&mut self) {
        self.changes.clear();
        for record in self.instances.values_mut() {
            record.samples = 0;
        }
        self.live_instances = 0;
        self.prune_instances();
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn len_for_instance(&self, handle: InstanceHandle) -> usize {
        self.instances.get(&handle).map_or(0, |r| r.samples)
    }

    pub fn unread_count(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| c.sample_state() == SampleState::Unread)
            .count()
    }

    /// Instances currently holding at least one change.
    pub fn instance_count(&self) -> usize {
        self.live_instances
    }

    /// Instances with bookkeeping, including ones whose samples are gone.
    pub fn tracked_instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Changes evicted by KEEP_LAST since creation.
    pub fn evicted_count(&self) -> u64 {
        self.evicted
    }

    /// Current EXCLUSIVE owner of an instance, if any.
    pub fn instance_owner(&self, handle: InstanceHandle) -> Option<GUID> {
        self.instances.get(&handle).and_then(|r| r.owner.owner())
    }

    /// Stored changes in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &CacheChange> {
        self.changes.iter()
    }

    pub fn history(&self) -> History {
        self.history
    }

    pub fn resource_limits(&self) -> ResourceLimits {
        self.limits
    }
}

impl fmt::Debug for HistoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryCache")
            .field("len", &self.changes.len())
            .field("instances", &self.live_instances)
            .field("history", &self.history)
            .field("limits", &self.limits)
            .field("ownership", &self.ownership)
            .finish_non_exhaustive()
    }
}
