// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Writer proxy: per-writer state kept by a stateful reader.
//!
//! Tracks which sequence numbers were received from one remote writer,
//! which are still missing, and how to answer that writer's HEARTBEATs.
//!
//! # Gap tracking
//!
//! On `on_data(seq)`:
//! 1. `seq == last_seen + 1` -> contiguous, no gap
//! 2. `seq > last_seen + 1` -> gap `[last_seen+1..seq)` recorded
//! 3. `seq <= last_seen` -> fills (part of) a gap, or duplicate
//!
//! Ranges are kept sorted and merged; at most `MAX_GAP_RANGES` are tracked,
//! the oldest being dropped past that.
//!
//! RTPS sequence numbers are signed 64-bit on the wire, so anything above
//! [`MAX_SEQUENCE_NUMBER`] is out of range: DATA beyond it is not tracked and
//! HEARTBEAT/GAP bounds are clamped to it.

use std::ops::Range;
use std::time::{Duration, Instant};

use crate::config::RuntimeConfig;
use crate::core::GUID;

/// Maximum number of gap ranges to track per writer.
const MAX_GAP_RANGES: usize = 100;

/// Highest valid RTPS sequence number.
pub const MAX_SEQUENCE_NUMBER: u64 = i64::MAX as u64;

/// Decision after processing a HEARTBEAT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcknackDecision {
    /// Duplicate HEARTBEAT (same or lower count)
    Ignore,

    /// All announced data received; ACKNACK with Final=1.
    Synchronized { bitmap_base: u64 },

    /// Missing data; ACKNACK with Final=0 starting at `bitmap_base`.
    NeedData { bitmap_base: u64 },

    /// Too soon after the previous ACKNACK
    RateLimited,
}

/// Per-writer reception state.
#[derive(Debug, Clone)]
pub struct WriterProxy {
    writer_guid: GUID,

    /// Highest sequence number received or declared irrelevant.
    last_seen: u64,

    /// Missing ranges below `last_seen`, sorted and merged.
    gaps: Vec<Range<u64>>,

    /// Highest sequence number announced by the writer's last HEARTBEAT.
    announced_max: u64,

    last_hb_count: u32,
    last_acknack_time: Option<Instant>,
    rate_limit: Duration,
}

impl WriterProxy {
    pub fn new(writer_guid: GUID) -> Self {
        Self::with_rate_limit(writer_guid, RuntimeConfig::global().acknack_rate_limit)
    }

    pub fn with_rate_limit(writer_guid: GUID, rate_limit: Duration) -> Self {
        Self {
            writer_guid,
            last_seen: 0,
            gaps: Vec::new(),
            announced_max: 0,
            last_hb_count: 0,
            last_acknack_time: None,
            rate_limit,
        }
    }

    pub fn writer_guid(&self) -> GUID {
        self.writer_guid
    }

    /// Record reception of `seq`.
    pub fn on_data(&mut self, seq: u64) {
        if seq == 0 {
            // Sequence numbers start at 1
            return;
        }
        if seq > MAX_SEQUENCE_NUMBER {
            log::debug!(
                "[WriterProxy] {} sequence {} out of range, not tracked",
                self.writer_guid,
                seq
            );
            return;
        }

        let next = self.last_seen.saturating_add(1);
        match seq.cmp(&next) {
            std::cmp::Ordering::Equal => {
                self.last_seen = seq;
            }
            std::cmp::Ordering::Greater => {
                log::trace!(
                    "[WriterProxy] {} gap [{}..{})",
                    self.writer_guid,
                    next,
                    seq
                );
                self.gaps.push(next..seq);
                self.last_seen = seq;
                self.merge_and_compact();
            }
            std::cmp::Ordering::Less => {
                self.mark_filled(seq..seq.saturating_add(1));
            }
        }
    }

    /// Process a HEARTBEAT announcing `[first_seq, last_seq]`.
    pub fn on_heartbeat(&mut self, first_seq: u64, last_seq: u64, count: u32) -> AcknackDecision {
        if count <= self.last_hb_count && self.last_hb_count > 0 {
            log::trace!(
                "[WriterProxy] Ignoring duplicate HEARTBEAT count={} (last={})",
                count,
                self.last_hb_count
            );
            return AcknackDecision::Ignore;
        }
        self.last_hb_count = count;

        let first_seq = first_seq.min(MAX_SEQUENCE_NUMBER);
        let last_seq = last_seq.min(MAX_SEQUENCE_NUMBER);
        if last_seq < first_seq || last_seq == 0 {
            return AcknackDecision::Synchronized {
                bitmap_base: first_seq.max(1),
            };
        }

        // Writer no longer holds anything below first_seq.
        if first_seq > 1 {
            self.on_gap(1..first_seq);
        }
        self.announced_max = self.announced_max.max(last_seq);

        if let Some(last_time) = self.last_acknack_time {
            if last_time.elapsed() < self.rate_limit {
                return AcknackDecision::RateLimited;
            }
        }

        let bitmap_base = self.highest_contiguous().saturating_add(1).max(first_seq);
        if self.missing_changes().is_empty() {
            log::debug!(
                "[WriterProxy] {} synchronized up to {}",
                self.writer_guid,
                last_seq
            );
            AcknackDecision::Synchronized { bitmap_base }
        } else {
            log::debug!(
                "[WriterProxy] {} needs data from {} (announced {})",
                self.writer_guid,
                bitmap_base,
                last_seq
            );
            AcknackDecision::NeedData { bitmap_base }
        }
    }

    /// Record a GAP: `irrelevant` will never be sent.
    pub fn on_gap(&mut self, irrelevant: Range<u64>) {
        let irrelevant = irrelevant.start..irrelevant.end.min(MAX_SEQUENCE_NUMBER + 1);
        if irrelevant.start >= irrelevant.end {
            return;
        }
        self.mark_filled(irrelevant.clone());
        let last = irrelevant.end - 1;
        if last > self.last_seen {
            let next = self.last_seen.saturating_add(1);
            if irrelevant.start > next {
                self.gaps.push(next..irrelevant.start);
            }
            self.last_seen = last;
            self.merge_and_compact();
        }
    }

    /// Record that an ACKNACK was sent (for rate limiting).
    pub fn mark_acknack_sent(&mut self) {
        self.last_acknack_time = Some(Instant::now());
    }

    /// Missing sequence ranges, including announced but never received ones.
    pub fn missing_changes(&self) -> Vec<Range<u64>> {
        let mut missing = self.gaps.clone();
        if self.announced_max > self.last_seen {
            // announced_max is clamped, so the exclusive end cannot overflow
            missing.push(self.last_seen + 1..self.announced_max + 1);
        }
        missing
    }

    /// Highest `n` such that every sequence in `1..=n` is accounted for.
    pub fn highest_contiguous(&self) -> u64 {
        self.gaps
            .first()
            .map_or(self.last_seen, |gap| gap.start.saturating_sub(1))
    }

    /// Sequence numbers below `seq` never received.
    pub fn unreceived_below(&self, seq: u64) -> u64 {
        let seq = seq.min(MAX_SEQUENCE_NUMBER + 1);
        let in_gaps: u64 = self
            .gaps
            .iter()
            .map(|gap| gap.end.min(seq).saturating_sub(gap.start))
            .sum();
        in_gaps.saturating_add(seq.saturating_sub(self.last_seen.saturating_add(1)))
    }

    /// Highest sequence number received or declared irrelevant.
    pub fn last_seen(&self) -> u64 {
        self.last_seen
    }

    fn mark_filled(&mut self, filled: Range<u64>) {
        let mut updated = Vec::with_capacity(self.gaps.len() + 1);
        for gap in &self.gaps {
            if filled.end <= gap.start || filled.start >= gap.end {
                updated.push(gap.clone());
            } else {
                if gap.start < filled.start {
                    updated.push(gap.start..filled.start);
                }
                if filled.end < gap.end {
                    updated.push(filled.end..gap.end);
                }
            }
        }
        self.gaps = updated;
    }

    fn merge_and_compact(&mut self) {
        if self.gaps.is_empty() {
            return;
        }
        self.gaps.sort_by_key(|r| r.start);

        let mut merged: Vec<Range<u64>> = Vec::with_capacity(self.gaps.len());
        for gap in self.gaps.drain(..) {
            match merged.last_mut() {
                Some(current) if gap.start <= current.end => {
                    current.end = current.end.max(gap.end);
                }
                _ => merged.push(gap),
            }
        }
        self.gaps = merged;

        if self.gaps.len() > MAX_GAP_RANGES {
            let excess = self.gaps.len() - MAX_GAP_RANGES;
            log::debug!(
                "[WriterProxy] capacity exceeded, dropping {} oldest gaps",
                excess
            );
            self.gaps.drain(0..excess);
        }
    }
}
