// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Communication status types.

use crate::core::GUID;
use crate::rtps::{RejectReason, ResourceLimitKind};

/// Bitmask of communication statuses a listener is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusMask(u32);

impl StatusMask {
    /// No status bits set.
    pub const NONE: StatusMask = StatusMask(0);

    /// All status bits set.
    pub const ALL: StatusMask = StatusMask(0xFFFF_FFFF);

    /// New data available to read.
    pub const DATA_AVAILABLE: StatusMask = StatusMask(1 << 0);

    /// Sample was lost (never received).
    pub const SAMPLE_LOST: StatusMask = StatusMask(1 << 1);

    /// Sample was rejected (resource limits or QoS).
    pub const SAMPLE_REJECTED: StatusMask = StatusMask(1 << 2);

    /// Deadline was missed for an instance.
    pub const REQUESTED_DEADLINE_MISSED: StatusMask = StatusMask(1 << 4);

    /// Incompatible QoS requested.
    pub const REQUESTED_INCOMPATIBLE_QOS: StatusMask = StatusMask(1 << 5);

    /// Subscription matched with a writer.
    pub const SUBSCRIPTION_MATCHED: StatusMask = StatusMask(1 << 6);

    /// Some reader of a subscriber has new data (subscriber-level).
    pub const DATA_ON_READERS: StatusMask = StatusMask(1 << 11);

    pub const fn from_bits(bits: u32) -> Self {
        StatusMask(bits)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// `true` if every bit of `other` is set.
    pub const fn contains(&self, other: StatusMask) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl std::ops::BitOr for StatusMask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        StatusMask(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for StatusMask {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self::Output {
        StatusMask(self.0 & rhs.0)
    }
}

/// Why a sample was rejected, as reported in [`SampleRejectedStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleRejectedReason {
    #[default]
    NotRejected,
    /// `max_samples` reached.
    ResourceLimit,
    /// `max_instances` reached.
    InstanceLimit,
    /// `max_samples_per_instance` reached.
    SamplesPerInstanceLimit,
    /// Stale, ownership or lifespan refusal.
    Policy(RejectReason),
}

impl From<RejectReason> for SampleRejectedReason {
    fn from(reason: RejectReason) -> Self {
        match reason {
            RejectReason::ResourceLimitExceeded(ResourceLimitKind::Samples) => Self::ResourceLimit,
            RejectReason::ResourceLimitExceeded(ResourceLimitKind::Instances) => Self::InstanceLimit,
            RejectReason::ResourceLimitExceeded(ResourceLimitKind::SamplesPerInstance) => {
                Self::SamplesPerInstanceLimit
            }
            other => Self::Policy(other),
        }
    }
}

/// Cumulative rejected-sample status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleRejectedStatus {
    pub total_count: u32,
    /// Change in total_count since the status was last read.
    pub total_count_change: i32,
    pub last_reason: SampleRejectedReason,
}

/// Subscription matching status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionMatchedStatus {
    /// Total cumulative count of matched writers.
    pub total_count: u32,
    pub total_count_change: i32,
    /// Current number of matched writers.
    pub current_count: u32,
    pub current_count_change: i32,
    /// Last writer matched or unmatched.
    pub last_publication_handle: Option<GUID>,
}

/// Lost-sample status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleLostStatus {
    pub total_count: u32,
    pub total_count_change: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_ops() {
        let mask = StatusMask::DATA_AVAILABLE | StatusMask::SAMPLE_REJECTED;
        assert!(mask.contains(StatusMask::DATA_AVAILABLE));
        assert!(!mask.contains(StatusMask::DATA_ON_READERS));
        assert!(StatusMask::ALL.contains(mask));
        assert_eq!((mask & StatusMask::SAMPLE_REJECTED).bits(), 1 << 2);
    }

    #[test]
    fn test_rejected_reason_mapping() {
        assert_eq!(
            SampleRejectedReason::from(RejectReason::ResourceLimitExceeded(
                ResourceLimitKind::SamplesPerInstance
            )),
            SampleRejectedReason::SamplesPerInstanceLimit
        );
        assert_eq!(
            SampleRejectedReason::from(RejectReason::StaleInstance),
            SampleRejectedReason::Policy(RejectReason::StaleInstance)
        );
    }
}
