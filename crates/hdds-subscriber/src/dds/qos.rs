// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! QoS bundles for subscription entities.
//!
//! `DataReaderQos` is copied by value into every reader at creation; no
//! reader ever observes a later change to a default.

use super::{Error, Result};
use crate::qos::{
    Durability, EntityFactory, History, Lifespan, Ownership, Partition, Presentation,
    Reliability, ResourceLimits,
};
use crate::rtps::ReaderAttributes;

/// DataReader QoS.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataReaderQos {
    pub durability: Durability,
    pub reliability: Reliability,
    pub history: History,
    pub resource_limits: ResourceLimits,
    pub ownership: Ownership,
    pub lifespan: Lifespan,
    pub user_data: Vec<u8>,
}

impl DataReaderQos {
    /// Reliable reader with default history.
    pub fn reliable() -> Self {
        Self {
            reliability: Reliability::Reliable,
            ..Self::default()
        }
    }

    /// Best-effort reader with default history.
    pub fn best_effort() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn keep_last(mut self, depth: u32) -> Self {
        self.history = History::KeepLast(depth);
        self
    }

    #[must_use]
    pub fn keep_all(mut self) -> Self {
        self.history = History::KeepAll;
        self
    }

    #[must_use]
    pub fn resource_limits(mut self, limits: ResourceLimits) -> Self {
        self.resource_limits = limits;
        self
    }

    #[must_use]
    pub fn ownership(mut self, ownership: Ownership) -> Self {
        self.ownership = ownership;
        self
    }

    #[must_use]
    pub fn lifespan(mut self, lifespan: Lifespan) -> Self {
        self.lifespan = lifespan;
        self
    }

    #[must_use]
    pub fn durability(mut self, durability: Durability) -> Self {
        self.durability = durability;
        self
    }

    /// Check internal consistency.
    ///
    /// # Rules
    ///
    /// - KEEP_LAST depth must be > 0
    /// - KEEP_LAST depth must not exceed `max_samples_per_instance`
    /// - ResourceLimits must be consistent (see [`ResourceLimits::validate`])
    pub fn validate(&self) -> Result<()> {
        self.resource_limits.validate().map_err(Error::BadParameter)?;

        if let History::KeepLast(depth) = self.history {
            if depth == 0 {
                return Err(Error::BadParameter(
                    "KEEP_LAST history depth must be > 0".to_string(),
                ));
            }
            if depth as usize > self.resource_limits.max_samples_per_instance {
                return Err(Error::BadParameter(format!(
                    "history depth ({}) exceeds max_samples_per_instance ({})",
                    depth, self.resource_limits.max_samples_per_instance
                )));
            }
        }
        Ok(())
    }

    /// Name of the first policy that differs and may not change once enabled.
    pub(crate) fn immutable_change(&self, other: &DataReaderQos) -> Option<&'static str> {
        if self.reliability != other.reliability {
            Some("reliability")
        } else if self.history != other.history {
            Some("history")
        } else if self.resource_limits != other.resource_limits {
            Some("resource_limits")
        } else if self.ownership != other.ownership {
            Some("ownership")
        } else if self.durability != other.durability {
            Some("durability")
        } else {
            None
        }
    }
}

impl From<&DataReaderQos> for ReaderAttributes {
    fn from(qos: &DataReaderQos) -> Self {
        ReaderAttributes {
            reliability: qos.reliability,
            history: qos.history,
            resource_limits: qos.resource_limits,
            ownership: qos.ownership.kind,
            lifespan: qos.lifespan,
        }
    }
}

/// Subscriber QoS.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriberQos {
    pub presentation: Presentation,
    pub partition: Partition,
    pub group_data: Vec<u8>,
    pub entity_factory: EntityFactory,
}

/// Topic QoS. Reader-relevant policies are copied by
/// `SubscriberImpl::copy_from_topic_qos`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicQos {
    pub durability: Durability,
    pub reliability: Reliability,
    pub history: History,
    pub resource_limits: ResourceLimits,
    pub ownership: Ownership,
    pub lifespan: Lifespan,
    pub topic_data: Vec<u8>,
}
