// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! QoS (Quality of Service) policies consumed by the reader history cache.
//!
//! # Supported Policies
//!
//! - **Reliability**: BestEffort (stateless reader) or Reliable (stateful reader)
//! - **History**: KeepLast(n) evicts per instance, KeepAll rejects at ResourceLimits
//! - **Durability**: Volatile, TransientLocal, Persistent (Persistent is refused at reader creation)
//! - **ResourceLimits**: max_samples, max_instances, max_samples_per_instance
//! - **Ownership**, **Lifespan**, **EntityFactory**, **Presentation**, **Partition** in submodules

/// Entity factory QoS policy - autoenable behavior.
pub mod entity_factory;
/// Lifespan QoS policy - data expiration time.
pub mod lifespan;
/// Ownership QoS policy - exclusive vs shared writers.
pub mod ownership;
/// Partition QoS policy - logical data separation.
pub mod partition;
/// Presentation QoS policy - access scope and coherency.
pub mod presentation;

pub use crate::config::LENGTH_UNLIMITED;
pub use entity_factory::EntityFactory;
pub use lifespan::{Lifespan, LifespanChecker};
pub use ownership::{InstanceOwner, Ownership, OwnershipKind};
pub use partition::Partition;
pub use presentation::{Presentation, PresentationAccessScope};

use crate::config::DEFAULT_HISTORY_DEPTH;

/// Reliability policy
///
/// Fixes the reader state machine at construction: BestEffort readers are
/// stateless, Reliable readers track every matched writer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Reliability {
    /// Fire-and-forget (no ACKs, no retransmission)
    #[default]
    BestEffort,
    /// Reliable delivery with NACK-driven retransmission
    Reliable,
}

/// History policy
///
/// Determines how many samples to keep per instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum History {
    /// Keep last N samples per instance (oldest evicted first).
    ///
    /// Uses u32 for network serialization compatibility.
    KeepLast(u32),
    /// Keep all samples within resource limits.
    ///
    /// Inserts are rejected once the limits are reached.
    KeepAll,
}

impl Default for History {
    fn default() -> Self {
        Self::KeepLast(DEFAULT_HISTORY_DEPTH)
    }
}

/// Durability policy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Durability {
    /// No persistence (samples lost on writer crash)
    #[default]
    Volatile,
    /// Writer caches samples for late-joiners
    TransientLocal,
    /// Samples outlive the writer in a durability service
    Transient,
    /// Samples persisted to disk for late-joiners
    Persistent,
}

/// Resource limits for a reader history cache.
///
/// `LENGTH_UNLIMITED` disables a limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Maximum total samples across all instances
    pub max_samples: usize,
    /// Maximum instances holding samples at the same time
    pub max_instances: usize,
    /// Maximum samples per instance
    pub max_samples_per_instance: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl ResourceLimits {
    /// All limits disabled.
    pub const fn unlimited() -> Self {
        Self {
            max_samples: LENGTH_UNLIMITED,
            max_instances: LENGTH_UNLIMITED,
            max_samples_per_instance: LENGTH_UNLIMITED,
        }
    }

    /// Check internal consistency.
    ///
    /// # Rules
    ///
    /// - No limit may be zero
    /// - max_samples >= max_samples_per_instance
    pub fn validate(&self) -> Result<(), String> {
        if self.max_samples == 0 || self.max_instances == 0 || self.max_samples_per_instance == 0
        {
            return Err("ResourceLimits values must be > 0 (or LENGTH_UNLIMITED)".to_string());
        }
        if self.max_samples < self.max_samples_per_instance {
            return Err(format!(
                "max_samples ({}) must be >= max_samples_per_instance ({})",
                self.max_samples, self.max_samples_per_instance
            ));
        }
        Ok(())
    }
}
