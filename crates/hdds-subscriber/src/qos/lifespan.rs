// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! LIFESPAN QoS policy (DDS v1.4 Sec.2.2.3.9)
//!
//! Specifies the maximum duration a sample remains valid, measured from its
//! source timestamp. Expired samples are refused on arrival and purged from
//! the reader history cache.
//!
//! # Examples
//!
//! ```
//! use hdds_subscriber::qos::{Lifespan, LifespanChecker};
//! use std::time::Duration;
//!
//! let checker = LifespanChecker::new(Lifespan::new(Duration::from_millis(5)));
//! assert!(!checker.is_expired(1_000_000, 2_000_000));
//! assert!(checker.is_expired(1_000_000, 7_000_000));
//! ```

use std::time::Duration;

/// LIFESPAN QoS policy
///
/// Default: Infinite (samples never expire).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifespan {
    /// Maximum sample validity duration
    pub duration: Duration,
}

impl Default for Lifespan {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(u64::MAX),
        }
    }
}

impl Lifespan {
    /// Create new lifespan policy with specified duration
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// Create lifespan with infinite duration (no expiration)
    pub fn infinite() -> Self {
        Self::default()
    }

    /// Check if lifespan is infinite (no expiration)
    pub fn is_infinite(&self) -> bool {
        self.duration == Duration::from_secs(u64::MAX)
    }

    /// Create lifespan from milliseconds
    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }
}

/// Expiry test against nanosecond timestamps.
#[derive(Debug, Clone, Copy)]
pub struct LifespanChecker {
    lifespan: Lifespan,
}

impl LifespanChecker {
    pub fn new(lifespan: Lifespan) -> Self {
        Self { lifespan }
    }

    /// `true` when the checker can never report an expiry.
    pub fn is_infinite(&self) -> bool {
        self.lifespan.is_infinite()
    }

    /// Check whether a sample stamped at `source_ts_ns` has expired at `now_ns`.
    ///
    /// A zero source timestamp means "not stamped" and never expires.
    pub fn is_expired(&self, source_ts_ns: u64, now_ns: u64) -> bool {
        if self.is_infinite() || source_ts_ns == 0 {
            return false;
        }
        let lifespan_ns = u64::try_from(self.lifespan.duration.as_nanos()).unwrap_or(u64::MAX);
        now_ns.saturating_sub(source_ts_ns) > lifespan_ns
    }
}
