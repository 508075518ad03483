// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Subscriber-side configuration - single source of truth.
//!
//! # Architecture
//!
//! - **Level 1 (Static)**: Compile-time constants (RTPS entity kinds, limits, defaults)
//! - **Level 2 (Dynamic)**: [`RuntimeConfig`] read once from the environment
//!
//! # Environment
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `HDDS_RECEIVE_QUEUE_DEPTH` | 1024 | Capacity of the receive pump queue |
//! | `HDDS_ACKNACK_RATE_LIMIT_MS` | 10 | Minimum interval between ACKNACKs per writer |

use std::sync::OnceLock;
use std::time::Duration;

/// Special value meaning "no limit" for ResourceLimits.
/// Corresponds to DDS LENGTH_UNLIMITED (-1 as i32).
pub const LENGTH_UNLIMITED: usize = usize::MAX;

/// Default KEEP_LAST depth for reader QoS.
pub const DEFAULT_HISTORY_DEPTH: u32 = 100;

/// Default capacity of the receive pump queue.
pub const DEFAULT_RECEIVE_QUEUE_DEPTH: usize = 1024;

/// Default minimum interval between ACKNACK responses (like FastDDS heartbeat_response_delay).
pub const DEFAULT_ACKNACK_RATE_LIMIT_MS: u64 = 10;

/// RTPS entity kind: reader with key (RTPS v2.5 Sec.9.3.1.2).
pub const ENTITY_KIND_READER_WITH_KEY: u8 = 0x07;

/// RTPS entity kind: reader without key.
pub const ENTITY_KIND_READER_NO_KEY: u8 = 0x04;

/// Largest value of the 3-byte entity key.
pub const MAX_ENTITY_KEY: u32 = 0x00FF_FFFF;

const ENV_RECEIVE_QUEUE_DEPTH: &str = "HDDS_RECEIVE_QUEUE_DEPTH";
const ENV_ACKNACK_RATE_LIMIT_MS: &str = "HDDS_ACKNACK_RATE_LIMIT_MS";

/// Runtime configuration resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Capacity of the receive pump queue.
    pub receive_queue_depth: usize,
    /// Minimum interval between ACKNACK decisions per writer proxy.
    pub acknack_rate_limit: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            receive_queue_depth: DEFAULT_RECEIVE_QUEUE_DEPTH,
            acknack_rate_limit: Duration::from_millis(DEFAULT_ACKNACK_RATE_LIMIT_MS),
        }
    }
}

impl RuntimeConfig {
    /// Build a configuration from environment variables.
    ///
    /// Unparseable or zero values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Process-wide configuration, resolved on first use.
    pub fn global() -> &'static RuntimeConfig {
        static CONFIG: OnceLock<RuntimeConfig> = OnceLock::new();
        CONFIG.get_or_init(Self::from_env)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let receive_queue_depth = parse_positive(&lookup, ENV_RECEIVE_QUEUE_DEPTH)
            .map_or(defaults.receive_queue_depth, |v| v as usize);
        let acknack_rate_limit = parse_positive(&lookup, ENV_ACKNACK_RATE_LIMIT_MS)
            .map_or(defaults.acknack_rate_limit, Duration::from_millis);

        Self {
            receive_queue_depth,
            acknack_rate_limit,
        }
    }
}

fn parse_positive(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Some(value),
        _ => {
            log::warn!("[config] Ignoring invalid {}={:?}, using default", key, raw);
            None
        }
    }
}
