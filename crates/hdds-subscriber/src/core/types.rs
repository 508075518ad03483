// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sample metadata shared by the history cache and the DDS layer.

use std::time::{SystemTime, UNIX_EPOCH};

/// Instance handle for keyed topics (16-byte key hash).
///
/// This is the DDS-standard instance identifier computed from @key fields.
/// For keyless topics, this is all zeros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct InstanceHandle(pub [u8; 16]);

impl InstanceHandle {
    /// Create a new instance handle from a key hash.
    pub const fn new(key_hash: [u8; 16]) -> Self {
        Self(key_hash)
    }

    /// Create a nil (all zeros) instance handle for keyless topics.
    pub const fn nil() -> Self {
        Self([0u8; 16])
    }

    /// Check if this is a nil handle.
    pub fn is_nil(&self) -> bool {
        self.0 == [0u8; 16]
    }

    /// Get the raw key hash bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl From<u64> for InstanceHandle {
    /// Widen a 64-bit key hash (little-endian in the first 8 bytes).
    fn from(key: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&key.to_le_bytes());
        Self(bytes)
    }
}

/// Kind of write operation that produced a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangeKind {
    /// Regular data sample.
    #[default]
    Alive,
    /// Writer disposed the instance.
    NotAliveDisposed,
    /// Writer unregistered the instance.
    NotAliveUnregistered,
}

impl ChangeKind {
    /// `true` for `Alive`.
    pub fn is_alive(self) -> bool {
        matches!(self, ChangeKind::Alive)
    }
}

/// Sample state per DDS spec (NOT_READ vs READ).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleState {
    /// Sample has not been read yet.
    #[default]
    Unread,
    /// Sample has been accessed via `read()`.
    Read,
}

/// View state per DDS spec.
///
/// `New` marks the first change seen for an instance since the reader
/// started or since the instance last became NOT_ALIVE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    New,
    NotNew,
}

/// Wall-clock time in nanoseconds since the Unix epoch.
pub fn current_time_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
