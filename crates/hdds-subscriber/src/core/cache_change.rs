// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! One received sample as stored in a reader history cache.

use std::sync::Arc;

use super::guid::GUID;
use super::types::{ChangeKind, InstanceHandle, SampleState, ViewState};

/// Received (already deserialized) sample with its protocol metadata.
///
/// Only `sample_state` and `view_state` change after construction, and only
/// inside the owning history cache. The payload is shared (`Arc<[u8]>`) so
/// snapshots handed to consumers do not copy the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheChange {
    sequence_number: u64,
    writer_guid: GUID,
    instance_handle: InstanceHandle,
    kind: ChangeKind,
    payload: Arc<[u8]>,
    source_timestamp_ns: u64,
    pub(crate) sample_state: SampleState,
    pub(crate) view_state: ViewState,
}

impl CacheChange {
    /// Create a change as handed over by the receive path.
    pub fn new(
        writer_guid: GUID,
        sequence_number: u64,
        instance_handle: InstanceHandle,
        kind: ChangeKind,
        payload: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            sequence_number,
            writer_guid,
            instance_handle,
            kind,
            payload: payload.into(),
            source_timestamp_ns: 0,
            sample_state: SampleState::Unread,
            view_state: ViewState::New,
        }
    }

    /// Set the writer-side source timestamp (nanoseconds since epoch).
    #[must_use]
    pub fn with_source_timestamp(mut self, timestamp_ns: u64) -> Self {
        self.source_timestamp_ns = timestamp_ns;
        self
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn writer_guid(&self) -> GUID {
        self.writer_guid
    }

    pub fn instance_handle(&self) -> InstanceHandle {
        self.instance_handle
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    pub fn is_alive(&self) -> bool {
        self.kind.is_alive()
    }

    /// Serialized payload bytes (empty for dispose/unregister changes).
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Source timestamp in nanoseconds since epoch (0 = not set).
    pub fn source_timestamp_ns(&self) -> u64 {
        self.source_timestamp_ns
    }

    pub fn sample_state(&self) -> SampleState {
        self.sample_state
    }

    pub fn view_state(&self) -> ViewState {
        self.view_state
    }
}
