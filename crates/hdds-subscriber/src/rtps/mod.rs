// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RTPS reader protocol layer.
//!
//! - [`HistoryCache`]: QoS admission and eviction
//! - [`WriterProxy`]: per-writer sequence tracking for stateful readers
//! - [`RtpsReader`]: admission entry point, pull/push delivery
//! - [`ReceivePump`]: receive-path worker thread

/// Reader history cache.
pub mod history_cache;
/// RTPS reader entity.
pub mod reader;
/// Receive-path worker.
pub mod receive;
/// Matched-writer state for stateful readers.
pub mod writer_proxy;

pub use history_cache::{Admission, HistoryCache, RejectReason, ResourceLimitKind};
pub use reader::{
    ReaderAttributes, ReaderKind, ReaderLifecycle, ReaderListener, ReaderStats, RtpsReader,
};
pub use receive::{ChangeSink, PumpMetrics, ReceivePump};
pub use writer_proxy::{AcknackDecision, WriterProxy};
