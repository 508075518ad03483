// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Protocol-level value types: GUIDs, instance handles, cache changes.

pub mod cache_change;
pub mod guid;
pub mod types;

pub use cache_change::CacheChange;
pub use guid::GUID;
pub use types::{current_time_ns, ChangeKind, InstanceHandle, SampleState, ViewState};
