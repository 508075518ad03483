// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! PRESENTATION QoS policy (DDS v1.4 Sec.2.2.3.6)
//!
//! Immutable once the subscriber is enabled.

/// Access scope for coherent/ordered presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresentationAccessScope {
    /// Ordering/coherency per instance (default)
    #[default]
    Instance,
    /// Ordering/coherency across instances of one reader
    Topic,
    /// Ordering/coherency across all readers of the subscriber
    Group,
}

/// PRESENTATION QoS policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Presentation {
    pub access_scope: PresentationAccessScope,
    pub coherent_access: bool,
    pub ordered_access: bool,
}

impl Presentation {
    /// Instance scope, no coherent or ordered access.
    pub fn instance() -> Self {
        Self::default()
    }

    pub fn topic() -> Self {
        Self {
            access_scope: PresentationAccessScope::Topic,
            ..Self::default()
        }
    }

    pub fn group() -> Self {
        Self {
            access_scope: PresentationAccessScope::Group,
            ..Self::default()
        }
    }
}
