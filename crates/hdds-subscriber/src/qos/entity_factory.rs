// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ENTITY_FACTORY QoS policy (DDS v1.4 Sec.2.2.3.5)
//!
//! Decides whether `create_datareader` on an enabled subscriber returns an
//! enabled reader, or a disabled one that waits for
//! `autoenable_entities()` (or its own `enable()`).
//!
//! ```
//! use hdds_subscriber::qos::EntityFactory;
//!
//! assert!(EntityFactory::default().is_auto_enable());
//! assert!(!EntityFactory::from(false).is_auto_enable());
//! ```

/// ENTITY_FACTORY QoS policy. Defaults to auto-enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityFactory {
    pub autoenable_created_entities: bool,
}

impl Default for EntityFactory {
    fn default() -> Self {
        Self::auto_enable()
    }
}

impl From<bool> for EntityFactory {
    fn from(autoenable_created_entities: bool) -> Self {
        Self {
            autoenable_created_entities,
        }
    }
}

impl EntityFactory {
    pub fn auto_enable() -> Self {
        Self::from(true)
    }

    /// Readers stay disabled until enabled explicitly.
    pub fn manual_enable() -> Self {
        Self::from(false)
    }

    pub fn is_auto_enable(&self) -> bool {
        self.autoenable_created_entities
    }
}
