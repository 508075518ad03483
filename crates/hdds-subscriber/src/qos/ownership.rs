// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! OWNERSHIP QoS policy (DDS v1.4 Sec.2.2.3.11)
//!
//! Controls whether multiple DataWriters can update the same data instance.
//!
//! # Kinds
//!
//! - **SHARED** (default): Multiple writers can update the same instance
//! - **EXCLUSIVE**: Only the writer with highest OWNERSHIP_STRENGTH updates it
//!
//! In EXCLUSIVE mode the reader keeps one [`InstanceOwner`] per instance.
//! A writer whose strength is lower than the current owner's is rejected;
//! equal or higher strength takes over.

use crate::core::GUID;

/// OWNERSHIP QoS kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OwnershipKind {
    /// Multiple writers can update the same instance (default)
    #[default]
    Shared,
    /// Only the highest-strength writer can update an instance
    Exclusive,
}

/// OWNERSHIP QoS policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ownership {
    /// Ownership mode (SHARED or EXCLUSIVE)
    pub kind: OwnershipKind,
}

impl Ownership {
    pub fn new(kind: OwnershipKind) -> Self {
        Self { kind }
    }

    /// Create shared ownership (multiple writers allowed)
    pub fn shared() -> Self {
        Self::new(OwnershipKind::Shared)
    }

    /// Create exclusive ownership (highest-strength writer wins)
    pub fn exclusive() -> Self {
        Self::new(OwnershipKind::Exclusive)
    }

    pub fn is_exclusive(&self) -> bool {
        self.kind == OwnershipKind::Exclusive
    }
}

/// Current owner of one instance under EXCLUSIVE ownership.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstanceOwner {
    owner: Option<(GUID, i32)>,
}

impl InstanceOwner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer an update from `writer`; returns `true` if it may update the instance.
    ///
    /// No owner yet, the owner itself, or an equal/higher strength writer is
    /// accepted and becomes (or stays) the owner.
    pub fn offer(&mut self, writer: GUID, strength: i32) -> bool {
        match self.owner {
            Some((current, _)) if current == writer => {
                self.owner = Some((writer, strength));
                true
            }
            Some((_, current_strength)) if strength < current_strength => false,
            _ => {
                self.owner = Some((writer, strength));
                true
            }
        }
    }

    /// Would `offer` accept this writer? Does not change ownership.
    pub fn accepts(&self, writer: GUID, strength: i32) -> bool {
        match self.owner {
            Some((current, _)) if current == writer => true,
            Some((_, current_strength)) => strength >= current_strength,
            None => true,
        }
    }

    /// Drop ownership if `writer` holds it.
    pub fn release(&mut self, writer: GUID) -> bool {
        if matches!(self.owner, Some((current, _)) if current == writer) {
            self.owner = None;
            true
        } else {
            false
        }
    }

    pub fn owner(&self) -> Option<GUID> {
        self.owner.map(|(guid, _)| guid)
    }

    pub fn owner_strength(&self) -> Option<i32> {
        self.owner.map(|(_, strength)| strength)
    }
}
