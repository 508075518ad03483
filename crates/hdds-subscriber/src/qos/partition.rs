// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! PARTITION QoS policy (DDS v1.4 Sec.2.2.3.13)
//!
//! Logical separation of readers and writers within a domain. An empty
//! partition list is the default partition "".

/// PARTITION QoS policy
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Partition {
    /// Partition names
    pub names: Vec<String>,
}

impl Partition {
    /// Single named partition.
    pub fn single(name: &str) -> Self {
        Self {
            names: vec![name.to_string()],
        }
    }

    /// `true` for the default partition.
    pub fn is_default(&self) -> bool {
        self.names.is_empty() || self.names.iter().all(String::is_empty)
    }
}
