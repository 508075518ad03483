// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RTPS GUID (Globally Unique Identifier) implementation.

use std::fmt;

use crate::config::{ENTITY_KIND_READER_NO_KEY, ENTITY_KIND_READER_WITH_KEY, MAX_ENTITY_KEY};

/// RTPS GUID (Globally Unique Identifier)
///
/// 16-byte identifier following DDS-RTPS v2.3 spec.
///
/// # Structure
/// - Prefix: 12 bytes (participant unique)
/// - Entity ID: 4 bytes (3-byte key + 1-byte entity kind)
///
/// # Display Format
/// Hex with dots: "01.0f.ac.10.00.00.00.00.00.00.00.01.00.00.01.07"
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct GUID {
    pub prefix: [u8; 12],
    pub entity_id: [u8; 4],
}

impl GUID {
    /// Create GUID from raw bytes (16 bytes total)
    ///
    /// # Examples
    /// ```
    /// use hdds_subscriber::GUID;
    ///
    /// let bytes = [1, 15, 172, 16, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 7];
    /// let guid = GUID::from_bytes(bytes);
    /// assert_eq!(guid.as_bytes(), bytes);
    /// ```
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        let mut prefix = [0u8; 12];
        let mut entity_id = [0u8; 4];
        prefix.copy_from_slice(&bytes[0..12]);
        entity_id.copy_from_slice(&bytes[12..16]);
        Self { prefix, entity_id }
    }

    /// Create GUID from separate prefix and entity ID
    pub fn new(prefix: [u8; 12], entity_id: [u8; 4]) -> Self {
        Self { prefix, entity_id }
    }

    /// Build a reader GUID under `prefix` from a 24-bit entity key.
    ///
    /// Returns `None` when `key` does not fit in the 3-byte key field.
    pub fn reader(prefix: [u8; 12], key: u32, keyed: bool) -> Option<Self> {
        if key > MAX_ENTITY_KEY {
            return None;
        }
        let key_bytes = key.to_be_bytes();
        let kind = if keyed {
            ENTITY_KIND_READER_WITH_KEY
        } else {
            ENTITY_KIND_READER_NO_KEY
        };
        Some(Self {
            prefix,
            entity_id: [key_bytes[1], key_bytes[2], key_bytes[3], kind],
        })
    }

    /// Convert GUID to 16-byte array
    pub fn as_bytes(&self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[0..12].copy_from_slice(&self.prefix);
        bytes[12..16].copy_from_slice(&self.entity_id);
        bytes
    }

    /// Create GUID with all zeros (invalid/placeholder)
    pub fn zero() -> Self {
        Self {
            prefix: [0; 12],
            entity_id: [0; 4],
        }
    }

    /// Check if GUID is zero (invalid)
    pub fn is_zero(&self) -> bool {
        self.prefix.iter().all(|&b| b == 0) && self.entity_id.iter().all(|&b| b == 0)
    }

    /// Entity kind octet (last byte of the entity id).
    pub fn entity_kind(&self) -> u8 {
        self.entity_id[3]
    }
}

impl fmt::Debug for GUID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GUID({})", self)
    }
}

impl fmt::Display for GUID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.as_bytes();
        for (i, b) in bytes.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}
