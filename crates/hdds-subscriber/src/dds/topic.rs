// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::qos::TopicQos;

/// Named data channel with an associated type name.
///
/// Created by [`Participant::create_topic`](super::Participant::create_topic);
/// remembers the owning participant's GUID prefix so a subscriber can refuse
/// topics from another participant.
#[derive(Debug, Clone)]
pub struct Topic {
    name: String,
    type_name: String,
    keyed: bool,
    participant_prefix: [u8; 12],
    qos: TopicQos,
}

impl Topic {
    pub(crate) fn new(
        name: &str,
        type_name: &str,
        keyed: bool,
        participant_prefix: [u8; 12],
        qos: TopicQos,
    ) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            keyed,
            participant_prefix,
            qos,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// `true` if samples carry key fields (several instances per topic).
    pub fn is_keyed(&self) -> bool {
        self.keyed
    }

    pub fn qos(&self) -> &TopicQos {
        &self.qos
    }

    pub(crate) fn participant_prefix(&self) -> [u8; 12] {
        self.participant_prefix
    }
}
