// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Minimal domain participant.
//!
//! Only what subscription needs: a GUID prefix, the topic table, entity
//! key allocation and the enable cascade. Discovery and transports live
//! elsewhere.

use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use super::listener::SubscriberListener;
use super::qos::{SubscriberQos, TopicQos};
use super::status::StatusMask;
use super::subscriber::SubscriberImpl;
use super::topic::Topic;
use super::{Error, Result};
use crate::config::MAX_ENTITY_KEY;
use crate::core::GUID;

/// HDDS vendor id.
const VENDOR_ID: [u8; 2] = [0x01, 0xaa];

/// Entity id of the participant itself.
const ENTITYID_PARTICIPANT: [u8; 4] = [0x00, 0x00, 0x01, 0xc1];

/// Distinguishes participants created by one process.
static PARTICIPANT_INSTANCE: AtomicU16 = AtomicU16::new(0);

/// Domain participant (subscription side).
pub struct Participant {
    name: String,
    guid_prefix: [u8; 12],
    topics: DashMap<String, Arc<Topic>>,
    subscribers: Mutex<Vec<Arc<SubscriberImpl>>>,
    enabled: AtomicBool,
    next_entity_key: AtomicU32,
}

impl Participant {
    /// Create a participant. It starts disabled; see [`enable`](Self::enable).
    pub fn new(name: &str) -> Arc<Self> {
        let guid_prefix = generate_guid_prefix();
        log::debug!(
            "[Participant] Created '{}' prefix={}",
            name,
            GUID::new(guid_prefix, ENTITYID_PARTICIPANT)
        );
        Arc::new(Self {
            name: name.to_string(),
            guid_prefix,
            topics: DashMap::new(),
            subscribers: Mutex::new(Vec::new()),
            enabled: AtomicBool::new(false),
            next_entity_key: AtomicU32::new(1),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn guid(&self) -> GUID {
        GUID::new(self.guid_prefix, ENTITYID_PARTICIPANT)
    }

    pub fn guid_prefix(&self) -> [u8; 12] {
        self.guid_prefix
    }

    /// Create (or look up) a keyed topic.
    ///
    /// # Errors
    ///
    /// `BadParameter` for an empty name or type name, `PreconditionNotMet`
    /// if the topic exists with another type.
    pub fn create_topic(
        &self,
        name: &str,
        type_name: &str,
        qos: Option<TopicQos>,
    ) -> Result<Arc<Topic>> {
        self.register_topic(name, type_name, true, qos)
    }

    /// Same as [`create_topic`](Self::create_topic) for a type without key fields.
    pub fn create_keyless_topic(
        &self,
        name: &str,
        type_name: &str,
        qos: Option<TopicQos>,
    ) -> Result<Arc<Topic>> {
        self.register_topic(name, type_name, false, qos)
    }

    fn register_topic(
        &self,
        name: &str,
        type_name: &str,
        keyed: bool,
        qos: Option<TopicQos>,
    ) -> Result<Arc<Topic>> {
        if name.is_empty() || type_name.is_empty() {
            return Err(Error::BadParameter(
                "topic and type names must not be empty".to_string(),
            ));
        }
        let topic = self
            .topics
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(Topic::new(
                    name,
                    type_name,
                    keyed,
                    self.guid_prefix,
                    qos.unwrap_or_default(),
                ))
            })
            .clone();
        if topic.type_name() != type_name {
            return Err(Error::PreconditionNotMet(format!(
                "topic '{}' already registered with type '{}'",
                name,
                topic.type_name()
            )));
        }
        Ok(topic)
    }

    pub fn find_topic(&self, name: &str) -> Option<Arc<Topic>> {
        self.topics.get(name).map(|t| Arc::clone(t.value()))
    }

    /// Create a subscriber. Enabled immediately if this participant is.
    pub fn create_subscriber(
        self: &Arc<Self>,
        qos: Option<SubscriberQos>,
        listener: Option<Arc<dyn SubscriberListener>>,
        mask: StatusMask,
    ) -> Result<Arc<SubscriberImpl>> {
        let key = self.allocate_entity_key()?;
        let subscriber = SubscriberImpl::new(self, key, qos.unwrap_or_default(), listener, mask);
        self.subscribers.lock().push(Arc::clone(&subscriber));
        if self.is_enabled() {
            subscriber.enable()?;
        }
        Ok(subscriber)
    }

    /// Delete an empty subscriber.
    ///
    /// # Errors
    ///
    /// `PreconditionNotMet` if it still owns readers or belongs to another participant.
    pub fn delete_subscriber(&self, subscriber: &Arc<SubscriberImpl>) -> Result<()> {
        let mut subscribers = self.subscribers.lock();
        let pos = subscribers
            .iter()
            .position(|s| Arc::ptr_eq(s, subscriber))
            .ok_or_else(|| {
                Error::PreconditionNotMet("subscriber not owned by this participant".to_string())
            })?;
        if subscriber.has_datareaders() {
            return Err(Error::PreconditionNotMet(
                "subscriber still has data readers".to_string(),
            ));
        }
        subscriber.disable();
        subscribers.remove(pos);
        Ok(())
    }

    /// Enable the participant and cascade to its subscribers.
    pub fn enable(&self) -> Result<()> {
        if self.enabled.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        log::info!("[Participant] Enabled '{}'", self.name);
        let subscribers: Vec<_> = self.subscribers.lock().clone();
        for subscriber in subscribers {
            subscriber.enable()?;
        }
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Allocate the next 24-bit entity key.
    pub(crate) fn allocate_entity_key(&self) -> Result<u32> {
        self.next_entity_key
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |key| {
                (key <= MAX_ENTITY_KEY).then_some(key + 1)
            })
            .map_err(|_| Error::OutOfResources("entity keys exhausted".to_string()))
    }

    #[cfg(test)]
    pub(crate) fn set_next_entity_key(&self, key: u32) {
        self.next_entity_key.store(key, Ordering::Release);
    }
}

impl std::fmt::Debug for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Participant")
            .field("name", &self.name)
            .field("guid", &self.guid())
            .field("topics", &self.topics.len())
            .finish_non_exhaustive()
    }
}

/// vendor(2) | host(4) | pid(4) | instance(2)
fn generate_guid_prefix() -> [u8; 12] {
    let host = (crate::core::current_time_ns() as u32).to_be_bytes();
    let pid = std::process::id().to_be_bytes();
    let instance = PARTICIPANT_INSTANCE.fetch_add(1, Ordering::Relaxed).to_be_bytes();
    [
        VENDOR_ID[0],
        VENDOR_ID[1],
        host[0],
        host[1],
        host[2],
        host[3],
        pid[0],
        pid[1],
        pid[2],
        pid[3],
        instance[0],
        instance[1],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes_are_distinct() {
        let a = Participant::new("a");
        let b = Participant::new("b");
        assert_ne!(a.guid_prefix(), b.guid_prefix());
        assert_eq!(a.guid().entity_id, ENTITYID_PARTICIPANT);
    }

    #[test]
    fn test_topic_type_conflict() {
        let participant = Participant::new("topics");
        let t1 = participant.create_topic("sensors", "Temp", None).expect("topic");
        let t2 = participant.create_topic("sensors", "Temp", None).expect("topic");
        assert!(Arc::ptr_eq(&t1, &t2));
        assert!(matches!(
            participant.create_topic("sensors", "Pressure", None),
            Err(Error::PreconditionNotMet(_))
        ));
        assert!(matches!(
            participant.create_topic("", "Temp", None),
            Err(Error::BadParameter(_))
        ));
    }

    #[test]
    fn test_entity_key_exhaustion() {
        let participant = Participant::new("keys");
        participant.set_next_entity_key(MAX_ENTITY_KEY);
        assert_eq!(participant.allocate_entity_key(), Ok(MAX_ENTITY_KEY));
        assert!(matches!(
            participant.allocate_entity_key(),
            Err(Error::OutOfResources(_))
        ));
    }

    #[test]
    fn test_delete_subscriber_requires_empty() {
        let participant = Participant::new("subs");
        let topic = participant.create_topic("t", "T", None).expect("topic");
        let subscriber = participant
            .create_subscriber(None, None, StatusMask::NONE)
            .expect("subscriber");
        let reader = subscriber
            .create_datareader(&topic, None, None, StatusMask::NONE)
            .expect("reader");

        assert!(participant.delete_subscriber(&subscriber).is_err());
        subscriber.delete_datareader(&reader).expect("delete");
        assert!(participant.delete_subscriber(&subscriber).is_ok());
        assert!(participant.delete_subscriber(&subscriber).is_err());
    }
}
