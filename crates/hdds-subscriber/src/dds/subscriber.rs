// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DDS Subscriber entity - creates, owns and routes to DataReaders
//!
//! # Registry
//!
//! ```text
//! readers: Mutex<BTreeMap<topic name, Vec<ReaderHandle>>>
//!   "sensors" -> [reader A, reader B]     (several readers per topic allowed)
//!   "alarms"  -> [reader C]
//! ```
//!
//! Every registry operation holds the lock for its whole duration. Listener
//! callbacks and sample delivery run after the lock is released, so
//! application code may re-enter the subscriber.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use arc_swap::{ArcSwap, ArcSwapOption};
use parking_lot::{Mutex, RwLock};

use super::data_reader::{DataReaderImpl, ReaderHandle};
use super::listener::{DataReaderListener, SubscriberListener};
use super::participant::Participant;
use super::qos::{DataReaderQos, SubscriberQos, TopicQos};
use super::status::StatusMask;
use super::topic::Topic;
use super::{Error, Result};
use crate::core::{CacheChange, InstanceHandle, GUID};
use crate::qos::Durability;
use crate::rtps::ChangeSink;

/// Entity kind of a user-defined reader group.
const ENTITY_KIND_READER_GROUP: u8 = 0x09;

struct ListenerEntry {
    listener: Arc<dyn SubscriberListener>,
    mask: StatusMask,
}

/// DDS Subscriber.
///
/// Exclusively owns its DataReaders from `create_datareader` until
/// `delete_datareader` or `delete_contained_entities`.
pub struct SubscriberImpl {
    guid: GUID,
    participant: Weak<Participant>,
    participant_prefix: [u8; 12],
    self_ref: Weak<SubscriberImpl>,
    qos: RwLock<SubscriberQos>,
    listener: ArcSwapOption<ListenerEntry>,
    readers: Mutex<BTreeMap<String, Vec<ReaderHandle>>>,
    default_reader_qos: ArcSwap<DataReaderQos>,
    enabled: AtomicBool,
}

impl SubscriberImpl {
    pub(crate) fn new(
        participant: &Arc<Participant>,
        key: u32,
        qos: SubscriberQos,
        listener: Option<Arc<dyn SubscriberListener>>,
        mask: StatusMask,
    ) -> Arc<Self> {
        let prefix = participant.guid_prefix();
        let key_bytes = key.to_be_bytes();
        let guid = GUID::new(
            prefix,
            [key_bytes[1], key_bytes[2], key_bytes[3], ENTITY_KIND_READER_GROUP],
        );
        log::debug!("[Subscriber] Created {}", guid);

        Arc::new_cyclic(|weak| Self {
            guid,
            participant: Arc::downgrade(participant),
            participant_prefix: prefix,
            self_ref: weak.clone(),
            qos: RwLock::new(qos),
            listener: ArcSwapOption::new(
                listener.map(|listener| Arc::new(ListenerEntry { listener, mask })),
            ),
            readers: Mutex::new(BTreeMap::new()),
            default_reader_qos: ArcSwap::from_pointee(DataReaderQos::default()),
            enabled: AtomicBool::new(false),
        })
    }

    pub fn guid(&self) -> GUID {
        self.guid
    }

    pub fn instance_handle(&self) -> InstanceHandle {
        InstanceHandle::new(self.guid.as_bytes())
    }

    // ------------------------------------------------------------------
    // Reader lifecycle
    // ------------------------------------------------------------------

    /// Create a DataReader on `topic`.
    ///
    /// `qos = None` copies the current default reader QoS. The reader is
    /// enabled at once if this subscriber is enabled and its entity-factory
    /// policy auto-enables; otherwise it waits for
    /// [`autoenable_entities`](Self::autoenable_entities).
    ///
    /// # Errors
    ///
    /// - `BadParameter`: inconsistent QoS
    /// - `Unsupported`: PERSISTENT durability
    /// - `PreconditionNotMet`: topic from another participant
    /// - `OutOfResources`: entity keys exhausted
    pub fn create_datareader(
        &self,
        topic: &Arc<Topic>,
        qos: Option<DataReaderQos>,
        listener: Option<Arc<dyn DataReaderListener>>,
        mask: StatusMask,
    ) -> Result<ReaderHandle> {
        let qos = qos.unwrap_or_else(|| DataReaderQos::clone(&self.default_reader_qos.load()));
        qos.validate()?;
        if qos.durability == Durability::Persistent {
            return Err(Error::Unsupported("PERSISTENT durability".to_string()));
        }
        if topic.participant_prefix() != self.participant_prefix {
            return Err(Error::PreconditionNotMet(format!(
                "topic '{}' belongs to another participant",
                topic.name()
            )));
        }

        let participant = self.participant()?;
        let key = participant.allocate_entity_key()?;
        let guid = GUID::reader(self.participant_prefix, key, topic.is_keyed())
            .ok_or_else(|| Error::OutOfResources("entity keys exhausted".to_string()))?;

        let reader = DataReaderImpl::new(
            guid,
            Arc::clone(topic),
            qos,
            self.self_ref.clone(),
            listener,
            mask,
        );
        // Enabled before it becomes visible to delete_contained_entities
        if self.is_enabled() && self.qos.read().entity_factory.is_auto_enable() {
            reader.enable()?;
        }

        self.readers
            .lock()
            .entry(topic.name().to_string())
            .or_default()
            .push(Arc::clone(&reader));
        log::info!("[Subscriber] Created reader {} on '{}'", guid, topic.name());
        Ok(reader)
    }

    /// Delete one reader owned by this subscriber.
    ///
    /// # Errors
    ///
    /// - `AlreadyDeleted`: the reader was deleted before
    /// - `PreconditionNotMet`: not owned here, or a listener callback is
    ///   running on it (nothing is changed)
    pub fn delete_datareader(&self, reader: &ReaderHandle) -> Result<()> {
        if !reader.belongs_to(self) {
            return Err(Error::PreconditionNotMet(
                "reader not owned by this subscriber".to_string(),
            ));
        }

        let mut readers = self.readers.lock();
        let topic = reader.topic_name();
        let pos = readers
            .get(topic)
            .and_then(|list| list.iter().position(|r| Arc::ptr_eq(r, reader)));
        let Some(pos) = pos else {
            return Err(if reader.is_deleted() {
                Error::AlreadyDeleted
            } else {
                Error::PreconditionNotMet("reader not registered".to_string())
            });
        };
        if reader.has_pending_callbacks() {
            return Err(Error::PreconditionNotMet(
                "reader has listener callbacks in progress".to_string(),
            ));
        }

        reader.retire();
        if let Some(list) = readers.get_mut(topic) {
            list.remove(pos);
            if list.is_empty() {
                readers.remove(topic);
            }
        }
        Ok(())
    }

    /// First registered reader for `topic_name`.
    pub fn lookup_datareader(&self, topic_name: &str) -> Option<ReaderHandle> {
        self.readers
            .lock()
            .get(topic_name)
            .and_then(|list| list.first().cloned())
    }

    /// Append every registered reader to `out` (registry order).
    pub fn get_datareaders(&self, out: &mut Vec<ReaderHandle>) -> Result<()> {
        let readers = self.readers.lock();
        out.extend(readers.values().flatten().cloned());
        Ok(())
    }

    pub fn has_datareaders(&self) -> bool {
        !self.readers.lock().is_empty()
    }

    /// Raise DATA_AVAILABLE once on every reader holding unread samples.
    pub fn notify_datareaders(&self) -> Result<()> {
        for reader in self.snapshot() {
            if reader.unread_count() > 0 {
                reader.notify_data_available();
            }
        }
        Ok(())
    }

    /// Disable and remove every reader. Idempotent.
    ///
    /// # Errors
    ///
    /// `PreconditionNotMet` if a listener callback is running on any reader
    /// (nothing is changed).
    pub fn delete_contained_entities(&self) -> Result<()> {
        let mut readers = self.readers.lock();
        if readers.values().flatten().any(|r| r.has_pending_callbacks()) {
            return Err(Error::PreconditionNotMet(
                "a reader has listener callbacks in progress".to_string(),
            ));
        }
        let removed = std::mem::take(&mut *readers);
        let count: usize = removed.values().map(Vec::len).sum();
        for reader in removed.values().flatten() {
            reader.retire();
        }
        if count > 0 {
            log::info!("[Subscriber] {} deleted {} readers", self.guid, count);
        }
        Ok(())
    }

    /// `true` if a reader with this instance handle is registered.
    pub fn contains_entity(&self, handle: InstanceHandle) -> bool {
        self.readers
            .lock()
            .values()
            .flatten()
            .any(|r| r.instance_handle() == handle)
    }

    /// `true` if any registered reader's topic has this type.
    pub fn type_in_use(&self, type_name: &str) -> bool {
        self.readers
            .lock()
            .values()
            .flatten()
            .any(|r| r.topic().type_name() == type_name)
    }

    // ------------------------------------------------------------------
    // QoS
    // ------------------------------------------------------------------

    pub fn get_qos(&self) -> SubscriberQos {
        self.qos.read().clone()
    }

    /// # Errors
    ///
    /// `ImmutablePolicy` when changing ENTITY_FACTORY or PRESENTATION while
    /// readers exist, or PRESENTATION once enabled.
    pub fn set_qos(&self, qos: SubscriberQos) -> Result<()> {
        let mut current = self.qos.write();
        let has_readers = self.has_datareaders();
        if has_readers && current.entity_factory != qos.entity_factory {
            return Err(Error::ImmutablePolicy("entity_factory".to_string()));
        }
        if current.presentation != qos.presentation && (has_readers || self.is_enabled()) {
            return Err(Error::ImmutablePolicy("presentation".to_string()));
        }
        *current = qos;
        Ok(())
    }

    /// Set the QoS copied into readers created without explicit QoS.
    pub fn set_default_datareader_qos(&self, qos: DataReaderQos) -> Result<()> {
        qos.validate()?;
        self.default_reader_qos.store(Arc::new(qos));
        Ok(())
    }

    /// Restore the factory default reader QoS.
    pub fn reset_default_datareader_qos(&self) {
        self.default_reader_qos
            .store(Arc::new(DataReaderQos::default()));
    }

    pub fn get_default_datareader_qos(&self) -> DataReaderQos {
        DataReaderQos::clone(&self.default_reader_qos.load())
    }

    /// Copy the reader-relevant policies of `topic_qos` into `reader_qos`.
    pub fn copy_from_topic_qos(&self, reader_qos: &mut DataReaderQos, topic_qos: &TopicQos) {
        reader_qos.durability = topic_qos.durability;
        reader_qos.reliability = topic_qos.reliability;
        reader_qos.history = topic_qos.history;
        reader_qos.resource_limits = topic_qos.resource_limits;
        reader_qos.ownership = topic_qos.ownership;
        reader_qos.lifespan = topic_qos.lifespan;
    }

    // ------------------------------------------------------------------
    // Listener and lifecycle
    // ------------------------------------------------------------------

    pub fn set_listener(&self, listener: Option<Arc<dyn SubscriberListener>>, mask: StatusMask) {
        self.listener
            .store(listener.map(|listener| Arc::new(ListenerEntry { listener, mask })));
    }

    pub fn get_listener(&self) -> Option<Arc<dyn SubscriberListener>> {
        self.listener
            .load_full()
            .map(|entry| Arc::clone(&entry.listener))
    }

    pub(crate) fn listener_for(&self, status: StatusMask) -> Option<Arc<dyn SubscriberListener>> {
        self.listener
            .load_full()
            .filter(|entry| entry.mask.contains(status))
            .map(|entry| Arc::clone(&entry.listener))
    }

    pub fn get_participant(&self) -> Option<Arc<Participant>> {
        self.participant.upgrade()
    }

    fn participant(&self) -> Result<Arc<Participant>> {
        self.participant
            .upgrade()
            .ok_or_else(|| Error::PreconditionNotMet("participant was dropped".to_string()))
    }

    /// Enable the subscriber, and its readers if ENTITY_FACTORY auto-enables.
    ///
    /// # Errors
    ///
    /// `PreconditionNotMet` if the participant is not enabled.
    pub fn enable(&self) -> Result<()> {
        if !self.participant()?.is_enabled() {
            return Err(Error::PreconditionNotMet(
                "participant is not enabled".to_string(),
            ));
        }
        if self.enabled.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        log::debug!("[Subscriber] Enabled {}", self.guid);
        if self.qos.read().entity_factory.is_auto_enable() {
            self.autoenable_entities()?;
        }
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Enable every reader not enabled yet.
    pub fn autoenable_entities(&self) -> Result<()> {
        for reader in self.snapshot() {
            if !reader.is_enabled() {
                reader.enable()?;
            }
        }
        Ok(())
    }

    /// Clear every listener in the hierarchy so teardown is silent.
    pub fn disable(&self) {
        self.listener.store(None);
        for reader in self.snapshot() {
            reader.clear_listener();
        }
        log::debug!("[Subscriber] Disabled listeners of {}", self.guid);
    }

    // ------------------------------------------------------------------
    // Routing
    // ------------------------------------------------------------------

    /// Route a received change to every reader matched with its writer.
    ///
    /// Returns `true` if at least one reader admitted it, `false` if none
    /// did or no reader is matched (the change is dropped).
    pub fn on_new_cache_change_added(&self, change: &CacheChange) -> bool {
        let writer = change.writer_guid();
        let targets: Vec<ReaderHandle> = self
            .readers
            .lock()
            .values()
            .flatten()
            .filter(|r| r.is_matched_writer(writer))
            .cloned()
            .collect();

        if targets.is_empty() {
            log::trace!(
                "[Subscriber] No reader for seq={} from {}",
                change.sequence_number(),
                writer
            );
            return false;
        }

        let mut admitted = false;
        for reader in targets {
            admitted |= reader.deliver(change.clone());
        }
        admitted
    }

    fn snapshot(&self) -> Vec<ReaderHandle> {
        self.readers.lock().values().flatten().cloned().collect()
    }
}

impl ChangeSink for SubscriberImpl {
    fn deliver(&self, change: CacheChange) -> bool {
        self.on_new_cache_change_added(&change)
    }
}

impl std::fmt::Debug for SubscriberImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberImpl")
            .field("guid", &self.guid)
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_ENTITY_KEY;
    use crate::qos::{EntityFactory, Presentation};

    fn setup() -> (Arc<Participant>, Arc<Topic>, Arc<SubscriberImpl>) {
        let participant = Participant::new("unit");
        let topic = participant.create_topic("t", "T", None).expect("topic");
        let subscriber = participant
            .create_subscriber(None, None, StatusMask::NONE)
            .expect("subscriber");
        (participant, topic, subscriber)
    }

    #[test]
    fn test_entity_key_exhaustion_leaves_registry_unchanged() {
        let (participant, topic, subscriber) = setup();
        participant.set_next_entity_key(MAX_ENTITY_KEY + 1);

        assert!(matches!(
            subscriber.create_datareader(&topic, None, None, StatusMask::NONE),
            Err(Error::OutOfResources(_))
        ));
        assert!(!subscriber.has_datareaders());
    }

    #[test]
    fn test_persistent_durability_unsupported() {
        let (_participant, topic, subscriber) = setup();
        let qos = DataReaderQos::default().durability(Durability::Persistent);
        assert!(matches!(
            subscriber.create_datareader(&topic, Some(qos), None, StatusMask::NONE),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn test_set_qos_immutable_with_readers() {
        let (_participant, topic, subscriber) = setup();
        let manual = SubscriberQos {
            entity_factory: EntityFactory::manual_enable(),
            ..SubscriberQos::default()
        };
        assert!(subscriber.set_qos(manual.clone()).is_ok());

        let _reader = subscriber
            .create_datareader(&topic, None, None, StatusMask::NONE)
            .expect("reader");
        assert!(matches!(
            subscriber.set_qos(SubscriberQos::default()),
            Err(Error::ImmutablePolicy(_))
        ));
        let group = SubscriberQos {
            presentation: Presentation::group(),
            ..manual.clone()
        };
        assert!(matches!(
            subscriber.set_qos(group),
            Err(Error::ImmutablePolicy(_))
        ));
        assert_eq!(subscriber.get_qos(), manual);
    }

    #[test]
    fn test_reader_guid_under_participant_prefix() {
        let (participant, topic, subscriber) = setup();
        let reader = subscriber
            .create_datareader(&topic, None, None, StatusMask::NONE)
            .expect("reader");
        assert_eq!(reader.guid().prefix, participant.guid_prefix());
        assert_eq!(reader.guid().entity_kind(), crate::config::ENTITY_KIND_READER_WITH_KEY);
        assert!(subscriber.contains_entity(reader.instance_handle()));
        assert!(!subscriber.contains_entity(subscriber.instance_handle()));
    }
}
