// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # HDDS Subscriber - reader history cache and subscriber registry
//!
//! The subscription side of HDDS: where received RTPS samples are admitted
//! or rejected under QoS, where the receive thread and application threads
//! meet, and where a subscriber routes each admitted change to its readers.
//!
//! ## Quick Start
//!
//! ```rust
//! use hdds_subscriber::core::{CacheChange, ChangeKind, InstanceHandle, GUID};
//! use hdds_subscriber::dds::{DataReaderQos, Participant, StatusMask, WriterMatch};
//!
//! let participant = Participant::new("app");
//! let topic = participant.create_topic("sensors", "Temperature", None)?;
//! let subscriber = participant.create_subscriber(None, None, StatusMask::NONE)?;
//! participant.enable()?;
//!
//! let qos = DataReaderQos::reliable().keep_last(2);
//! let reader = subscriber.create_datareader(&topic, Some(qos), None, StatusMask::NONE)?;
//!
//! let writer = GUID::new([9; 12], [0, 0, 1, 0x02]);
//! reader.matched_writer_add(WriterMatch::new(writer))?;
//!
//! let change = CacheChange::new(writer, 1, InstanceHandle::from(1u64), ChangeKind::Alive, vec![42u8]);
//! assert!(subscriber.on_new_cache_change_added(&change));
//!
//! let sample = reader.take_next_sample()?.expect("admitted sample");
//! assert_eq!(sample.payload(), &[42]);
//! # Ok::<(), hdds_subscriber::Error>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                           DDS Layer                                 |
//! |   Participant -> SubscriberImpl -> DataReaderImpl | Listeners      |
//! +---------------------------------------------------------------------+
//! |                          RTPS Layer                                 |
//! |   RtpsReader (stateless/stateful) | WriterProxy | HistoryCache     |
//! +---------------------------------------------------------------------+
//! |                      Receive path (external)                        |
//! |   transport -> ReceivePump -> SubscriberImpl::on_new_cache_change   |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`dds`] - Subscriber, DataReader, listeners (start here)
//! - [`rtps`] - Protocol reader and history cache
//! - [`qos`] - Quality of Service policies
//! - [`core`] - GUIDs, instance handles, cache changes
//! - [`config`] - Constants and runtime configuration

/// Constants and environment-driven runtime configuration.
pub mod config;
/// GUIDs, instance handles and cache changes.
pub mod core;
/// Subscription entities (Participant, SubscriberImpl, DataReaderImpl).
pub mod dds;
/// QoS policies consumed by the reader.
pub mod qos;
/// Protocol reader, writer proxies and history cache.
pub mod rtps;

pub use crate::core::{CacheChange, ChangeKind, InstanceHandle, SampleState, ViewState, GUID};
pub use dds::{
    DataReaderImpl, DataReaderListener, DataReaderQos, Error, Participant, ReaderHandle, Result,
    ReturnCode, StatusMask, SubscriberImpl, SubscriberListener, SubscriberQos, Topic,
};
pub use rtps::{Admission, HistoryCache, RejectReason, RtpsReader};
