// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DDS Listener Traits
//!
//! Listeners provide callback-based notification for reader and subscriber
//! events. Every method has a no-op default; implement only what you need.
//!
//! # Thread Safety
//!
//! Callbacks run on the receive thread, outside every registry and cache
//! lock, so they may call back into the reader or subscriber (including a
//! blocking read). They must be `Send + Sync` and should return quickly.
//!
//! # Dispatch
//!
//! When a change is admitted:
//! 1. the subscriber listener's `on_data_on_readers`, if its mask has `DATA_ON_READERS`
//! 2. otherwise the reader listener's `on_data_available`, if its mask has `DATA_AVAILABLE`
//! 3. otherwise the subscriber listener's `on_data_available`, if its mask has `DATA_AVAILABLE`

use super::data_reader::DataReaderImpl;
use super::status::{SampleLostStatus, SampleRejectedStatus, SubscriptionMatchedStatus};
use super::subscriber::SubscriberImpl;

/// Listener for DataReader events.
pub trait DataReaderListener: Send + Sync {
    /// New data can be read or taken from `reader`.
    fn on_data_available(&self, reader: &DataReaderImpl) {
        let _ = reader;
    }

    /// A received sample was refused by QoS policy.
    fn on_sample_rejected(&self, reader: &DataReaderImpl, status: SampleRejectedStatus) {
        let _ = (reader, status);
    }

    /// A writer was matched or unmatched.
    fn on_subscription_matched(&self, reader: &DataReaderImpl, status: SubscriptionMatchedStatus) {
        let _ = (reader, status);
    }

    /// Samples were announced irrelevant before being received.
    fn on_sample_lost(&self, reader: &DataReaderImpl, status: SampleLostStatus) {
        let _ = (reader, status);
    }
}

/// Listener for Subscriber events.
///
/// Also serves as fallback for reader events when the reader has no
/// listener for them.
pub trait SubscriberListener: DataReaderListener {
    /// Some reader of `subscriber` has new data.
    fn on_data_on_readers(&self, subscriber: &SubscriberImpl) {
        let _ = subscriber;
    }
}
