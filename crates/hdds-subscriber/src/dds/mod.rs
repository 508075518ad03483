// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # DDS subscription entities
//!
//! Application-facing layer over the RTPS reader:
//!
//! - **Participant**: identity (GUID prefix), topic factory, subscriber factory
//! - **Topic**: named data channel with a type name
//! - **SubscriberImpl**: owns DataReaders keyed by topic, routes received changes
//! - **DataReaderImpl**: untyped reader over one [`RtpsReader`](crate::rtps::RtpsReader)
//!
//! ## Entity Hierarchy
//!
//! ```text
//! Participant
//! +-- Topic
//! +-- SubscriberImpl
//!     +-- DataReaderImpl  <------ Topic
//!         +-- RtpsReader
//!             +-- HistoryCache
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use hdds_subscriber::dds::{Participant, StatusMask};
//!
//! let participant = Participant::new("demo");
//! let topic = participant.create_topic("sensors", "SensorData", None)?;
//! let subscriber = participant.create_subscriber(None, None, StatusMask::NONE)?;
//! let reader = subscriber.create_datareader(&topic, None, None, StatusMask::NONE)?;
//! assert!(subscriber.lookup_datareader("sensors").is_some());
//! subscriber.delete_datareader(&reader)?;
//! # Ok::<(), hdds_subscriber::Error>(())
//! ```

mod data_reader;
/// Listener traits for callback-based notifications.
pub mod listener;
mod participant;
/// QoS bundles for subscription entities.
pub mod qos;
/// Communication status types and masks.
pub mod status;
mod subscriber;
mod topic;

pub use data_reader::{DataReaderImpl, ReaderHandle, WriterMatch};
pub use listener::{DataReaderListener, SubscriberListener};
pub use participant::Participant;
pub use qos::{DataReaderQos, SubscriberQos, TopicQos};
pub use status::{
    SampleLostStatus, SampleRejectedReason, SampleRejectedStatus, StatusMask,
    SubscriptionMatchedStatus,
};
pub use subscriber::SubscriberImpl;
pub use topic::Topic;

/// Errors returned by subscription operations.
///
/// QoS admission outcomes are never errors; see
/// [`Admission`](crate::rtps::Admission).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Unclassified internal failure.
    Internal(String),
    /// Malformed QoS or handle.
    BadParameter(String),
    /// Operation invalid given current entity state or ownership.
    PreconditionNotMet(String),
    /// A cache, registry or queue is at capacity.
    OutOfResources(String),
    /// Attempted change of a QoS policy that can no longer change.
    ImmutablePolicy(String),
    /// The entity was already deleted.
    AlreadyDeleted,
    /// Requested feature is not supported.
    Unsupported(String),
    /// The entity is not enabled yet.
    NotEnabled,
}

impl Error {
    /// Result code for this error.
    pub fn return_code(&self) -> ReturnCode {
        match self {
            Error::Internal(_) => ReturnCode::Error,
            Error::BadParameter(_) => ReturnCode::BadParameter,
            Error::PreconditionNotMet(_) => ReturnCode::PreconditionNotMet,
            Error::OutOfResources(_) => ReturnCode::OutOfResources,
            Error::ImmutablePolicy(_) => ReturnCode::ImmutablePolicy,
            Error::AlreadyDeleted => ReturnCode::AlreadyDeleted,
            Error::Unsupported(_) => ReturnCode::Unsupported,
            Error::NotEnabled => ReturnCode::NotEnabled,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
            Error::BadParameter(msg) => write!(f, "Bad parameter: {}", msg),
            Error::PreconditionNotMet(msg) => write!(f, "Precondition not met: {}", msg),
            Error::OutOfResources(msg) => write!(f, "Out of resources: {}", msg),
            Error::ImmutablePolicy(msg) => write!(f, "Immutable policy: {}", msg),
            Error::AlreadyDeleted => write!(f, "Entity already deleted"),
            Error::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            Error::NotEnabled => write!(f, "Entity not enabled"),
        }
    }
}

impl std::error::Error for Error {}

/// Convenient alias for API results using the public `Error` type.
pub type Result<T> = core::result::Result<T, Error>;

/// DDS result codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnCode {
    Ok,
    Error,
    BadParameter,
    PreconditionNotMet,
    OutOfResources,
    ImmutablePolicy,
    AlreadyDeleted,
    Unsupported,
    NotEnabled,
}

impl ReturnCode {
    /// `Ok` for success, the error's code otherwise.
    pub fn from_result<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => ReturnCode::Ok,
            Err(e) => e.return_code(),
        }
    }

    /// Upper-case name as used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnCode::Ok => "OK",
            ReturnCode::Error => "ERROR",
            ReturnCode::BadParameter => "BAD_PARAMETER",
            ReturnCode::PreconditionNotMet => "PRECONDITION_NOT_MET",
            ReturnCode::OutOfResources => "OUT_OF_RESOURCES",
            ReturnCode::ImmutablePolicy => "IMMUTABLE_POLICY",
            ReturnCode::AlreadyDeleted => "ALREADY_DELETED",
            ReturnCode::Unsupported => "UNSUPPORTED",
            ReturnCode::NotEnabled => "NOT_ENABLED",
        }
    }
}

impl std::fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
