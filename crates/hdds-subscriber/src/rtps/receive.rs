// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Receive pump: decouples the transport thread from admission.
//!
//! The transport side calls [`ReceivePump::submit`] (never blocks); a worker
//! thread drains the bounded queue into a [`ChangeSink`], typically a
//! `SubscriberImpl` or a single `RtpsReader`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};

use super::reader::RtpsReader;
use crate::config::RuntimeConfig;
use crate::core::CacheChange;
use crate::dds::{Error, Result};

/// Destination of received changes.
pub trait ChangeSink: Send + Sync {
    /// Deliver one change; `true` if some reader admitted it.
    fn deliver(&self, change: CacheChange) -> bool;
}

impl ChangeSink for RtpsReader {
    fn deliver(&self, change: CacheChange) -> bool {
        self.on_new_cache_change_added(change)
    }
}

/// Pump counters.
#[derive(Debug, Default)]
pub struct PumpMetrics {
    admitted: AtomicU64,
    rejected: AtomicU64,
    dropped: AtomicU64,
}

impl PumpMetrics {
    /// Changes admitted by the sink.
    pub fn admitted(&self) -> u64 {
        self.admitted.load(Ordering::Relaxed)
    }

    /// Changes delivered but not admitted (QoS rejection or no reader).
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Changes refused because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Worker thread feeding a [`ChangeSink`].
pub struct ReceivePump {
    sender: Option<Sender<CacheChange>>,
    handle: Option<JoinHandle<()>>,
    metrics: Arc<PumpMetrics>,
}

impl ReceivePump {
    /// Spawn with the queue depth from [`RuntimeConfig`].
    pub fn spawn(sink: Arc<dyn ChangeSink>) -> Result<Self> {
        Self::with_capacity(sink, RuntimeConfig::global().receive_queue_depth)
    }

    pub fn with_capacity(sink: Arc<dyn ChangeSink>, capacity: usize) -> Result<Self> {
        let (sender, receiver) = channel::bounded(capacity.max(1));
        let metrics = Arc::new(PumpMetrics::default());
        let metrics_clone = Arc::clone(&metrics);

        let handle = thread::Builder::new()
            .name("hdds-receive".to_string())
            .spawn(move || Self::run_loop(receiver, sink, metrics_clone))
            .map_err(|e| Error::Internal(format!("failed to spawn receive pump: {}", e)))?;

        log::debug!("[ReceivePump] Started (capacity={})", capacity.max(1));
        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
            metrics,
        })
    }

    fn run_loop(receiver: Receiver<CacheChange>, sink: Arc<dyn ChangeSink>, metrics: Arc<PumpMetrics>) {
        // Ends once every sender is dropped and the queue is empty.
        for change in receiver.iter() {
            if sink.deliver(change) {
                metrics.admitted.fetch_add(1, Ordering::Relaxed);
            } else {
                metrics.rejected.fetch_add(1, Ordering::Relaxed);
            }
        }
        log::debug!("[ReceivePump] Worker exiting");
    }

    /// Queue a change without blocking.
    ///
    /// # Errors
    ///
    /// `OutOfResources` if the queue is full, `PreconditionNotMet` after
    /// [`shutdown`](Self::shutdown).
    pub fn submit(&self, change: CacheChange) -> Result<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| Error::PreconditionNotMet("receive pump stopped".to_string()))?;
        match sender.try_send(change) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(change)) => {
                self.metrics.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "[ReceivePump] Queue full, dropping seq={} from {}",
                    change.sequence_number(),
                    change.writer_guid()
                );
                Err(Error::OutOfResources("receive queue full".to_string()))
            }
            Err(TrySendError::Disconnected(_)) => Err(Error::PreconditionNotMet(
                "receive pump worker gone".to_string(),
            )),
        }
    }

    /// Changes waiting in the queue.
    pub fn queued(&self) -> usize {
        self.sender.as_ref().map_or(0, Sender::len)
    }

    pub fn metrics(&self) -> &PumpMetrics {
        &self.metrics
    }

    /// Stop accepting changes, deliver what is queued, join the worker.
    pub fn shutdown(&mut self) {
        if self.sender.take().is_none() {
            return;
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("[ReceivePump] Worker panicked");
            }
        }
        log::debug!(
            "[ReceivePump] Stopped (admitted={}, rejected={}, dropped={})",
            self.metrics.admitted(),
            self.metrics.rejected(),
            self.metrics.dropped()
        );
    }
}

impl Drop for ReceivePump {
    fn drop(&mut self) {
        self.shutdown();
    }
}
