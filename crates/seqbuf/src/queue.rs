// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Paced delivery queue.
//!
//! Messages are queued with a pause and delivered one at a time by a tokio
//! worker. After delivering a message the worker holds off the next one
//! until that message's pause has elapsed, so bursts leave the queue at the
//! pace the producer asked for.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::buffer::SequentialBuffer;

/// Queue depth before `enqueue` waits for the worker.
pub const QUEUE_CAPACITY: usize = 128;

/// Destination for delivered messages.
///
/// Object-safe for use as `Arc<dyn Sink<M>>`.
pub trait Sink<M>: Send + Sync + 'static {
    fn deliver(&self, message: M) -> anyhow::Result<()>;
}

impl<T: Clone + Send + Sync + 'static> Sink<T> for SequentialBuffer<T> {
    fn deliver(&self, message: T) -> anyhow::Result<()> {
        self.append(message)?;
        Ok(())
    }
}

/// Worker activity, published on a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    /// Idle, waiting for messages.
    Waiting,
    /// Delivering a run of queued messages.
    Busy,
}

/// Delivery totals returned when the queue stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueReport {
    pub delivered: u64,
    pub failed: u64,
}

struct Paced<M> {
    message: M,
    pause: Duration,
}

#[derive(Default)]
struct Counters {
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn report(&self) -> QueueReport {
        QueueReport {
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

pub struct PacedQueue<M> {
    tx: mpsc::Sender<Paced<M>>,
    status_rx: watch::Receiver<QueueStatus>,
    counters: Arc<Counters>,
    shutdown: CancellationToken,
    worker: JoinHandle<()>,
}

impl<M: Send + 'static> PacedQueue<M> {
    /// Start the worker on the current tokio runtime.
    pub fn spawn(sink: Arc<dyn Sink<M>>) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let (status_tx, status_rx) = watch::channel(QueueStatus::Waiting);
        let counters = Arc::new(Counters::default());
        let shutdown = CancellationToken::new();
        let worker = tokio::spawn(run_worker(
            rx,
            sink,
            status_tx,
            Arc::clone(&counters),
            shutdown.clone(),
        ));
        Self { tx, status_rx, counters, shutdown, worker }
    }

    /// Queue `message`; the next message waits at least `pause` after it.
    pub async fn enqueue(&self, message: M, pause: Duration) -> anyhow::Result<()> {
        self.tx
            .send(Paced { message, pause })
            .await
            .map_err(|_| anyhow::anyhow!("paced queue is shut down"))
    }

    pub fn status(&self) -> QueueStatus {
        *self.status_rx.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<QueueStatus> {
        self.status_rx.clone()
    }

    /// Totals so far.
    pub fn report(&self) -> QueueReport {
        self.counters.report()
    }

    /// Stop accepting messages, deliver everything already queued, then stop.
    pub async fn close(self) -> anyhow::Result<QueueReport> {
        drop(self.tx);
        self.worker.await?;
        Ok(self.counters.report())
    }

    /// Stop now; queued messages that have not been delivered are dropped.
    pub async fn shutdown(self) -> anyhow::Result<QueueReport> {
        self.shutdown.cancel();
        drop(self.tx);
        self.worker.await?;
        Ok(self.counters.report())
    }
}

async fn run_worker<M: Send + 'static>(
    mut rx: mpsc::Receiver<Paced<M>>,
    sink: Arc<dyn Sink<M>>,
    status_tx: watch::Sender<QueueStatus>,
    counters: Arc<Counters>,
    shutdown: CancellationToken,
) {
    let mut not_before: Option<Instant> = None;
    loop {
        let _ = status_tx.send(QueueStatus::Waiting);
        let first = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = rx.recv() => match next {
                Some(paced) => paced,
                None => break,
            },
        };
        let _ = status_tx.send(QueueStatus::Busy);

        let mut pending = Some(first);
        while let Some(paced) = pending.take() {
            if let Some(deadline) = not_before {
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            match sink.deliver(paced.message) {
                Ok(()) => {
                    counters.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    warn!("paced delivery failed: {e:#}");
                }
            }
            not_before = Some(Instant::now() + paced.pause);
            if shutdown.is_cancelled() {
                return;
            }
            pending = rx.try_recv().ok();
        }
    }
    let report = counters.report();
    debug!(delivered = report.delivered, failed = report.failed, "paced queue stopped");
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
