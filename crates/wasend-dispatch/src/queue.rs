// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch admission queue.
//!
//! Submissions are validated up front and pushed onto a bounded channel
//! drained by a single worker, so batches run one after another. A full
//! channel is reported to the caller instead of blocking the request.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use wasend_core::types::validate_batch;
use wasend_core::{SendRequest, WasendError};

use crate::dispatcher::BatchDispatcher;
use crate::webhook::WebhookReporter;

struct QueuedBatch {
    batch_id: Uuid,
    requests: Vec<SendRequest>,
}

/// Handle for submitting batches to the dispatch worker.
#[derive(Clone)]
pub struct BatchQueue {
    tx: mpsc::Sender<QueuedBatch>,
    depth: Arc<AtomicUsize>,
}

impl BatchQueue {
    /// Spawn the worker and return the submission handle.
    ///
    /// The worker stops taking new batches once `cancel` fires; a batch that
    /// is already running completes first.
    pub fn start(
        dispatcher: Arc<BatchDispatcher>,
        reporter: Arc<WebhookReporter>,
        capacity: usize,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let depth = Arc::new(AtomicUsize::new(0));
        let worker = tokio::spawn(run_worker(
            rx,
            Arc::clone(&depth),
            dispatcher,
            reporter,
            cancel,
        ));
        (Self { tx, depth }, worker)
    }

    /// Validate and enqueue a batch; returns its id.
    pub fn submit(&self, requests: Vec<SendRequest>) -> Result<Uuid, WasendError> {
        validate_batch(&requests)?;

        let batch_id = Uuid::new_v4();
        let items = requests.len();
        // Count before sending so the worker never decrements below zero.
        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        if let Err(e) = self.tx.try_send(QueuedBatch { batch_id, requests }) {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            return Err(match e {
                mpsc::error::TrySendError::Full(_) => {
                    warn!(%batch_id, items, "batch queue full, rejecting submission");
                    WasendError::Unavailable("batch queue is full".to_string())
                }
                mpsc::error::TrySendError::Closed(_) => {
                    WasendError::Unavailable("dispatcher is shutting down".to_string())
                }
            });
        }

        wasend_prometheus::set_queue_depth(depth);
        info!(%batch_id, items, depth, "batch accepted");
        Ok(batch_id)
    }

    /// Batches accepted but not yet picked up by the worker.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<QueuedBatch>,
    depth: Arc<AtomicUsize>,
    dispatcher: Arc<BatchDispatcher>,
    reporter: Arc<WebhookReporter>,
    cancel: CancellationToken,
) {
    loop {
        let batch = tokio::select! {
            _ = cancel.cancelled() => break,
            batch = rx.recv() => match batch {
                Some(batch) => batch,
                None => break,
            },
        };
        let remaining = depth.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        wasend_prometheus::set_queue_depth(remaining);

        match dispatcher.dispatch_batch(batch.batch_id, &batch.requests).await {
            Ok(ledger) => {
                let reporter = Arc::clone(&reporter);
                tokio::spawn(async move {
                    reporter.report(&ledger).await;
                });
            }
            // Submissions are validated, so this is unexpected.
            Err(e) => error!(batch_id = %batch.batch_id, error = %e, "batch rejected by dispatcher"),
        }
    }

    let dropped = depth.load(Ordering::SeqCst);
    if dropped > 0 {
        warn!(dropped, "dispatch worker stopped with batches still queued");
    }
    info!("dispatch worker stopped");
}
