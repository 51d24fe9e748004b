//! Rate-limited snapshot dispatch.
//!
//! A bounded queue feeds a background sender thread that enforces a minimum
//! interval between deliveries to an opaque sink. The queue favors freshness
//! over completeness: offers are non-blocking and excess jobs are dropped,
//! since an unhealthy condition is re-announced on later transitions anyway.

use crate::cancel::CancellationToken;
use crate::notify::NotifyError;
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How long the sender blocks on an empty queue before re-checking the stop
/// flag. Bounds shutdown latency.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Delivery target for snapshot jobs.
pub trait SnapshotSink: Send {
    fn send(&mut self, payload: &[u8], caption: &str) -> Result<(), NotifyError>;
}

/// One queued snapshot. Held only until sent or dropped.
#[derive(Debug)]
pub struct DispatchJob {
    pub payload: Vec<u8>,
    pub caption: String,
    pub enqueued_at: Instant,
}

/// Producer side of the dispatcher: cheap to clone, non-blocking.
#[derive(Clone)]
pub struct DispatchQueue {
    tx: SyncSender<DispatchJob>,
}

impl DispatchQueue {
    /// Offer a job. Returns false (and drops the job) when the queue is full
    /// or the sender has shut down.
    pub fn offer(&self, payload: Vec<u8>, caption: String) -> bool {
        let job = DispatchJob {
            payload,
            caption,
            enqueued_at: Instant::now(),
        };
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("snapshot queue full, dropping job");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Join-based control handle for the sender thread.
pub struct DispatcherHandle {
    cancel: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl DispatcherHandle {
    /// Token observed by the sender loop; lets an embedder signal stop before
    /// joining.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the sender and wait for it to exit. Queued jobs are discarded,
    /// not flushed.
    pub fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.join.take() {
            let _ = handle.join();
        }
    }
}

/// Background sender enforcing a minimum interval between deliveries.
pub struct Dispatcher;

impl Dispatcher {
    /// Spawn the sender thread. Returns the producer queue and the control
    /// handle.
    pub fn spawn<S: SnapshotSink + 'static>(
        sink: S,
        cooldown: Duration,
        capacity: usize,
    ) -> std::io::Result<(DispatchQueue, DispatcherHandle)> {
        let (tx, rx) = mpsc::sync_channel(capacity);
        let cancel = CancellationToken::new();
        let thread_cancel = cancel.clone();

        let join = thread::Builder::new()
            .name("cropwatch-dispatch".into())
            .spawn(move || run_sender(sink, cooldown, rx, thread_cancel))?;

        info!(?cooldown, capacity, "snapshot dispatcher started");
        Ok((
            DispatchQueue { tx },
            DispatcherHandle {
                cancel,
                join: Some(join),
            },
        ))
    }
}

fn run_sender<S: SnapshotSink>(
    mut sink: S,
    cooldown: Duration,
    rx: mpsc::Receiver<DispatchJob>,
    cancel: CancellationToken,
) {
    let mut last_send: Option<Instant> = None;

    while !cancel.is_cancelled() {
        let job = match rx.recv_timeout(POLL_INTERVAL) {
            Ok(job) => job,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        if !sleep_out_cooldown(last_send, cooldown, &cancel) {
            break;
        }

        debug!(
            caption_len = job.caption.len(),
            queued_for_ms = job.enqueued_at.elapsed().as_millis() as u64,
            "sending snapshot"
        );
        if let Err(err) = sink.send(&job.payload, &job.caption) {
            // One attempt only; the next transition re-announces anyway.
            warn!(error = %err, "snapshot send failed");
        }
        // Stamped on success AND failure so a broken transport cannot turn
        // into a retry storm.
        last_send = Some(Instant::now());
    }

    debug!("snapshot dispatcher exiting");
}

/// Sleep until the cooldown since the previous send has elapsed, in short
/// slices so a stop request stays responsive. Returns false when cancelled.
fn sleep_out_cooldown(
    last_send: Option<Instant>,
    cooldown: Duration,
    cancel: &CancellationToken,
) -> bool {
    let Some(prev) = last_send else { return true };
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let elapsed = prev.elapsed();
        if elapsed >= cooldown {
            return true;
        }
        thread::sleep((cooldown - elapsed).min(POLL_INTERVAL));
    }
}
