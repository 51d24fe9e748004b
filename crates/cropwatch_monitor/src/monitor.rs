//! The monitor loop and its session handle.
//!
//! One thread runs capture -> classify -> coordinate -> emit strictly in
//! sequence, one frame at a time. Stop is cooperative: a flag checked at the
//! top of each iteration, with join semantics so a caller can start a new
//! session immediately after `stop()` returns.

use crate::cancel::CancellationToken;
use crate::capture::CaptureSource;
use crate::classify::{Classification, Classifier};
use crate::coordinate::{StatusCoordinator, StatusStore};
use crate::dispatch::DispatchQueue;
use anyhow::{Context, Result};
use cropwatch_protocol::{Frame, MonitorConfig, UiStatus};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Per-frame output for the UI boundary.
#[derive(Debug)]
pub enum MonitorEvent {
    /// Annotated frame, one per processed frame.
    Frame(Frame),
    /// Coarse status, emitted only on change.
    Status(UiStatus),
}

/// The per-frame cycle, ready to run. Built by [`MonitorLoop::prepare`],
/// consumed by [`MonitorSession::spawn`].
pub struct MonitorLoop<C: Classifier, S: StatusStore> {
    capture: CaptureSource,
    classifier: C,
    coordinator: StatusCoordinator<S>,
    mirror: bool,
    read_retry_delay: Duration,
    events: Sender<MonitorEvent>,
    cancel: CancellationToken,
    last_status: Option<UiStatus>,
}

impl<C: Classifier, S: StatusStore> MonitorLoop<C, S> {
    /// Resolve everything a session needs up front: the nutrient baseline
    /// (a missing configuration row refuses the session) and the capture
    /// source (no usable camera is fatal).
    pub fn prepare(
        config: &MonitorConfig,
        store: S,
        classifier: C,
        capture: CaptureSource,
        dispatch: Option<DispatchQueue>,
    ) -> Result<(Self, Receiver<MonitorEvent>)> {
        let baseline = store
            .read_baseline(config.device_id)
            .context("loading nutrient baseline")?;
        info!(device_id = config.device_id, baseline = %baseline, "baseline loaded");
        info!(
            label = %config.unhealthy_label,
            confidence = config.confidence_threshold,
            required_hits = config.required_hits,
            recovery_window = ?config.recovery_window,
            db_cooldown = ?config.db_cooldown,
            notifications = dispatch.is_some(),
            "monitor configuration"
        );

        let coordinator = StatusCoordinator::new(config, baseline, store, dispatch);
        let (events, rx) = mpsc::channel();

        Ok((
            Self {
                capture,
                classifier,
                coordinator,
                mirror: config.camera.mirror,
                read_retry_delay: config.camera.read_retry_delay,
                events,
                cancel: CancellationToken::new(),
                last_status: None,
            },
            rx,
        ))
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run until stopped or the capture source is lost. Releases the capture
    /// handle and announces `Stopped` on the way out.
    pub fn run(mut self) -> Result<()> {
        info!(backend = self.capture.active_backend(), "monitor loop running");
        self.emit_status(UiStatus::Healthy);

        let result = self.cycle_until_stopped();

        self.capture.close();
        self.emit_status(UiStatus::Stopped);
        result
    }

    fn cycle_until_stopped(&mut self) -> Result<()> {
        loop {
            if self.cancel.is_cancelled() {
                info!("stop requested");
                return Ok(());
            }

            let frame = match self.capture.read() {
                Ok(frame) => frame,
                Err(err) if err.is_fatal() => {
                    error!(error = %err, "capture source lost, ending session");
                    return Err(err.into());
                }
                Err(_) => {
                    thread::sleep(self.read_retry_delay);
                    continue;
                }
            };

            let frame = if self.mirror { frame.mirrored() } else { frame };
            let Classification {
                detections,
                annotated,
            } = self.classifier.classify(&frame);

            let now = Instant::now();
            let status = self.coordinator.on_frame(&detections, &annotated, now);
            self.emit_status(status);
            // A detached UI is not an error; the loop keeps monitoring.
            let _ = self.events.send(MonitorEvent::Frame(annotated));
        }
    }

    fn emit_status(&mut self, status: UiStatus) {
        if self.last_status != Some(status) {
            self.last_status = Some(status);
            info!(%status, "status changed");
            let _ = self.events.send(MonitorEvent::Status(status));
        }
    }
}

/// A running monitor loop, owned by a dedicated thread.
pub struct MonitorSession {
    cancel: CancellationToken,
    join: Option<JoinHandle<Result<()>>>,
}

impl MonitorSession {
    pub fn spawn<C, S>(monitor: MonitorLoop<C, S>) -> Result<Self>
    where
        C: Classifier + 'static,
        S: StatusStore + 'static,
    {
        let cancel = monitor.cancel_token();
        let join = thread::Builder::new()
            .name("cropwatch-monitor".into())
            .spawn(move || monitor.run())
            .context("spawning monitor thread")?;
        Ok(Self {
            cancel,
            join: Some(join),
        })
    }

    /// Request stop and wait for the loop thread to exit. The capture handle
    /// is released before this returns, so a new session can start
    /// immediately.
    pub fn stop(mut self) -> Result<()> {
        self.cancel.cancel();
        match self.join.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| anyhow::anyhow!("monitor thread panicked"))?,
            None => Ok(()),
        }
    }
}
