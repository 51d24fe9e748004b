//! Status coordination.
//!
//! Owns the debounced condition and turns its transitions into the two side
//! effects: a persisted nutrient-setpoint write (shared cooldown across both
//! transition kinds, so oscillation cannot flood the store) and a snapshot
//! notification offer. The condition transition is authoritative: a failed
//! side effect is logged and retried naturally at the next eligible
//! transition, never rolled back.

use crate::debounce::DetectionDebouncer;
use crate::dispatch::DispatchQueue;
use crate::notify;
use cropwatch_protocol::{
    Detection, Frame, MonitorConfig, NutrientTriple, PlantCondition, Transition, UiStatus,
};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Synchronous seam to the persisted-status store. The monitor thread is the
/// only writer, one short-lived operation per call.
pub trait StatusStore: Send {
    fn read_baseline(&self, device_id: u32) -> anyhow::Result<NutrientTriple>;
    fn write_current(&self, device_id: u32, current: NutrientTriple) -> anyhow::Result<u64>;
}

impl StatusStore for cropwatch_db::ConfigDb {
    fn read_baseline(&self, device_id: u32) -> anyhow::Result<NutrientTriple> {
        Ok(cropwatch_db::ConfigDb::read_baseline(self, device_id)?)
    }

    fn write_current(&self, device_id: u32, current: NutrientTriple) -> anyhow::Result<u64> {
        Ok(cropwatch_db::ConfigDb::write_current(self, device_id, current)?)
    }
}

/// Per-frame orchestration: debounce the raw signal, fire side effects on
/// confirmed transitions, report the coarse UI status.
pub struct StatusCoordinator<S: StatusStore> {
    device_id: u32,
    unhealthy_label: String,
    confidence_threshold: f32,
    db_cooldown: Duration,
    baseline: NutrientTriple,
    debouncer: DetectionDebouncer,
    store: S,
    dispatch: Option<DispatchQueue>,
    last_db_write: Option<Instant>,
}

impl<S: StatusStore> StatusCoordinator<S> {
    pub fn new(
        config: &MonitorConfig,
        baseline: NutrientTriple,
        store: S,
        dispatch: Option<DispatchQueue>,
    ) -> Self {
        Self {
            device_id: config.device_id,
            unhealthy_label: config.unhealthy_label.clone(),
            confidence_threshold: config.confidence_threshold,
            db_cooldown: config.db_cooldown,
            baseline,
            debouncer: DetectionDebouncer::new(config.required_hits, config.recovery_window),
            store,
            dispatch,
            last_db_write: None,
        }
    }

    /// Process one frame's detections.
    ///
    /// An empty detection set means "nothing in view", not "unhealthy": the
    /// debounce counter decays, but transition evaluation waits for a frame
    /// with a subject, so a recovery that comes due while the plant is out
    /// of view still performs its setpoint write on the next subject frame.
    pub fn on_frame(&mut self, detections: &[Detection], annotated: &Frame, now: Instant) -> UiStatus {
        if detections.is_empty() {
            self.debouncer.decay();
            return UiStatus::NoSubject;
        }

        let mut positive = false;
        let mut best_confidence = 0.0f32;
        for detection in detections {
            if detection.label == self.unhealthy_label
                && detection.confidence >= self.confidence_threshold
            {
                positive = true;
                best_confidence = best_confidence.max(detection.confidence);
            }
        }

        match self.debouncer.observe(positive, now) {
            Some(Transition::Triggered) => self.on_triggered(annotated, best_confidence, now),
            Some(Transition::Recovered) => self.on_recovered(now),
            None => {}
        }

        match self.debouncer.condition() {
            PlantCondition::Unhealthy => UiStatus::Unhealthy,
            PlantCondition::Healthy => UiStatus::Healthy,
        }
    }

    pub fn condition(&self) -> PlantCondition {
        self.debouncer.condition()
    }

    fn on_triggered(&mut self, annotated: &Frame, best_confidence: f32, now: Instant) {
        info!(
            hits = self.debouncer.hits(),
            best_confidence, "unhealthy condition confirmed"
        );
        self.persist_setpoint(NutrientTriple::ZERO, "unhealthy trigger", now);
        self.offer_snapshot(annotated, best_confidence);
    }

    fn on_recovered(&mut self, now: Instant) {
        let target = self.baseline.recovery_target();
        info!(setpoint = %target, "condition recovered");
        self.persist_setpoint(target, "recovery", now);
    }

    /// Write a setpoint under the shared cooldown. The clock is stamped on a
    /// successful write of either kind.
    fn persist_setpoint(&mut self, value: NutrientTriple, reason: &str, now: Instant) {
        if let Some(previous) = self.last_db_write {
            if now.duration_since(previous) < self.db_cooldown {
                debug!(reason, "setpoint write suppressed by cooldown");
                return;
            }
        }

        match self.store.write_current(self.device_id, value) {
            Ok(affected) => {
                info!(reason, setpoint = %value, affected, "setpoint persisted");
                self.last_db_write = Some(now);
            }
            Err(err) => {
                // The debounced condition stands; the next eligible
                // transition retries naturally.
                error!(reason, error = %err, "setpoint write failed");
            }
        }
    }

    fn offer_snapshot(&self, annotated: &Frame, best_confidence: f32) {
        let Some(queue) = &self.dispatch else { return };

        let caption = format!(
            "UNHEALTHY PLANT DETECTED\ntime: {}\ndevice_id: {}\nhits: {}\nbest_conf: {:.2}\naction: current={}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            self.device_id,
            self.debouncer.hits(),
            best_confidence,
            NutrientTriple::ZERO,
        );

        match notify::encode_jpeg(annotated) {
            Ok(payload) => {
                if queue.offer(payload, caption) {
                    info!("snapshot queued");
                } else {
                    warn!("snapshot queue full, skipping");
                }
            }
            Err(err) => warn!(error = %err, "snapshot encode failed, skipping"),
        }
    }
}
