//! Detection debouncing.
//!
//! Converts the raw per-frame "unhealthy detected" signal into a hysteretic
//! two-state condition. The debounce is asymmetric on purpose: the hit
//! counter accumulates on positives and decays on absence, so one flaky frame
//! cannot toggle the state, while recovery requires a *sustained* silence
//! window rather than a small count (a plant does not recover in one frame).

use cropwatch_protocol::{PlantCondition, Transition};
use std::time::{Duration, Instant};
use tracing::debug;

/// Single-writer debounce state machine. Owned by the monitor thread and
/// mutated exactly once per frame; time is an explicit argument so tests are
/// deterministic.
#[derive(Debug)]
pub struct DetectionDebouncer {
    required_hits: u32,
    recovery_window: Duration,
    hit_counter: u32,
    condition: PlantCondition,
    last_positive: Option<Instant>,
}

impl DetectionDebouncer {
    pub fn new(required_hits: u32, recovery_window: Duration) -> Self {
        Self {
            required_hits,
            recovery_window,
            hit_counter: 0,
            condition: PlantCondition::Healthy,
            last_positive: None,
        }
    }

    /// Feed one frame's signal. Returns the condition change, if any.
    ///
    /// The counter increments on a positive and decrements (floored at zero)
    /// on absence; it is not clamped above, it only gates the upward
    /// transition. Healthy -> Unhealthy fires the first time the counter
    /// reaches `required_hits`; Unhealthy -> Healthy fires once the positive
    /// signal has been silent for the full recovery window, and resets the
    /// counter.
    pub fn observe(&mut self, positive: bool, now: Instant) -> Option<Transition> {
        if positive {
            self.hit_counter = self.hit_counter.saturating_add(1);
            self.last_positive = Some(now);
        } else {
            self.hit_counter = self.hit_counter.saturating_sub(1);
        }

        match self.condition {
            PlantCondition::Healthy if self.hit_counter >= self.required_hits => {
                self.condition = PlantCondition::Unhealthy;
                debug!(hits = self.hit_counter, "condition tripped to unhealthy");
                Some(Transition::Triggered)
            }
            PlantCondition::Unhealthy if self.silence_elapsed(now) => {
                self.condition = PlantCondition::Healthy;
                self.hit_counter = 0;
                debug!("condition recovered to healthy");
                Some(Transition::Recovered)
            }
            _ => None,
        }
    }

    /// Decay the counter without evaluating a transition. Used for frames
    /// with no subject at all: the signal is absent, not negative, so the
    /// condition holds until a subject is visible again and any pending
    /// transition fires on that later `observe`.
    pub fn decay(&mut self) {
        self.hit_counter = self.hit_counter.saturating_sub(1);
    }

    fn silence_elapsed(&self, now: Instant) -> bool {
        match self.last_positive {
            Some(at) => now.duration_since(at) >= self.recovery_window,
            None => true,
        }
    }

    pub fn hits(&self) -> u32 {
        self.hit_counter
    }

    pub fn condition(&self) -> PlantCondition {
        self.condition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(base: Instant, millis: u64) -> Instant {
        base + Duration::from_millis(millis)
    }

    #[test]
    fn counter_tracks_consecutive_positives() {
        let base = Instant::now();
        let mut deb = DetectionDebouncer::new(10, Duration::from_secs(30));
        for k in 1..=9 {
            assert_eq!(deb.observe(true, at(base, k)), None);
            assert_eq!(deb.hits(), k as u32);
        }
        // Crossing happens the first time the counter reaches the threshold.
        assert_eq!(deb.observe(true, at(base, 10)), Some(Transition::Triggered));
        assert_eq!(deb.hits(), 10);
    }

    #[test]
    fn counter_never_goes_negative() {
        let base = Instant::now();
        let mut deb = DetectionDebouncer::new(5, Duration::from_secs(30));
        for k in 0..20 {
            assert_eq!(deb.observe(false, at(base, k)), None);
            assert_eq!(deb.hits(), 0);
        }
    }

    #[test]
    fn flaky_sequence_trips_at_fifth_call() {
        // required_hits=3, signals [T,T,F,T,T,T]: counter 1,2,1,2,3,4.
        let base = Instant::now();
        let mut deb = DetectionDebouncer::new(3, Duration::from_secs(30));
        let signals = [true, true, false, true, true, true];
        let mut transitions = Vec::new();
        for (k, &s) in signals.iter().enumerate() {
            transitions.push(deb.observe(s, at(base, k as u64)));
        }
        assert_eq!(
            transitions,
            vec![None, None, None, None, Some(Transition::Triggered), None]
        );
        assert_eq!(deb.hits(), 4);
        assert_eq!(deb.condition(), PlantCondition::Unhealthy);
    }

    #[test]
    fn recovery_requires_sustained_silence() {
        let base = Instant::now();
        let window = Duration::from_millis(500);
        let mut deb = DetectionDebouncer::new(2, window);
        deb.observe(true, at(base, 0));
        assert_eq!(deb.observe(true, at(base, 10)), Some(Transition::Triggered));

        // Silence shorter than the window leaves the condition unhealthy.
        assert_eq!(deb.observe(false, at(base, 200)), None);
        assert_eq!(deb.observe(false, at(base, 509)), None);
        assert_eq!(deb.condition(), PlantCondition::Unhealthy);

        // At the window boundary it flips back and the counter resets.
        assert_eq!(deb.observe(false, at(base, 510)), Some(Transition::Recovered));
        assert_eq!(deb.condition(), PlantCondition::Healthy);
        assert_eq!(deb.hits(), 0);
    }

    #[test]
    fn positive_during_unhealthy_restarts_the_silence_clock() {
        let base = Instant::now();
        let window = Duration::from_millis(100);
        let mut deb = DetectionDebouncer::new(1, window);
        assert_eq!(deb.observe(true, at(base, 0)), Some(Transition::Triggered));

        // A fresh positive at t=90 pushes recovery out past t=190.
        assert_eq!(deb.observe(true, at(base, 90)), None);
        assert_eq!(deb.observe(false, at(base, 150)), None);
        assert_eq!(deb.observe(false, at(base, 190)), Some(Transition::Recovered));
    }

    #[test]
    fn decay_defers_recovery_until_observed() {
        let base = Instant::now();
        let window = Duration::from_millis(100);
        let mut deb = DetectionDebouncer::new(1, window);
        assert_eq!(deb.observe(true, at(base, 0)), Some(Transition::Triggered));

        // Decay past the window leaves the condition standing.
        deb.decay();
        deb.decay();
        assert_eq!(deb.condition(), PlantCondition::Unhealthy);
        assert_eq!(deb.hits(), 0);

        // The next observed negative sees the elapsed silence and recovers.
        assert_eq!(deb.observe(false, at(base, 150)), Some(Transition::Recovered));
        assert_eq!(deb.condition(), PlantCondition::Healthy);
    }

    #[test]
    fn counter_saturates_at_the_numeric_ceiling() {
        let base = Instant::now();
        let mut deb = DetectionDebouncer {
            required_hits: 5,
            recovery_window: Duration::from_secs(30),
            hit_counter: u32::MAX,
            condition: PlantCondition::Unhealthy,
            last_positive: Some(base),
        };
        assert_eq!(deb.observe(true, at(base, 1)), None);
        assert_eq!(deb.hits(), u32::MAX);
    }

    #[test]
    fn counter_keeps_accumulating_past_the_threshold() {
        let base = Instant::now();
        let mut deb = DetectionDebouncer::new(2, Duration::from_secs(30));
        deb.observe(true, at(base, 0));
        assert_eq!(deb.observe(true, at(base, 1)), Some(Transition::Triggered));
        assert_eq!(deb.observe(true, at(base, 2)), None);
        assert_eq!(deb.observe(true, at(base, 3)), None);
        assert_eq!(deb.hits(), 4);
    }
}
