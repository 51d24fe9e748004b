//! Canonical data types for frames, detections and plant state.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Frames & Detections
// ============================================================================

/// A single video frame, RGB8, row-major, no padding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// `width * height * 3` bytes.
    pub pixels: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), (width as usize) * (height as usize) * 3);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Flip the frame around its vertical axis (webcam mirror).
    pub fn mirrored(&self) -> Frame {
        let row_len = self.width as usize * 3;
        let mut pixels = Vec::with_capacity(self.pixels.len());
        for row in self.pixels.chunks_exact(row_len) {
            for px in row.chunks_exact(3).rev() {
                pixels.extend_from_slice(px);
            }
        }
        Frame {
            width: self.width,
            height: self.height,
            pixels,
        }
    }
}

/// Axis-aligned bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// One classifier hit on one frame. Produced fresh per frame, never retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    pub bbox: BoundingBox,
}

// ============================================================================
// Nutrient setpoints
// ============================================================================

/// N/P/K nutrient levels. Used both for the stored baseline ("threshold")
/// and for the live current setpoint derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NutrientTriple {
    pub n: u32,
    pub p: u32,
    pub k: u32,
}

impl NutrientTriple {
    /// All-zero setpoint, written when the unhealthy condition triggers.
    pub const ZERO: NutrientTriple = NutrientTriple { n: 0, p: 0, k: 0 };

    pub fn new(n: u32, p: u32, k: u32) -> Self {
        Self { n, p, k }
    }

    /// Setpoint written on recovery: one step above the baseline on every axis.
    pub fn recovery_target(&self) -> NutrientTriple {
        NutrientTriple {
            n: self.n + 1,
            p: self.p + 1,
            k: self.k + 1,
        }
    }
}

impl fmt::Display for NutrientTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.n, self.p, self.k)
    }
}

// ============================================================================
// Condition & status enums
// ============================================================================

/// Debounced plant-health condition. This is the hysteretic two-state signal,
/// not the raw per-frame detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlantCondition {
    #[default]
    Healthy,
    Unhealthy,
}

/// A confirmed condition change reported by the debouncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    /// Healthy -> Unhealthy: the hit counter reached the required threshold.
    Triggered,
    /// Unhealthy -> Healthy: no positive signal for the full recovery window.
    Recovered,
}

/// Coarse per-frame status emitted to the UI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UiStatus {
    #[default]
    Stopped,
    Healthy,
    Unhealthy,
    /// Frame processed but the classifier found nothing at all.
    NoSubject,
}

impl UiStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UiStatus::Stopped => "stopped",
            UiStatus::Healthy => "healthy",
            UiStatus::Unhealthy => "unhealthy",
            UiStatus::NoSubject => "no_subject",
        }
    }
}

impl fmt::Display for UiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovery_target_steps_every_axis() {
        let baseline = NutrientTriple::new(2, 3, 1);
        assert_eq!(baseline.recovery_target(), NutrientTriple::new(3, 4, 2));
    }

    #[test]
    fn zero_triple_displays_compactly() {
        assert_eq!(NutrientTriple::ZERO.to_string(), "(0,0,0)");
    }

    #[test]
    fn mirror_reverses_rows_only() {
        // 2x2 frame, distinct pixel per corner.
        let frame = Frame::new(
            2,
            2,
            vec![
                1, 1, 1, 2, 2, 2, //
                3, 3, 3, 4, 4, 4,
            ],
        );
        let flipped = frame.mirrored();
        assert_eq!(
            flipped.pixels,
            vec![
                2, 2, 2, 1, 1, 1, //
                4, 4, 4, 3, 3, 3,
            ]
        );
        assert_eq!(flipped.width, 2);
        assert_eq!(flipped.height, 2);
    }

    #[test]
    fn ui_status_round_trips_as_str() {
        assert_eq!(UiStatus::NoSubject.as_str(), "no_subject");
        assert_eq!(UiStatus::Unhealthy.to_string(), "unhealthy");
    }
}
