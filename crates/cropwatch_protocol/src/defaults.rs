//! Canonical default values for the monitor configuration.

pub const DEFAULT_DEVICE_ID: u32 = 3;

/// Class name the classifier reports for an unhealthy plant.
pub const DEFAULT_UNHEALTHY_LABEL: &str = "dead";
/// Minimum confidence for a detection to count as a positive signal.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.35;
/// Accumulated hits required before the condition trips.
pub const DEFAULT_REQUIRED_HITS: u32 = 30;
/// Positive-signal silence required before the condition recovers.
pub const DEFAULT_RECOVERY_WINDOW_SECS: u64 = 30;
/// Minimum spacing between persisted setpoint writes.
pub const DEFAULT_DB_COOLDOWN_SECS: u64 = 5;

/// Minimum spacing between snapshot notifications.
pub const DEFAULT_NOTIFY_COOLDOWN_SECS: u64 = 10;
/// Bounded snapshot queue depth; excess offers are dropped.
pub const DEFAULT_NOTIFY_QUEUE_CAPACITY: usize = 5;

pub const DEFAULT_CAMERA_WIDTH: u32 = 1920;
pub const DEFAULT_CAMERA_HEIGHT: u32 = 1080;
pub const DEFAULT_CAMERA_FPS: u32 = 30;
/// Consecutive read failures tolerated before the capture source reopens.
pub const DEFAULT_MAX_READ_FAILURES: u32 = 60;
/// Pause after a transient read failure before the next attempt.
pub const DEFAULT_READ_RETRY_MS: u64 = 30;
