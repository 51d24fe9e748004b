//! Cropwatch monitoring core.
//!
//! Turns a noisy per-frame classifier signal into a stable plant-health
//! condition and drives two rate-limited side effects from it: a persisted
//! nutrient-setpoint write and a snapshot notification. The pipeline is
//! capture -> classify -> debounce -> coordinate -> emit, strictly sequential
//! on one monitor thread; only the snapshot dispatcher runs beside it.
//!
//! Design principles:
//! - Debounce state and cooldown clocks are owned by the monitor thread,
//!   never shared or locked
//! - All tunables arrive in one frozen `MonitorConfig`; time is passed in
//!   explicitly so the state machines test deterministically
//! - Side-effect failures are logged and never unwind past a frame cycle
//! - Shutdown is cooperative and join-based

pub mod cancel;
pub mod capture;
pub mod classify;
pub mod coordinate;
pub mod debounce;
pub mod dispatch;
pub mod logging;
pub mod monitor;
pub mod notify;

pub use cancel::CancellationToken;
pub use capture::{CameraBackend, CaptureError, CaptureSource, FrameGrabber};
pub use classify::{Classification, Classifier};
pub use coordinate::{StatusCoordinator, StatusStore};
pub use debounce::DetectionDebouncer;
pub use dispatch::{DispatchQueue, Dispatcher, DispatcherHandle, SnapshotSink};
pub use monitor::{MonitorEvent, MonitorLoop, MonitorSession};
pub use notify::{NotifyError, TelegramNotifier};
