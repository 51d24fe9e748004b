//! Frozen monitor configuration.
//!
//! All tunables are loaded once at session start and passed into constructors
//! explicitly. Nothing in the core reads the environment after this point, so
//! the debounce and coordinator logic stay testable with injected thresholds.

use crate::defaults;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Camera acquisition tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Flip frames horizontally before classification (webcam mirror).
    pub mirror: bool,
    /// Consecutive transient read failures before the source reopens.
    pub max_read_failures: u32,
    /// Sleep between read attempts after a transient failure.
    pub read_retry_delay: Duration,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: defaults::DEFAULT_CAMERA_WIDTH,
            height: defaults::DEFAULT_CAMERA_HEIGHT,
            fps: defaults::DEFAULT_CAMERA_FPS,
            mirror: true,
            max_read_failures: defaults::DEFAULT_MAX_READ_FAILURES,
            read_retry_delay: Duration::from_millis(defaults::DEFAULT_READ_RETRY_MS),
        }
    }
}

/// Snapshot notification tunables. Notifications are enabled only when both
/// credentials are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NotifyConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub cooldown: Duration,
    pub queue_capacity: usize,
}

impl NotifyConfig {
    pub fn enabled(&self) -> bool {
        matches!((&self.bot_token, &self.chat_id), (Some(t), Some(c)) if !t.is_empty() && !c.is_empty())
    }
}

/// The complete, frozen set of monitoring tunables for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub device_id: u32,
    /// Classifier label that counts as an unhealthy plant.
    pub unhealthy_label: String,
    /// Minimum confidence for a positive signal.
    pub confidence_threshold: f32,
    /// Hit-counter threshold for the Healthy -> Unhealthy transition.
    pub required_hits: u32,
    /// Positive-signal silence required for the Unhealthy -> Healthy transition.
    pub recovery_window: Duration,
    /// Shared cooldown across both kinds of persisted setpoint writes.
    pub db_cooldown: Duration,
    pub camera: CameraConfig,
    pub notify: NotifyConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            device_id: defaults::DEFAULT_DEVICE_ID,
            unhealthy_label: defaults::DEFAULT_UNHEALTHY_LABEL.to_string(),
            confidence_threshold: defaults::DEFAULT_CONFIDENCE_THRESHOLD,
            required_hits: defaults::DEFAULT_REQUIRED_HITS,
            recovery_window: Duration::from_secs(defaults::DEFAULT_RECOVERY_WINDOW_SECS),
            db_cooldown: Duration::from_secs(defaults::DEFAULT_DB_COOLDOWN_SECS),
            camera: CameraConfig::default(),
            notify: NotifyConfig {
                cooldown: Duration::from_secs(defaults::DEFAULT_NOTIFY_COOLDOWN_SECS),
                queue_capacity: defaults::DEFAULT_NOTIFY_QUEUE_CAPACITY,
                ..NotifyConfig::default()
            },
        }
    }
}

impl MonitorConfig {
    /// Build a config from the deployment environment. Unset or unparsable
    /// values fall back to the defaults; notification credentials are taken
    /// from `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID` and enable dispatch by
    /// their presence.
    pub fn from_env() -> Self {
        let base = MonitorConfig::default();
        MonitorConfig {
            device_id: env_or("DEVICE_ID", base.device_id),
            unhealthy_label: env::var("UNHEALTHY_CLASS_NAME")
                .unwrap_or(base.unhealthy_label),
            confidence_threshold: env_or("UNHEALTHY_CONF", base.confidence_threshold),
            required_hits: env_or("UNHEALTHY_HITS_REQUIRED", base.required_hits),
            recovery_window: secs_env_or("RECOVER_AFTER_SEC", base.recovery_window),
            db_cooldown: secs_env_or("DB_COOLDOWN_SEC", base.db_cooldown),
            camera: CameraConfig {
                width: env_or("CAM_WIDTH", base.camera.width),
                height: env_or("CAM_HEIGHT", base.camera.height),
                fps: env_or("CAM_FPS", base.camera.fps),
                mirror: env_or("CAM_MIRROR", base.camera.mirror),
                max_read_failures: env_or("CAM_MAX_READ_FAIL", base.camera.max_read_failures),
                read_retry_delay: base.camera.read_retry_delay,
            },
            notify: NotifyConfig {
                bot_token: nonempty_env("TELEGRAM_BOT_TOKEN"),
                chat_id: nonempty_env("TELEGRAM_CHAT_ID"),
                cooldown: secs_env_or("TELEGRAM_COOLDOWN_SEC", base.notify.cooldown),
                queue_capacity: base.notify.queue_capacity,
            },
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn secs_env_or(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn nonempty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
