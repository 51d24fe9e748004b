//! Canonical types shared across the Cropwatch crates.
//!
//! Everything the capture loop, coordinator and db layer agree on lives here:
//! detection payloads, the nutrient triple, the debounced condition enums and
//! the frozen monitor configuration.

pub mod config;
pub mod defaults;
pub mod types;

pub use config::{CameraConfig, MonitorConfig, NotifyConfig};
pub use types::{
    BoundingBox, Detection, Frame, NutrientTriple, PlantCondition, Transition, UiStatus,
};
