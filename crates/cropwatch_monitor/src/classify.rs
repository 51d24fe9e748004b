//! Classifier boundary.
//!
//! The detection model is an external collaborator: synchronous, blocking,
//! and always returning (possibly with an empty detection list). The monitor
//! loop imposes no timeout on it.

use cropwatch_protocol::{Detection, Frame};

/// Output of one classifier pass over one frame.
#[derive(Debug, Clone)]
pub struct Classification {
    pub detections: Vec<Detection>,
    /// The input frame with detection overlays rendered onto it; forwarded
    /// to the UI boundary and used for snapshot notifications.
    pub annotated: Frame,
}

/// Black-box object classifier.
pub trait Classifier: Send {
    fn classify(&mut self, frame: &Frame) -> Classification;
}
