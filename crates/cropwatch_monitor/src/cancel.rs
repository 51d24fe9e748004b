use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Token for cooperative shutdown of the monitor loop and dispatcher threads.
///
/// Uses an AtomicBool internally. Clone is cheap and shares state.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    stop_requested: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new token (stop not requested).
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether stop has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Request stop. Observed at the next loop iteration boundary.
    pub fn cancel(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }
}
