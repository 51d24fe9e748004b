//! Frame acquisition with primary/fallback strategies and failure-triggered
//! reacquisition.
//!
//! Consumer video devices intermittently stall; a single-open design would
//! kill the whole session on one dropped frame. The capture source therefore
//! counts consecutive transient read failures and, at a configurable
//! threshold, releases the device and re-runs the open-with-fallback
//! procedure. Only an open that fails on every strategy is fatal.

use cropwatch_protocol::Frame;
use thiserror::Error;
use tracing::{info, warn};

/// Capture errors. Transient variants are retried by the monitor loop;
/// [`CaptureError::Exhausted`] ends the session.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// One backend refused to open (other strategies may still succeed)
    #[error("Camera open failed ({backend}): {reason}")]
    Open { backend: &'static str, reason: String },

    /// Single frame read failed; counted towards the reopen threshold
    #[error("Frame read failed: {0}")]
    Read(String),

    /// Every acquisition strategy failed; the session cannot continue
    #[error("No camera available: primary and fallback acquisition both failed")]
    Exhausted,
}

impl CaptureError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, CaptureError::Exhausted)
    }
}

/// An open device handle that yields frames.
pub trait FrameGrabber: Send {
    fn read(&mut self) -> Result<Frame, CaptureError>;
}

/// One acquisition strategy (e.g. a CSI pipeline, or a USB device index).
pub trait CameraBackend: Send {
    fn label(&self) -> &'static str;

    fn open(&self) -> Result<Box<dyn FrameGrabber>, CaptureError>;

    /// Device-level recovery hook, run before a reopen while this backend is
    /// active (e.g. restarting a capture daemon). Default: no-op.
    fn recover(&self) {}
}

/// Which strategy produced the active grabber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActiveBackend {
    Primary,
    Fallback,
}

/// Frame source with automatic reopen on sustained read failure.
pub struct CaptureSource {
    primary: Box<dyn CameraBackend>,
    fallback: Option<Box<dyn CameraBackend>>,
    grabber: Option<Box<dyn FrameGrabber>>,
    active: ActiveBackend,
    max_read_failures: u32,
    read_failures: u32,
}

impl CaptureSource {
    /// Open the source, trying the primary strategy first and the fallback
    /// second. Fails fatally when both refuse.
    pub fn open(
        primary: Box<dyn CameraBackend>,
        fallback: Option<Box<dyn CameraBackend>>,
        max_read_failures: u32,
    ) -> Result<Self, CaptureError> {
        let (grabber, active) = open_with_fallback(primary.as_ref(), fallback.as_deref())?;
        Ok(Self {
            primary,
            fallback,
            grabber: Some(grabber),
            active,
            max_read_failures,
            read_failures: 0,
        })
    }

    /// Label of the strategy currently producing frames.
    pub fn active_backend(&self) -> &'static str {
        match self.active {
            ActiveBackend::Primary => self.primary.label(),
            ActiveBackend::Fallback => self
                .fallback
                .as_ref()
                .map(|b| b.label())
                .unwrap_or("fallback"),
        }
    }

    /// Read one frame.
    ///
    /// A transient failure is returned to the caller (which sleeps briefly
    /// and retries); once `max_read_failures` consecutive failures accumulate
    /// the device is released and reopened. A failed reopen is fatal.
    pub fn read(&mut self) -> Result<Frame, CaptureError> {
        let grabber = match self.grabber.as_mut() {
            Some(g) => g,
            None => return Err(CaptureError::Read("capture source is closed".into())),
        };

        match grabber.read() {
            Ok(frame) => {
                self.read_failures = 0;
                Ok(frame)
            }
            Err(err) => {
                self.read_failures += 1;
                if self.read_failures % 30 == 0 {
                    warn!(consecutive = self.read_failures, "camera read still failing");
                }
                if self.read_failures >= self.max_read_failures {
                    warn!(
                        consecutive = self.read_failures,
                        "too many consecutive read failures, reopening camera"
                    );
                    self.reopen()?;
                    self.read_failures = 0;
                }
                Err(err)
            }
        }
    }

    /// Release the device handle. Subsequent reads fail transiently.
    pub fn close(&mut self) {
        if self.grabber.take().is_some() {
            info!(backend = self.active_backend(), "capture source released");
        }
    }

    fn reopen(&mut self) -> Result<(), CaptureError> {
        // Release the stalled handle before the backend-level recovery hook
        // runs, so the device node is free for reacquisition.
        self.grabber = None;
        if self.active == ActiveBackend::Primary {
            self.primary.recover();
        }

        match open_with_fallback(self.primary.as_ref(), self.fallback.as_deref()) {
            Ok((grabber, active)) => {
                self.grabber = Some(grabber);
                self.active = active;
                info!(backend = self.active_backend(), "camera reopened");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "camera reopen failed");
                Err(err)
            }
        }
    }
}

fn open_with_fallback(
    primary: &dyn CameraBackend,
    fallback: Option<&dyn CameraBackend>,
) -> Result<(Box<dyn FrameGrabber>, ActiveBackend), CaptureError> {
    match primary.open() {
        Ok(grabber) => {
            info!(backend = primary.label(), "camera opened");
            return Ok((grabber, ActiveBackend::Primary));
        }
        Err(err) => warn!(backend = primary.label(), error = %err, "primary camera open failed"),
    }

    if let Some(backend) = fallback {
        match backend.open() {
            Ok(grabber) => {
                info!(backend = backend.label(), "fallback camera opened");
                return Ok((grabber, ActiveBackend::Fallback));
            }
            Err(err) => warn!(backend = backend.label(), error = %err, "fallback camera open failed"),
        }
    }

    Err(CaptureError::Exhausted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn test_frame() -> Frame {
        Frame::new(2, 1, vec![0; 6])
    }

    /// Grabber that fails its first `fail_reads` reads, then succeeds.
    struct ScriptedGrabber {
        fail_reads: u32,
        reads: u32,
    }

    impl FrameGrabber for ScriptedGrabber {
        fn read(&mut self) -> Result<Frame, CaptureError> {
            self.reads += 1;
            if self.reads <= self.fail_reads {
                Err(CaptureError::Read("stalled".into()))
            } else {
                Ok(test_frame())
            }
        }
    }

    struct ScriptedBackend {
        label: &'static str,
        /// Opens that fail before the first success.
        fail_opens: u32,
        /// Reads that fail per opened grabber.
        fail_reads: u32,
        opens: Arc<AtomicU32>,
        recovers: Arc<AtomicU32>,
    }

    impl ScriptedBackend {
        fn new(label: &'static str, fail_opens: u32, fail_reads: u32) -> Self {
            Self {
                label,
                fail_opens,
                fail_reads,
                opens: Arc::new(AtomicU32::new(0)),
                recovers: Arc::new(AtomicU32::new(0)),
            }
        }
    }

    impl CameraBackend for ScriptedBackend {
        fn label(&self) -> &'static str {
            self.label
        }

        fn open(&self) -> Result<Box<dyn FrameGrabber>, CaptureError> {
            let attempt = self.opens.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_opens {
                return Err(CaptureError::Open {
                    backend: self.label,
                    reason: "device busy".into(),
                });
            }
            Ok(Box::new(ScriptedGrabber {
                fail_reads: self.fail_reads,
                reads: 0,
            }))
        }

        fn recover(&self) {
            self.recovers.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn fallback_is_used_when_primary_refuses() {
        let primary = ScriptedBackend::new("csi", u32::MAX, 0);
        let fallback = ScriptedBackend::new("usb", 0, 0);
        let fallback_opens = fallback.opens.clone();

        let mut source =
            CaptureSource::open(Box::new(primary), Some(Box::new(fallback)), 5).unwrap();
        assert_eq!(source.active_backend(), "usb");
        assert_eq!(fallback_opens.load(Ordering::SeqCst), 1);
        assert!(source.read().is_ok());
    }

    #[test]
    fn open_fails_fatally_when_both_strategies_refuse() {
        let primary = ScriptedBackend::new("csi", u32::MAX, 0);
        let fallback = ScriptedBackend::new("usb", u32::MAX, 0);
        let err = CaptureSource::open(Box::new(primary), Some(Box::new(fallback)), 5)
            .err()
            .expect("open should fail with no usable backend");
        assert!(err.is_fatal());
    }

    /// Backend whose first grabber fails every read; grabbers from later
    /// opens read cleanly.
    struct StalledFirstBackend {
        opens: Arc<AtomicU32>,
        recovers: Arc<AtomicU32>,
    }

    impl StalledFirstBackend {
        fn new() -> Self {
            Self {
                opens: Arc::new(AtomicU32::new(0)),
                recovers: Arc::new(AtomicU32::new(0)),
            }
        }
    }

    impl CameraBackend for StalledFirstBackend {
        fn label(&self) -> &'static str {
            "csi"
        }

        fn open(&self) -> Result<Box<dyn FrameGrabber>, CaptureError> {
            let fail_reads = if self.opens.fetch_add(1, Ordering::SeqCst) == 0 {
                u32::MAX
            } else {
                0
            };
            Ok(Box::new(ScriptedGrabber { fail_reads, reads: 0 }))
        }

        fn recover(&self) {
            self.recovers.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn sustained_read_failure_triggers_exactly_one_reopen() {
        let max_failures = 4;
        let primary = StalledFirstBackend::new();
        let opens = primary.opens.clone();
        let recovers = primary.recovers.clone();

        let mut source = CaptureSource::open(Box::new(primary), None, max_failures).unwrap();
        for _ in 0..max_failures {
            assert!(matches!(source.read(), Err(CaptureError::Read(_))));
        }
        assert_eq!(opens.load(Ordering::SeqCst), 2, "one initial open plus one reopen");
        assert_eq!(recovers.load(Ordering::SeqCst), 1);

        // Emission resumes on the reopened grabber with no further reopen.
        assert!(source.read().is_ok());
        assert!(source.read().is_ok());
        assert_eq!(opens.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failed_reopen_is_fatal() {
        // First open yields a permanently stalled grabber; every later open
        // refuses, so the reopen at the failure threshold cannot succeed.
        struct VanishingBackend {
            opens: Arc<AtomicU32>,
        }
        impl CameraBackend for VanishingBackend {
            fn label(&self) -> &'static str {
                "csi"
            }
            fn open(&self) -> Result<Box<dyn FrameGrabber>, CaptureError> {
                if self.opens.fetch_add(1, Ordering::SeqCst) == 0 {
                    Ok(Box::new(ScriptedGrabber {
                        fail_reads: u32::MAX,
                        reads: 0,
                    }))
                } else {
                    Err(CaptureError::Open {
                        backend: "csi",
                        reason: "gone".into(),
                    })
                }
            }
        }

        let backend = VanishingBackend {
            opens: Arc::new(AtomicU32::new(0)),
        };
        let mut source = CaptureSource::open(Box::new(backend), None, 2).unwrap();
        assert!(matches!(source.read(), Err(CaptureError::Read(_))));
        let err = source.read().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn close_releases_the_handle() {
        let primary = ScriptedBackend::new("csi", 0, 0);
        let mut source = CaptureSource::open(Box::new(primary), None, 5).unwrap();
        assert!(source.read().is_ok());
        source.close();
        assert!(matches!(source.read(), Err(CaptureError::Read(_))));
    }
}
