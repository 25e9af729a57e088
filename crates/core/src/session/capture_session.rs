//! Transient per-run capture state.
//!
//! Everything here lives for one program run and is never persisted.
//! The phase graph is
//! `Idle → Acquiring → Previewing → Detecting → ShowingResults | Failed`,
//! with `reset` leading back to `Idle` from anywhere. Illegal steps are
//! logged and ignored rather than corrupting state.

use crate::detection::face::DetectedFace;

/// Where the capture flow currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Acquiring,
    Previewing,
    Detecting,
    ShowingResults,
    Failed,
}

/// How the current image was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    RemoteUrl,
    LocalFile,
    Camera,
}

/// Holds the session: current source, detection results, camera flag,
/// advisory busy flag, and the last error message.
///
/// The busy flag prevents overlapping submissions from well-behaved
/// callers; it is advisory UI state, not a mutex.
#[derive(Debug)]
pub struct CaptureSession {
    phase: Phase,
    source: Option<SourceKind>,
    faces: Vec<DetectedFace>,
    camera_active: bool,
    busy: bool,
    last_error: Option<String>,
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            source: None,
            faces: Vec::new(),
            camera_active: false,
            busy: false,
            last_error: None,
        }
    }
}

impl CaptureSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn source(&self) -> Option<SourceKind> {
        self.source
    }

    pub fn faces(&self) -> &[DetectedFace] {
        &self.faces
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn camera_active(&self) -> bool {
        self.camera_active
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Start acquiring from a new source. Allowed from every phase
    /// except while a submission is in flight; stale results and errors
    /// are cleared so the UI never shows geometry from a previous image.
    pub fn begin_acquire(&mut self, kind: SourceKind) -> bool {
        if self.busy {
            log::warn!("refusing to acquire {kind:?} while a detection is in flight");
            return false;
        }
        self.source = Some(kind);
        self.faces.clear();
        self.last_error = None;
        self.enter(Phase::Acquiring)
    }

    /// The acquired image is displayed and ready to submit.
    pub fn preview_ready(&mut self) -> bool {
        if self.phase() != Phase::Acquiring {
            return self.refuse(Phase::Previewing);
        }
        self.enter(Phase::Previewing)
    }

    /// Mark a submission as started. Refused while another one is in
    /// flight (rapid double-submit) or before a preview exists.
    pub fn begin_detection(&mut self) -> bool {
        if self.phase() != Phase::Previewing || self.busy {
            return self.refuse(Phase::Detecting);
        }
        self.busy = true;
        self.enter(Phase::Detecting)
    }

    /// Store results. An empty list is still a successful outcome; the
    /// caller surfaces the "no faces" notice.
    pub fn detection_succeeded(&mut self, faces: Vec<DetectedFace>) -> bool {
        if self.phase() != Phase::Detecting {
            return self.refuse(Phase::ShowingResults);
        }
        self.busy = false;
        self.faces = faces;
        self.enter(Phase::ShowingResults)
    }

    /// Record a failure from any active step. Results are cleared so a
    /// failed request never leaves stale geometry on screen.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if !matches!(
            self.phase(),
            Phase::Acquiring | Phase::Previewing | Phase::Detecting
        ) {
            return self.refuse(Phase::Failed);
        }
        self.busy = false;
        self.faces.clear();
        self.last_error = Some(message.into());
        self.enter(Phase::Failed)
    }

    /// Track whether the live camera currently holds the device.
    pub fn set_camera_active(&mut self, active: bool) {
        self.camera_active = active;
    }

    /// Back to `Idle`, dropping everything. The caller is responsible
    /// for releasing the camera first.
    pub fn reset(&mut self) {
        if self.camera_active {
            log::warn!("session reset while the camera is still active");
        }
        *self = Self::default();
    }

    fn enter(&mut self, phase: Phase) -> bool {
        log::debug!("session: {:?} -> {phase:?}", self.phase);
        self.phase = phase;
        true
    }

    fn refuse(&mut self, attempted: Phase) -> bool {
        log::warn!(
            "session: ignoring transition {:?} -> {attempted:?}",
            self.phase
        );
        false
    }
}
