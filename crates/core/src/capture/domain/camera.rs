use image::RgbImage;
use thiserror::Error;

/// Why camera acquisition failed, classified so each cause gets its own
/// user-facing message.
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("camera access was denied; check the device permissions")]
    PermissionDenied,
    #[error("no camera device was found")]
    NotFound,
    #[error("the camera is already in use by another application")]
    Busy,
    #[error("camera capture is not supported by this build")]
    Unsupported,
    #[error("camera error: {0}")]
    Other(String),
}

// io::ErrorKind has no stable variant for EBUSY.
const EBUSY: i32 = 16;

impl CameraError {
    /// Classify an OS error from opening or streaming a device.
    pub fn from_io(err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => CameraError::PermissionDenied,
            std::io::ErrorKind::NotFound => CameraError::NotFound,
            _ if err.raw_os_error() == Some(EBUSY) => CameraError::Busy,
            _ => CameraError::Other(err.to_string()),
        }
    }
}

/// Exclusive live-video source.
///
/// Implementations own the underlying device between `start` and `stop`
/// and must release it on `stop` and on drop; a dropped source never
/// leaves the device held.
pub trait CameraSource {
    /// Acquire the device and start streaming.
    fn start(&mut self) -> Result<(), CameraError>;

    /// Copy out the most recent frame. Requires an active stream.
    fn grab_frame(&mut self) -> Result<RgbImage, CameraError>;

    /// Release the device. Idempotent.
    fn stop(&mut self);

    fn is_active(&self) -> bool;
}
