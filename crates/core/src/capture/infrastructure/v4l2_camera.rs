use image::RgbImage;
use v4l::buffer::Type;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};

use crate::capture::domain::camera::{CameraError, CameraSource};

const BUFFER_COUNT: u32 = 4;

/// Frames discarded after stream start so auto-exposure can settle
/// before the one frame we keep.
const WARMUP_FRAMES: usize = 2;

/// V4L2-backed camera.
///
/// The device node is opened in [`CameraSource::start`] and held until
/// [`CameraSource::stop`] or drop; between captures nothing is held, so
/// other applications can use the camera.
pub struct V4l2Camera {
    path: String,
    width: u32,
    height: u32,
    device: Option<Device>,
}

impl V4l2Camera {
    /// Describe a camera without touching the device.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            width: 640,
            height: 480,
            device: None,
        }
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

impl CameraSource for V4l2Camera {
    fn start(&mut self) -> Result<(), CameraError> {
        if self.device.is_some() {
            return Err(CameraError::Other("camera already started".to_string()));
        }

        let device = Device::with_path(&self.path).map_err(|e| CameraError::from_io(&e))?;

        // Negotiate MJPEG at the requested resolution; the driver may
        // substitute another format, which we treat as unsupported.
        let requested = Format::new(self.width, self.height, FourCC::new(b"MJPG"));
        let accepted =
            Capture::set_format(&device, &requested).map_err(|e| CameraError::from_io(&e))?;
        if accepted.fourcc != FourCC::new(b"MJPG") {
            return Err(CameraError::Other(
                "device does not support MJPEG capture".to_string(),
            ));
        }

        log::info!(
            "camera {} streaming at {}x{}",
            self.path,
            accepted.width,
            accepted.height
        );
        self.device = Some(device);
        Ok(())
    }

    fn grab_frame(&mut self) -> Result<RgbImage, CameraError> {
        let device = self.device.as_ref().ok_or_else(|| {
            CameraError::Other("grab_frame called before start".to_string())
        })?;

        let mut stream = MmapStream::with_buffers(device, Type::VideoCapture, BUFFER_COUNT)
            .map_err(|e| CameraError::from_io(&e))?;

        for _ in 0..WARMUP_FRAMES {
            stream.next().map_err(|e| CameraError::from_io(&e))?;
        }

        let (buffer, metadata) = stream.next().map_err(|e| CameraError::from_io(&e))?;
        let jpeg = &buffer[..metadata.bytesused as usize];
        let frame = image::load_from_memory(jpeg)
            .map_err(|e| CameraError::Other(format!("could not decode camera frame: {e}")))?;
        Ok(frame.to_rgb8())
    }

    fn stop(&mut self) {
        if self.device.take().is_some() {
            log::info!("camera {} released", self.path);
        }
    }

    fn is_active(&self) -> bool {
        self.device.is_some()
    }
}

impl Drop for V4l2Camera {
    fn drop(&mut self) {
        self.stop();
    }
}
