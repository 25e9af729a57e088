//! The capture step shared by every camera backend: grab one frame,
//! mirror it, release the device.

use image::{imageops, RgbImage};

use super::camera::{CameraError, CameraSource};

/// Grab the current frame, mirror it horizontally, and release the
/// device.
///
/// The mirror matches what the user saw in the flipped live preview.
/// The device is released on the error path too; a failed capture must
/// not leave the camera held.
pub fn take_mirrored_photo(camera: &mut dyn CameraSource) -> Result<RgbImage, CameraError> {
    let grabbed = camera.grab_frame();
    camera.stop();
    grabbed.map(|frame| imageops::flip_horizontal(&frame))
}

/// Encode a photo as PNG for inline submission.
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    image.write_to(&mut buffer, image::ImageFormat::Png)?;
    Ok(buffer.into_inner())
}
