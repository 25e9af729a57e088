//! Draws detection geometry over the previewed image.
//!
//! Rendering is a pure function of (image, faces, style): callers
//! re-run it whenever either the image or the result set changes.

use ab_glyph::{FontVec, PxScale};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_cross_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::detection::face::{DetectedFace, FaceRectangle};

/// Overlay appearance. `scale` multiplies the canvas (and all geometry)
/// for sharper output on high-density displays.
pub struct OverlayStyle {
    pub scale: u32,
    pub box_color: Rgb<u8>,
    pub label_color: Rgb<u8>,
    pub marker_color: Rgb<u8>,
    /// Label text is only rasterized when a font is available; the
    /// labels themselves are always part of the result.
    pub font: Option<FontVec>,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            scale: 1,
            box_color: Rgb([0, 220, 90]),
            label_color: Rgb([255, 255, 255]),
            marker_color: Rgb([255, 80, 80]),
            font: None,
        }
    }
}

/// What was drawn for one face, in response order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FaceAnnotation {
    /// "Face 1" .. "Face N".
    pub label: String,
    /// Rectangle in unscaled source-image coordinates.
    pub rectangle: FaceRectangle,
}

/// Render the image with one hollow rectangle, one sequential label,
/// and a marker per landmark for each face.
///
/// Geometry outside the canvas is clipped; landmark markers falling
/// fully outside are skipped. Zero faces yields an untouched copy of
/// the (scaled) image and no annotations.
pub fn render_overlays(
    image: &RgbImage,
    faces: &[DetectedFace],
    style: &OverlayStyle,
) -> (RgbImage, Vec<FaceAnnotation>) {
    let scale = style.scale.max(1);
    let mut canvas = if scale == 1 {
        image.clone()
    } else {
        imageops::resize(
            image,
            image.width() * scale,
            image.height() * scale,
            FilterType::CatmullRom,
        )
    };

    let mut annotations = Vec::with_capacity(faces.len());
    for (index, face) in faces.iter().enumerate() {
        let label = format!("Face {}", index + 1);
        draw_face(&mut canvas, face, &label, scale, style);
        annotations.push(FaceAnnotation {
            label,
            rectangle: face.face_rectangle,
        });
    }

    (canvas, annotations)
}

fn draw_face(
    canvas: &mut RgbImage,
    face: &DetectedFace,
    label: &str,
    scale: u32,
    style: &OverlayStyle,
) {
    let rect = face.face_rectangle;
    if rect.width == 0 || rect.height == 0 {
        return;
    }

    draw_hollow_rect_mut(
        canvas,
        Rect::at((rect.left * scale) as i32, (rect.top * scale) as i32)
            .of_size(rect.width * scale, rect.height * scale),
        style.box_color,
    );

    if let Some(font) = &style.font {
        let size = 16.0 * scale as f32;
        // Label sits just above the box, or inside it at the top edge.
        let x = (rect.left * scale) as i32;
        let y = ((rect.top * scale) as i32 - size as i32).max(0);
        draw_text_mut(
            canvas,
            style.label_color,
            x,
            y,
            PxScale::from(size),
            font,
            label,
        );
    }

    if let Some(landmarks) = &face.face_landmarks {
        for point in landmarks.values() {
            let x = (point.x * scale as f64).round() as i64;
            let y = (point.y * scale as f64).round() as i64;
            if x >= 0 && y >= 0 && x < canvas.width() as i64 && y < canvas.height() as i64 {
                draw_cross_mut(canvas, style.marker_color, x as i32, y as i32);
            }
        }
    }
}
