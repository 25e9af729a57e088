use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in source-image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRectangle {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRectangle {
    /// First column to the right of the box.
    pub fn right(&self) -> u32 {
        self.left + self.width
    }

    /// First row below the box.
    pub fn bottom(&self) -> u32 {
        self.top + self.height
    }
}

/// A single named anatomical point in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f64,
    pub y: f64,
}

/// One face as reported by the external detection service.
///
/// Faces are ephemeral: no identifier is requested, and nothing
/// correlates faces across calls.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedFace {
    pub face_rectangle: FaceRectangle,
    /// Landmark names are service-defined (`pupilLeft`, `noseTip`, ...).
    /// Kept as an ordered map so names this crate has never heard of
    /// still round-trip and render.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_landmarks: Option<BTreeMap<String, LandmarkPoint>>,
}
