//! Request and response bodies exchanged with the detection proxy.

use serde::{Deserialize, Serialize};

use super::face::DetectedFace;
use super::payload;

/// Body of `POST /api/detect-faces`. Exactly one field must be set;
/// [`super::payload::ImagePayload::from_parts`] enforces that on the
/// receiving side.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
}

impl DetectRequest {
    /// Request carrying a remote URL, forwarded to the service unchanged.
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            image_url: Some(url.into()),
            image_data: None,
        }
    }

    /// Request carrying inline bytes, encoded the way capture clients
    /// send them: a base64 data URL.
    pub fn for_image_bytes(bytes: &[u8], mime: &str) -> Self {
        Self {
            image_url: None,
            image_data: Some(payload::encode_inline(bytes, mime)),
        }
    }
}

/// Error envelope the proxy returns on every failure path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Parse a successful detection response into faces.
pub fn parse_faces(body: &str) -> serde_json::Result<Vec<DetectedFace>> {
    serde_json::from_str(body)
}
