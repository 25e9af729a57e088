//! Outbound leg: the actual calls to the external detection service.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use facelens_core::detection::payload::ImagePayload;
use facelens_core::shared::constants::DETECT_QUERY;

/// Header carrying the service credential.
pub const CREDENTIAL_HEADER: &str = "Ocp-Apim-Subscription-Key";

#[derive(Error, Debug)]
pub enum UpstreamError {
    /// The service could not be reached at all (DNS, refused, timeout).
    #[error("could not reach the detection service: {0}")]
    Transport(#[source] reqwest::Error),
    /// The service answered with an error status, usually a JSON body.
    #[error("detection service returned {status}: {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
        raw: String,
    },
}

/// Wire shape of the service's error body:
/// `{"error": {"code": "...", "message": "..."}}`.
#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    error: ServiceErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ServiceErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Client for the detection endpoint. Cheap to clone: it holds only the
/// connection pool, the resolved URL, and the credential.
#[derive(Clone)]
pub struct FaceClient {
    http: reqwest::Client,
    detect_url: String,
    api_key: String,
}

impl FaceClient {
    /// Build the client with its bounded request timeout. A hung
    /// service surfaces as [`UpstreamError::Transport`] instead of an
    /// indefinite hang.
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            detect_url: format!(
                "{}/face/v1.0/detect?{}",
                endpoint.trim_end_matches('/'),
                DETECT_QUERY
            ),
            api_key: api_key.to_string(),
        })
    }

    /// Full URL detection calls are posted to.
    pub fn detect_url(&self) -> &str {
        &self.detect_url
    }

    /// Submit one payload and return the service's raw JSON array, kept
    /// verbatim so the caller can relay it untouched.
    pub async fn detect(&self, payload: ImagePayload) -> Result<String, UpstreamError> {
        let request = match payload {
            ImagePayload::RemoteUrl(url) => self
                .http
                .post(&self.detect_url)
                .header(CREDENTIAL_HEADER, &self.api_key)
                .json(&serde_json::json!({ "url": url })),
            ImagePayload::InlineBytes(bytes) => self
                .http
                .post(&self.detect_url)
                .header(CREDENTIAL_HEADER, &self.api_key)
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(bytes),
        };

        let response = request.send().await.map_err(UpstreamError::Transport)?;
        let status = response.status();
        let body = response.text().await.map_err(UpstreamError::Transport)?;

        if status.is_success() {
            return Ok(body);
        }

        let (code, message) = parse_service_error(&body);
        Err(UpstreamError::Service {
            status: status.as_u16(),
            code,
            message,
            raw: body,
        })
    }
}

impl std::fmt::Debug for FaceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaceClient")
            .field("detect_url", &self.detect_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Pull code and message out of the error body, tolerating bodies that
/// are not the documented JSON shape.
fn parse_service_error(body: &str) -> (String, String) {
    match serde_json::from_str::<ServiceErrorBody>(body) {
        Ok(parsed) => (parsed.error.code, parsed.error.message),
        Err(_) => (String::new(), body.trim().to_string()),
    }
}
