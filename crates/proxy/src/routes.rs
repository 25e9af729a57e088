//! Request handling for the proxy's three routes.
//!
//! Every failure is converted to a structured JSON response at this
//! boundary; nothing propagates to the connection loop as an error.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{header, Method, Request, Response, StatusCode};

use facelens_core::detection::payload::ImagePayload;
use facelens_core::detection::suggestion::{classify_code, suggestion_for, FailureKind};
use facelens_core::detection::wire::{parse_faces, DetectRequest, ErrorBody};
use facelens_core::shared::constants::SAMPLE_IMAGE_URL;

use crate::config::ProxyConfig;
use crate::upstream::{FaceClient, UpstreamError};

/// Shared per-process state: read-only configuration facts plus the
/// upstream client pool. Cloned per connection; nothing is locked.
#[derive(Clone, Debug)]
pub struct AppState {
    pub client: FaceClient,
    endpoint_configured: bool,
    key_configured: bool,
}

impl AppState {
    pub fn new(client: FaceClient, config: &ProxyConfig) -> Self {
        Self {
            client,
            endpoint_configured: !config.endpoint.trim().is_empty(),
            key_configured: !config.api_key.trim().is_empty(),
        }
    }
}

/// Route one request.
pub async fn handle(state: AppState, request: Request<Incoming>) -> Response<Full<Bytes>> {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = match (&method, path.as_str()) {
        (&Method::POST, "/api/detect-faces") => detect(state, request).await,
        (&Method::GET, "/api/health") => health(&state),
        (&Method::GET, "/api/test-azure") => connectivity_check(&state).await,
        _ => not_found(),
    };

    log::debug!("{method} {path} -> {}", response.status());
    response
}

async fn detect(state: AppState, request: Request<Incoming>) -> Response<Full<Bytes>> {
    let body = match request.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => return client_error(format!("could not read request body: {e}")),
    };

    let parsed: DetectRequest = match serde_json::from_slice(&body) {
        Ok(parsed) => parsed,
        Err(e) => return client_error(format!("request body is not valid JSON: {e}")),
    };

    // Local validation happens before anything is sent upstream;
    // rejected payloads never cost an external call.
    let payload =
        match ImagePayload::from_parts(parsed.image_url.as_deref(), parsed.image_data.as_deref()) {
            Ok(payload) => payload,
            Err(e) => return client_error(e.to_string()),
        };

    match state.client.detect(payload).await {
        Ok(raw) => {
            log::info!("detection relayed ({} bytes)", raw.len());
            json_response(StatusCode::OK, Bytes::from(raw))
        }
        Err(e) => upstream_failure(e),
    }
}

fn health(state: &AppState) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "status": "ok",
        "endpointConfigured": state.endpoint_configured,
        "keyConfigured": state.key_configured,
    });
    json_response(StatusCode::OK, Bytes::from(body.to_string()))
}

/// Canned detection against a public sample portrait: proves the
/// endpoint is reachable and the credential is accepted.
async fn connectivity_check(state: &AppState) -> Response<Full<Bytes>> {
    match state
        .client
        .detect(ImagePayload::RemoteUrl(SAMPLE_IMAGE_URL.to_string()))
        .await
    {
        Ok(raw) => {
            let face_count = parse_faces(&raw).map(|faces| faces.len()).unwrap_or(0);
            let body = serde_json::json!({ "success": true, "faceCount": face_count });
            json_response(StatusCode::OK, Bytes::from(body.to_string()))
        }
        Err(e) => upstream_failure(e),
    }
}

/// Normalize an upstream failure into the caller-facing envelope: the
/// best available status, the message, the machine code, a suggestion,
/// and the raw detail for diagnostics.
fn upstream_failure(err: UpstreamError) -> Response<Full<Bytes>> {
    match err {
        UpstreamError::Transport(e) => {
            log::warn!("upstream transport failure: {e}");
            error_response(
                StatusCode::BAD_GATEWAY,
                ErrorBody {
                    error: format!("could not reach the detection service: {e}"),
                    code: Some("NetworkError".to_string()),
                    suggestion: Some(suggestion_for(FailureKind::Network).to_string()),
                    details: None,
                },
            )
        }
        UpstreamError::Service {
            status,
            code,
            message,
            raw,
        } => {
            log::warn!("upstream rejected request: {status} {code} {message}");
            let kind = classify_code(&code);
            error_response(
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                ErrorBody {
                    error: if message.is_empty() {
                        "detection service error".to_string()
                    } else {
                        message
                    },
                    code: (!code.is_empty()).then_some(code),
                    suggestion: Some(suggestion_for(kind).to_string()),
                    details: Some(raw),
                },
            )
        }
    }
}

fn client_error(message: String) -> Response<Full<Bytes>> {
    log::info!("rejected request: {message}");
    error_response(
        StatusCode::BAD_REQUEST,
        ErrorBody {
            error: message,
            ..Default::default()
        },
    )
}

fn not_found() -> Response<Full<Bytes>> {
    error_response(
        StatusCode::NOT_FOUND,
        ErrorBody {
            error: "no such route".to_string(),
            ..Default::default()
        },
    )
}

fn error_response(status: StatusCode, body: ErrorBody) -> Response<Full<Bytes>> {
    let json = serde_json::to_string(&body).expect("error body always serializes");
    json_response(status, Bytes::from(json))
}

fn json_response(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(body))
        .expect("static response parts are valid")
}
