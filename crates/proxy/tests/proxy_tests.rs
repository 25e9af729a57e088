//! End-to-end tests against a real proxy instance and a scripted fake
//! detection service, both bound to loopback port 0.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use facelens_core::detection::wire::{parse_faces, DetectRequest, ErrorBody};
use facelens_core::shared::constants::{MAX_INLINE_IMAGE_BYTES, SAMPLE_IMAGE_URL};
use facelens_proxy::config::ProxyConfig;
use facelens_proxy::routes::AppState;
use facelens_proxy::server::ProxyServer;
use facelens_proxy::upstream::FaceClient;

const ONE_FACE: &str = r#"[{"faceRectangle":{"left":10,"top":20,"width":100,"height":120},"faceLandmarks":{"pupilLeft":{"x":41.2,"y":56.1}}}]"#;
const TWO_FACES: &str = r#"[{"faceRectangle":{"left":10,"top":20,"width":100,"height":120}},{"faceRectangle":{"left":200,"top":40,"width":60,"height":70}}]"#;

/// Scripted stand-in for the external detection service. Counts
/// connections and records every request it sees.
struct FakeService {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeService {
    fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn hit_count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn seen(&self) -> String {
        self.requests.lock().unwrap().join("\n---\n")
    }
}

async fn spawn_fake_service(status_line: &'static str, body: &'static str) -> FakeService {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().expect("local_addr failed");
    let hits = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));

    let hits_task = hits.clone();
    let requests_task = requests.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            hits_task.fetch_add(1, Ordering::SeqCst);
            let requests = requests_task.clone();
            tokio::spawn(async move {
                let request = read_http_request(&mut stream).await;
                requests.lock().unwrap().push(request);
                let response = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    FakeService {
        addr,
        hits,
        requests,
    }
}

/// Read one HTTP/1.1 request (head plus content-length body) as text.
async fn read_http_request(stream: &mut TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                data.extend_from_slice(&buf[..n]);
                if let Some(header_end) = find(&data, b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
                    let content_length = head
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            if name.eq_ignore_ascii_case("content-length") {
                                value.trim().parse::<usize>().ok()
                            } else {
                                None
                            }
                        })
                        .unwrap_or(0);
                    let total = header_end + 4 + content_length;
                    while data.len() < total {
                        match stream.read(&mut buf).await {
                            Ok(0) | Err(_) => break,
                            Ok(n) => data.extend_from_slice(&buf[..n]),
                        }
                    }
                    break;
                }
            }
        }
    }
    String::from_utf8_lossy(&data).to_string()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Start a proxy pointed at `endpoint`; returns its base URL.
async fn start_proxy(endpoint: String) -> String {
    let config = ProxyConfig::new(endpoint, "test-key")
        .with_upstream_timeout(Duration::from_secs(5));
    let client = FaceClient::new(&config.endpoint, &config.api_key, config.upstream_timeout)
        .expect("client build failed");
    let server = ProxyServer::bind("127.0.0.1:0", AppState::new(client, &config))
        .await
        .expect("proxy bind failed");
    let addr = server.local_addr().expect("local_addr failed");
    tokio::spawn(server.run());
    format!("http://{addr}")
}

async fn post_detect(proxy: &str, request: &DetectRequest) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{proxy}/api/detect-faces"))
        .json(request)
        .send()
        .await
        .expect("request failed")
}

#[tokio::test]
async fn test_url_detection_relays_upstream_body_verbatim() {
    let service = spawn_fake_service("200 OK", ONE_FACE).await;
    let proxy = start_proxy(service.endpoint()).await;

    let response = post_detect(
        &proxy,
        &DetectRequest::for_url("https://example.com/face.jpg"),
    )
    .await;

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert_eq!(body, ONE_FACE);
    assert_eq!(service.hit_count(), 1);

    let faces = parse_faces(&body).unwrap();
    assert_eq!(faces.len(), 1);
    assert_eq!(faces[0].face_rectangle.left, 10);
    assert_eq!(faces[0].face_rectangle.top, 20);
    assert_eq!(faces[0].face_rectangle.width, 100);
    assert_eq!(faces[0].face_rectangle.height, 120);
}

#[tokio::test]
async fn test_upstream_call_carries_credential_and_landmark_params() {
    let service = spawn_fake_service("200 OK", "[]").await;
    let proxy = start_proxy(service.endpoint()).await;

    post_detect(
        &proxy,
        &DetectRequest::for_url("https://example.com/face.jpg"),
    )
    .await;

    let seen = service.seen().to_lowercase();
    assert!(seen.contains("returnfacelandmarks=true"), "got:\n{seen}");
    assert!(seen.contains("returnfaceid=false"), "got:\n{seen}");
    assert!(
        seen.contains("ocp-apim-subscription-key: test-key"),
        "got:\n{seen}"
    );
    assert!(
        seen.contains(r#""url":"https://example.com/face.jpg""#),
        "got:\n{seen}"
    );
}

#[tokio::test]
async fn test_inline_payload_is_forwarded_as_raw_bytes() {
    let service = spawn_fake_service("200 OK", "[]").await;
    let proxy = start_proxy(service.endpoint()).await;

    let response = post_detect(
        &proxy,
        &DetectRequest::for_image_bytes(&vec![0x5Au8; 2048], "image/png"),
    )
    .await;

    assert_eq!(response.status(), 200);
    assert_eq!(service.hit_count(), 1);
    let seen = service.seen().to_lowercase();
    assert!(
        seen.contains("content-type: application/octet-stream"),
        "got:\n{seen}"
    );
    assert!(seen.contains("content-length: 2048"), "got:\n{seen}");
}

#[tokio::test]
async fn test_undersized_inline_is_rejected_without_upstream_call() {
    let service = spawn_fake_service("200 OK", "[]").await;
    let proxy = start_proxy(service.endpoint()).await;

    let response = post_detect(
        &proxy,
        &DetectRequest::for_image_bytes(&[0u8; 512], "image/png"),
    )
    .await;

    assert_eq!(response.status(), 400);
    let error: ErrorBody = response.json().await.unwrap();
    assert!(error.error.contains("1 KB"), "got: {}", error.error);
    assert_eq!(service.hit_count(), 0);
}

#[tokio::test]
async fn test_oversized_inline_is_rejected_without_upstream_call() {
    let service = spawn_fake_service("200 OK", "[]").await;
    let proxy = start_proxy(service.endpoint()).await;

    let response = post_detect(
        &proxy,
        &DetectRequest::for_image_bytes(&vec![0u8; MAX_INLINE_IMAGE_BYTES + 1], "image/png"),
    )
    .await;

    assert_eq!(response.status(), 400);
    let error: ErrorBody = response.json().await.unwrap();
    assert!(error.error.contains("6 MB"), "got: {}", error.error);
    assert_eq!(service.hit_count(), 0);
}

#[tokio::test]
async fn test_both_sources_are_rejected_without_upstream_call() {
    let service = spawn_fake_service("200 OK", "[]").await;
    let proxy = start_proxy(service.endpoint()).await;

    let mut request = DetectRequest::for_url("https://example.com/face.jpg");
    request.image_data = DetectRequest::for_image_bytes(&[0u8; 2048], "image/png").image_data;
    let response = post_detect(&proxy, &request).await;

    assert_eq!(response.status(), 400);
    let error: ErrorBody = response.json().await.unwrap();
    assert!(error.error.contains("exactly one"), "got: {}", error.error);
    assert_eq!(service.hit_count(), 0);
}

#[tokio::test]
async fn test_empty_body_is_rejected_without_upstream_call() {
    let service = spawn_fake_service("200 OK", "[]").await;
    let proxy = start_proxy(service.endpoint()).await;

    let response = post_detect(&proxy, &DetectRequest::default()).await;

    assert_eq!(response.status(), 400);
    let error: ErrorBody = response.json().await.unwrap();
    assert!(
        error.error.contains("either imageUrl or imageData"),
        "got: {}",
        error.error
    );
    assert_eq!(service.hit_count(), 0);
}

#[tokio::test]
async fn test_non_json_body_is_a_client_error() {
    let service = spawn_fake_service("200 OK", "[]").await;
    let proxy = start_proxy(service.endpoint()).await;

    let response = reqwest::Client::new()
        .post(format!("{proxy}/api/detect-faces"))
        .header("content-type", "application/json")
        .body("this is not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    assert_eq!(service.hit_count(), 0);
}

#[tokio::test]
async fn test_unauthorized_upstream_maps_to_credential_suggestion() {
    let service = spawn_fake_service(
        "401 Unauthorized",
        r#"{"error":{"code":"Unauthorized","message":"Access denied due to invalid subscription key."}}"#,
    )
    .await;
    let proxy = start_proxy(service.endpoint()).await;

    let response = post_detect(
        &proxy,
        &DetectRequest::for_url("https://example.com/face.jpg"),
    )
    .await;

    assert_eq!(response.status(), 401);
    let error: ErrorBody = response.json().await.unwrap();
    assert_eq!(error.code.as_deref(), Some("Unauthorized"));
    assert!(
        error.suggestion.as_deref().unwrap().contains("subscription key"),
        "got: {:?}",
        error.suggestion
    );
    assert!(error.error.contains("Access denied"));
    assert!(error.details.as_deref().unwrap().contains("Unauthorized"));
}

#[tokio::test]
async fn test_invalid_url_code_maps_to_url_suggestion() {
    let service = spawn_fake_service(
        "400 Bad Request",
        r#"{"error":{"code":"InvalidURL","message":"Invalid image URL."}}"#,
    )
    .await;
    let proxy = start_proxy(service.endpoint()).await;

    let response = post_detect(&proxy, &DetectRequest::for_url("https://bad.example/x")).await;

    assert_eq!(response.status(), 400);
    let error: ErrorBody = response.json().await.unwrap();
    assert_eq!(error.code.as_deref(), Some("InvalidURL"));
    assert!(error.suggestion.as_deref().unwrap().contains("URL"));
}

#[tokio::test]
async fn test_unreachable_upstream_is_a_bad_gateway() {
    // Bind and immediately drop to get a port nothing listens on.
    let doomed = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}", doomed.local_addr().unwrap());
    drop(doomed);

    let proxy = start_proxy(endpoint).await;
    let response = post_detect(
        &proxy,
        &DetectRequest::for_url("https://example.com/face.jpg"),
    )
    .await;

    assert_eq!(response.status(), 502);
    let error: ErrorBody = response.json().await.unwrap();
    assert_eq!(error.code.as_deref(), Some("NetworkError"));
    assert!(error.suggestion.is_some());
}

#[tokio::test]
async fn test_health_reports_configuration_presence() {
    let service = spawn_fake_service("200 OK", "[]").await;
    let proxy = start_proxy(service.endpoint()).await;

    let response = reqwest::get(format!("{proxy}/api/health")).await.unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["endpointConfigured"], true);
    assert_eq!(body["keyConfigured"], true);
    // Health never touches the upstream.
    assert_eq!(service.hit_count(), 0);
}

#[tokio::test]
async fn test_connectivity_check_counts_faces_from_sample_image() {
    let service = spawn_fake_service("200 OK", TWO_FACES).await;
    let proxy = start_proxy(service.endpoint()).await;

    let response = reqwest::get(format!("{proxy}/api/test-azure")).await.unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["faceCount"], 2);

    let seen = service.seen();
    assert!(seen.contains(SAMPLE_IMAGE_URL), "got:\n{seen}");
}

#[tokio::test]
async fn test_connectivity_check_relays_upstream_failure() {
    let service = spawn_fake_service(
        "401 Unauthorized",
        r#"{"error":{"code":"Unauthorized","message":"Access denied."}}"#,
    )
    .await;
    let proxy = start_proxy(service.endpoint()).await;

    let response = reqwest::get(format!("{proxy}/api/test-azure")).await.unwrap();
    assert_eq!(response.status(), 401);
    let error: ErrorBody = response.json().await.unwrap();
    assert!(error.suggestion.as_deref().unwrap().contains("subscription key"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let service = spawn_fake_service("200 OK", "[]").await;
    let proxy = start_proxy(service.endpoint()).await;

    let response = reqwest::get(format!("{proxy}/api/nope")).await.unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_concurrent_requests_are_all_served() {
    let service = spawn_fake_service("200 OK", ONE_FACE).await;
    let proxy = start_proxy(service.endpoint()).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let proxy = proxy.clone();
        handles.push(tokio::spawn(async move {
            post_detect(
                &proxy,
                &DetectRequest::for_url("https://example.com/face.jpg"),
            )
            .await
            .status()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), 200);
    }
    assert_eq!(service.hit_count(), 8);
}
