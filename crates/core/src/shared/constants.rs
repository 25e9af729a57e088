/// Smallest inline image the detection service accepts (1 KiB).
pub const MIN_INLINE_IMAGE_BYTES: usize = 1024;

/// Largest inline image the detection service accepts (6 MiB).
pub const MAX_INLINE_IMAGE_BYTES: usize = 6 * 1024 * 1024;

/// Query string sent with every detection call: geometric landmarks only.
/// Face identifiers and attribute recognition need elevated service
/// authorization and are never requested.
pub const DETECT_QUERY: &str = "returnFaceId=false&returnFaceLandmarks=true";

/// Public sample portrait used by the proxy's connectivity check.
pub const SAMPLE_IMAGE_URL: &str =
    "https://raw.githubusercontent.com/Microsoft/Cognitive-Face-Windows/master/Data/detection1.jpg";

/// Default listen address for the detection proxy.
pub const DEFAULT_PROXY_ADDR: &str = "127.0.0.1:8787";

/// Ceiling for one upstream detection call, in seconds.
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;
