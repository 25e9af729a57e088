//! Maps upstream failure codes to actionable guidance.
//!
//! The detection service reports failures with a machine code and a
//! message; the code is classified into a small fixed set so callers get
//! a stable suggestion string regardless of the exact message text.

/// Failure classes recognized in upstream responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    InvalidUrl,
    UnsupportedFormat,
    InvalidSize,
    MalformedRequest,
    Unauthorized,
    Unclassified,
}

/// Classify the service's machine code.
///
/// Credential failures arrive both as `"Unauthorized"` and as a bare
/// `"401"` depending on which gateway layer rejected the call; both are
/// recognized.
pub fn classify_code(code: &str) -> FailureKind {
    match code {
        "InvalidURL" => FailureKind::InvalidUrl,
        "InvalidImage" | "InvalidImageFormat" => FailureKind::UnsupportedFormat,
        "InvalidImageSize" => FailureKind::InvalidSize,
        "BadArgument" => FailureKind::MalformedRequest,
        "Unauthorized" | "InvalidSubscriptionKey" | "401" => FailureKind::Unauthorized,
        _ => FailureKind::Unclassified,
    }
}

/// Human guidance surfaced alongside the relayed service error.
pub fn suggestion_for(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::Network => {
            "Could not reach the detection service; check the endpoint URL and network connectivity."
        }
        FailureKind::InvalidUrl => {
            "Make sure the image URL is publicly reachable and points directly at an image file."
        }
        FailureKind::UnsupportedFormat => {
            "The image could not be decoded; supported formats are JPEG, PNG, GIF and BMP."
        }
        FailureKind::InvalidSize => "The image must be between 1 KB and 6 MB.",
        FailureKind::MalformedRequest => {
            "The request body was not understood; check the submitted fields."
        }
        FailureKind::Unauthorized => {
            "The service rejected the credential; check the configured subscription key and endpoint region."
        }
        FailureKind::Unclassified => {
            "The detection service reported an unexpected error; see the attached details."
        }
    }
}
