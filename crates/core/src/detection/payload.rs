//! Image payload resolution and validation.
//!
//! A detection request carries exactly one of two transport forms: a
//! remote URL forwarded unchanged, or inline base64 bytes (optionally a
//! full `data:` URL) that are decoded and bounds-checked here, before
//! anything is sent upstream.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

use crate::shared::constants::{MAX_INLINE_IMAGE_BYTES, MIN_INLINE_IMAGE_BYTES};

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("request must carry either imageUrl or imageData")]
    MissingSource,
    #[error("request carries both imageUrl and imageData; send exactly one")]
    AmbiguousSource,
    #[error("imageData is not valid base64: {0}")]
    BadEncoding(#[source] base64::DecodeError),
    #[error(
        "image is {actual} bytes; the detection service requires at least {min} bytes (1 KB)",
        min = MIN_INLINE_IMAGE_BYTES
    )]
    TooSmall { actual: usize },
    #[error(
        "image is {actual} bytes; the detection service accepts at most {max} bytes (6 MB)",
        max = MAX_INLINE_IMAGE_BYTES
    )]
    TooLarge { actual: usize },
}

/// A validated detection input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImagePayload {
    /// Dereferenceable remote image URL, forwarded unchanged.
    RemoteUrl(String),
    /// Decoded inline image bytes, already within the accepted size range.
    InlineBytes(Vec<u8>),
}

impl ImagePayload {
    /// Resolve the two optional request fields into exactly one payload.
    ///
    /// Both-present is rejected the same way as neither-present; the
    /// ambiguity must never reach the upstream service.
    pub fn from_parts(
        image_url: Option<&str>,
        image_data: Option<&str>,
    ) -> Result<Self, PayloadError> {
        match (image_url, image_data) {
            (Some(_), Some(_)) => Err(PayloadError::AmbiguousSource),
            (None, None) => Err(PayloadError::MissingSource),
            (Some(url), None) => Ok(ImagePayload::RemoteUrl(url.to_owned())),
            (None, Some(data)) => decode_inline(data).map(ImagePayload::InlineBytes),
        }
    }
}

/// Strip any `data:` prefix, base64-decode, and check the size bounds.
pub fn decode_inline(data: &str) -> Result<Vec<u8>, PayloadError> {
    let bytes = STANDARD
        .decode(strip_data_url_prefix(data).trim())
        .map_err(PayloadError::BadEncoding)?;
    if bytes.len() < MIN_INLINE_IMAGE_BYTES {
        return Err(PayloadError::TooSmall {
            actual: bytes.len(),
        });
    }
    if bytes.len() > MAX_INLINE_IMAGE_BYTES {
        return Err(PayloadError::TooLarge {
            actual: bytes.len(),
        });
    }
    Ok(bytes)
}

/// Inline encoding as capture clients send it: a data URL that
/// [`decode_inline`] strips back down.
pub fn encode_inline(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// `data:image/png;base64,AAAA` → `AAAA`; anything without the scheme
/// prefix is returned unchanged.
fn strip_data_url_prefix(data: &str) -> &str {
    if !data.starts_with("data:") {
        return data;
    }
    match data.find(',') {
        Some(comma) => &data[comma + 1..],
        None => data,
    }
}
