//! Payload decoding and content classification
//!
//! Documents arrive from the host as base64 text. Classification looks at
//! the encoded text itself: the first characters of a base64 stream are a
//! stable transform of the underlying magic bytes, so the payload can be
//! categorized before spending any time decoding it.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use log::debug;
use thiserror::Error;

/// Decode chunk size in base64 characters. Multiple of 4 so every chunk
/// boundary falls on a whole encoded group.
const DECODE_CHUNK_CHARS: usize = 64 * 1024;

/// What kind of document a payload holds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentCategory {
    Pdf,
    Jpeg,
    Png,
    Gif,
    Webp,
}

/// Base64 text prefixes and the category they identify, in match priority
/// order. Checked against the encoded text, not the decoded bytes.
const MAGIC_PREFIXES: [(&str, ContentCategory); 5] = [
    ("JVBER", ContentCategory::Pdf),
    ("/9j/", ContentCategory::Jpeg),
    ("iVBOR", ContentCategory::Png),
    ("R0lGO", ContentCategory::Gif),
    ("UklGR", ContentCategory::Webp),
];

impl ContentCategory {
    /// Returns true for categories with multiple pages to track
    pub fn is_paginated(self) -> bool {
        matches!(self, Self::Pdf)
    }

    /// MIME type for the category
    pub fn mime(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }

    /// Canonical file extension, without the dot
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }

    /// Short label for status lines
    pub fn label(self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::Gif => "GIF",
            Self::Webp => "WEBP",
        }
    }
}

/// Decoded document bytes. Produced once per load and consumed exactly
/// once when published to a resource host.
#[derive(Debug, PartialEq, Eq)]
pub struct RawPayload(Vec<u8>);

impl RawPayload {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Payload could not be decoded from base64
#[derive(Debug, Error)]
#[error("invalid base64 payload: {0}")]
pub struct DecodeError(#[from] base64::DecodeError);

/// Classify a base64 payload by its text prefix.
///
/// First matching prefix wins; anything unrecognized is treated as PDF,
/// which matches how hosts label embedded documents by default.
pub fn detect_category(base64_text: &str) -> ContentCategory {
    for (magic, category) in MAGIC_PREFIXES {
        if base64_text.starts_with(magic) {
            return category;
        }
    }
    ContentCategory::Pdf
}

/// Decode a base64 payload and classify it.
///
/// Decoding walks the text in fixed-size chunks appended into a single
/// buffer, so peak memory stays near the decoded size even for
/// multi-megabyte documents. Whitespace is not tolerated; hosts send the
/// raw encoded stream.
pub fn decode(base64_text: &str) -> Result<(RawPayload, ContentCategory), DecodeError> {
    let category = detect_category(base64_text);
    let text = base64_text.as_bytes();
    let mut bytes = Vec::with_capacity(text.len() / 4 * 3);
    for chunk in text.chunks(DECODE_CHUNK_CHARS) {
        STANDARD.decode_vec(chunk, &mut bytes)?;
    }
    debug!(
        "decoded payload: {} chars -> {} bytes, category {:?}",
        text.len(),
        bytes.len(),
        category
    );
    Ok((RawPayload(bytes), category))
}
