//! Allow-listed image media types.

use std::fmt;

use crate::error::{MockupError, Result};

/// The only image formats accepted as references or returned as results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Png,
    Jpeg,
    Webp,
}

impl MediaType {
    /// Canonical MIME string (e.g. `image/png`).
    pub fn mime_type(self) -> &'static str {
        match self {
            MediaType::Png => "image/png",
            MediaType::Jpeg => "image/jpeg",
            MediaType::Webp => "image/webp",
        }
    }

    /// File extension used when exporting an image of this type.
    pub fn extension(self) -> &'static str {
        match self {
            MediaType::Png => "png",
            MediaType::Jpeg => "jpg",
            MediaType::Webp => "webp",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Maps a declared MIME type onto the allow-list.
///
/// Matching ignores case, surrounding whitespace and MIME parameters
/// (`image/png; charset=binary`). `image/jpg` is accepted as an alias of
/// `image/jpeg`.
///
/// # Errors
/// Returns [`MockupError::UnsupportedMediaType`] for anything outside
/// png/jpeg/webp, including an empty string.
pub fn classify_media_type(declared: &str) -> Result<MediaType> {
    let essence = declared
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "image/png" => Ok(MediaType::Png),
        "image/jpeg" | "image/jpg" => Ok(MediaType::Jpeg),
        "image/webp" => Ok(MediaType::Webp),
        _ => Err(MockupError::UnsupportedMediaType(declared.trim().to_string())),
    }
}

/// Detects the media type from magic bytes, restricted to the allow-list.
pub fn sniff_media_type(bytes: &[u8]) -> Option<MediaType> {
    let kind = infer::get(bytes)?;
    classify_media_type(kind.mime_type()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn classify_accepts_allow_listed_types() {
        assert_eq!(classify_media_type("image/png").unwrap(), MediaType::Png);
        assert_eq!(classify_media_type("image/jpeg").unwrap(), MediaType::Jpeg);
        assert_eq!(classify_media_type("image/webp").unwrap(), MediaType::Webp);
    }

    #[test]
    fn classify_normalizes_case_whitespace_and_params() {
        assert_eq!(
            classify_media_type("  IMAGE/PNG ; charset=binary").unwrap(),
            MediaType::Png
        );
        assert_eq!(classify_media_type("image/jpg").unwrap(), MediaType::Jpeg);
    }

    #[test]
    fn classify_rejects_everything_else() {
        for declared in ["image/gif", "image/svg+xml", "application/pdf", "", "png"] {
            let err = classify_media_type(declared).unwrap_err();
            assert!(
                matches!(err, MockupError::UnsupportedMediaType(ref t) if t == declared),
                "{declared} -> {err:?}"
            );
        }
    }

    #[test]
    fn canonical_mime_round_trips_through_classify() {
        for media_type in [MediaType::Png, MediaType::Jpeg, MediaType::Webp] {
            assert_eq!(
                classify_media_type(media_type.mime_type()).unwrap(),
                media_type
            );
        }
    }

    #[test]
    fn sniff_detects_png_and_ignores_gif() {
        assert_eq!(sniff_media_type(PNG_MAGIC), Some(MediaType::Png));
        assert_eq!(sniff_media_type(b"GIF89a\x01\x00\x01\x00"), None);
        assert_eq!(sniff_media_type(b"not an image"), None);
    }
}
