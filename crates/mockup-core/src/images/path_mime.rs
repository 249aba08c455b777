//! Path normalization + declared MIME helpers for user-selected files.

use std::path::{Path, PathBuf};

/// Declared type used when the extension says nothing about the content.
pub const UNKNOWN_MIME_TYPE: &str = "application/octet-stream";

/// Normalizes user-provided file paths.
///
/// Handles common drag-and-drop shell escaping (`\ `, `\(`, `\)`) and
/// expands `~/` to the HOME directory when available.
#[must_use]
pub fn normalize_input_path(path: &str) -> PathBuf {
    let unescaped = path
        .trim()
        .replace("\\ ", " ")
        .replace("\\(", "(")
        .replace("\\)", ")");

    if let Some(rest) = unescaped.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }

    PathBuf::from(unescaped)
}

/// Returns the MIME type a file picker would declare for this extension.
///
/// Includes formats outside the allow-list, so a `.gif` is declared as
/// `image/gif` and rejected by classification.
#[must_use]
pub fn mime_type_for_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension().and_then(|e| e.to_str())?;

    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

/// Declared type for a path, falling back to [`UNKNOWN_MIME_TYPE`].
#[must_use]
pub fn declared_type_for_path(path: &Path) -> &'static str {
    mime_type_for_extension(path).unwrap_or(UNKNOWN_MIME_TYPE)
}
