//! Saving the authoritative image to disk.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::images::path_mime::mime_type_for_extension;
use crate::images::{MediaType, classify_media_type};
use crate::session::GeneratedImage;

/// Fixed file name for a saved mockup: `<stem>.<ext>`.
pub fn default_file_name(stem: &str, media_type: MediaType) -> String {
    format!("{stem}.{}", media_type.extension())
}

/// Resolves where to save an image.
///
/// - no `out`: `root/<stem>.<ext>`
/// - `out` is an existing directory: `out/<stem>.<ext>`
/// - otherwise `out` itself, relative paths resolved against `root`
///
/// An explicit file name gets the extension of `media_type` when it has none
/// or names a different image format.
pub fn resolve_output_path(
    root: &Path,
    out: Option<&str>,
    stem: &str,
    media_type: MediaType,
) -> PathBuf {
    let file_name = default_file_name(stem, media_type);
    let Some(out) = out.map(str::trim).filter(|v| !v.is_empty()) else {
        return root.join(file_name);
    };

    let path = PathBuf::from(out);
    let path = if path.is_absolute() {
        path
    } else {
        root.join(path)
    };

    if path.is_dir() {
        path.join(file_name)
    } else {
        with_media_extension(path, media_type)
    }
}

fn with_media_extension(path: PathBuf, media_type: MediaType) -> PathBuf {
    if path.extension().is_none() {
        return path.with_extension(media_type.extension());
    }

    let Some(mime) = mime_type_for_extension(&path) else {
        return path;
    };
    match classify_media_type(mime) {
        Ok(declared) if declared == media_type => path,
        _ => {
            let renamed = path.with_extension(media_type.extension());
            tracing::warn!(
                requested = %path.display(),
                saved = %renamed.display(),
                %media_type,
                "output extension does not match the image type"
            );
            renamed
        }
    }
}

/// Decodes the image and writes it to `path`, creating parent directories.
///
/// # Errors
/// Returns an error if the payload is not valid base64 or the file cannot be written.
pub fn save_image(image: &GeneratedImage, path: &Path) -> Result<()> {
    let bytes = image
        .payload
        .decode()
        .context("decode generated image payload")?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create output directory '{}'", parent.display()))?;
    }

    let tmp_path = path.with_extension(format!("{}.tmp", media_extension(path)));
    fs::write(&tmp_path, &bytes)
        .with_context(|| format!("write image to '{}'", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("write image to '{}'", path.display()))?;

    tracing::info!(path = %path.display(), bytes = bytes.len(), "saved mockup");
    Ok(())
}

fn media_extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("img")
}
