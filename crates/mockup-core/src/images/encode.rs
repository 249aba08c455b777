//! Base64 encoding of user-selected reference images.

use std::borrow::Cow;
use std::path::Path;

use base64::Engine;

use crate::error::{MockupError, Result};
use crate::images::media_type::{MediaType, classify_media_type};
use crate::session::{SourceContent, SourceFile};

/// Max reference image size.
pub const MAX_SOURCE_BYTES: u64 = 20 * 1024 * 1024;

/// Base64 image data tagged with an allow-listed media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    pub data: String,
    pub media_type: MediaType,
}

impl EncodedPayload {
    pub fn new(data: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            data: data.into(),
            media_type,
        }
    }

    /// Classifies the declared type, then reads and encodes the file.
    ///
    /// An unsupported file is rejected without being read.
    ///
    /// # Errors
    /// Returns `UnsupportedMediaType` or one of the read errors.
    pub async fn derive(file: &SourceFile) -> Result<Self> {
        let media_type = classify_media_type(file.declared_type())?;
        let data = encode(file).await?;
        Ok(Self { data, media_type })
    }

    /// Decodes the base64 data back to raw bytes.
    ///
    /// # Errors
    /// Returns an error if `data` is not valid standard base64.
    pub fn decode(&self) -> std::result::Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(&self.data)
    }
}

/// Reads the full contents of `file` and returns them as standard base64.
///
/// # Errors
/// Returns `Read` if the file cannot be read, `TooLarge` above
/// [`MAX_SOURCE_BYTES`] and `EmptyFile` when there is nothing to encode.
pub async fn encode(file: &SourceFile) -> Result<String> {
    let bytes: Cow<'_, [u8]> = match file.content() {
        SourceContent::Path(path) => Cow::Owned(read_source(path).await?),
        SourceContent::Bytes(bytes) => {
            ensure_within_limit(bytes.len() as u64)?;
            Cow::Borrowed(bytes)
        }
    };

    if bytes.is_empty() {
        return Err(MockupError::EmptyFile);
    }

    tracing::debug!(name = file.name(), bytes = bytes.len(), "encoded source image");
    Ok(base64::engine::general_purpose::STANDARD.encode(&bytes))
}

async fn read_source(path: &Path) -> Result<Vec<u8>> {
    let read_error = |source| MockupError::Read {
        path: path.to_path_buf(),
        source,
    };

    let metadata = tokio::fs::metadata(path).await.map_err(read_error)?;
    ensure_within_limit(metadata.len())?;

    let data = tokio::fs::read(path).await.map_err(read_error)?;
    // The file may have grown between the two calls.
    ensure_within_limit(data.len() as u64)?;
    Ok(data)
}

fn ensure_within_limit(size: u64) -> Result<()> {
    if size > MAX_SOURCE_BYTES {
        return Err(MockupError::TooLarge {
            size,
            limit: MAX_SOURCE_BYTES,
        });
    }
    Ok(())
}
