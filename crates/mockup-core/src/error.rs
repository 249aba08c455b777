//! Error taxonomy for the image-request lifecycle.

use std::path::PathBuf;

use crate::capability::CapabilityFailure;

pub type Result<T, E = MockupError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum MockupError {
    /// A required input was missing before a request could be issued.
    #[error("{0}")]
    Validation(String),

    #[error("Unsupported media type '{0}'. Use a PNG, JPEG or WEBP image.")]
    UnsupportedMediaType(String),

    #[error("Cannot read image {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image too large ({size} bytes, max {limit} bytes)")]
    TooLarge { size: u64, limit: u64 },

    #[error("Image file is empty")]
    EmptyFile,

    #[error(transparent)]
    Capability(#[from] CapabilityFailure),

    /// Another generate/edit request is still in flight.
    #[error("A request is already in progress")]
    Busy,
}

impl MockupError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns true for failures of the underlying read (`ReadError` family).
    pub fn is_read_error(&self) -> bool {
        matches!(
            self,
            Self::Read { .. } | Self::TooLarge { .. } | Self::EmptyFile
        )
    }
}
