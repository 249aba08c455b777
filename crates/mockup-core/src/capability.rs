//! External image-generation capability.
//!
//! Generate and edit are two variants of one request type so the controller
//! handles success and failure the same way for both.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::images::{EncodedPayload, MediaType};
use crate::session::GeneratedImage;

/// A single-shot, non-streaming request to the image service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRequest {
    /// Create a mockup from a reference logo and a product description.
    Generate {
        reference: EncodedPayload,
        description: String,
    },
    /// Transform the current image according to an instruction.
    Edit {
        current: EncodedPayload,
        instruction: String,
    },
}

impl ImageRequest {
    /// The image sent along with the request.
    pub fn image(&self) -> &EncodedPayload {
        match self {
            ImageRequest::Generate { reference, .. } => reference,
            ImageRequest::Edit { current, .. } => current,
        }
    }

    pub fn media_type(&self) -> MediaType {
        self.image().media_type
    }

    /// The free-text part of the request.
    pub fn text(&self) -> &str {
        match self {
            ImageRequest::Generate { description, .. } => description,
            ImageRequest::Edit { instruction, .. } => instruction,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ImageRequest::Generate { .. } => "generate",
            ImageRequest::Edit { .. } => "edit",
        }
    }
}

/// Failure reported by the capability, with an optional human-readable message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityFailure {
    pub message: Option<String>,
}

impl CapabilityFailure {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        let trimmed = message.trim();
        Self {
            message: (!trimmed.is_empty()).then(|| trimmed.to_string()),
        }
    }

    /// A failure that carries no description.
    pub fn silent() -> Self {
        Self { message: None }
    }

    /// The message to show, or `fallback` when the failure has none.
    pub fn message_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.message.as_deref().unwrap_or(fallback)
    }
}

impl fmt::Display for CapabilityFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message_or("Image service request failed"))
    }
}

impl std::error::Error for CapabilityFailure {}

impl From<anyhow::Error> for CapabilityFailure {
    fn from(error: anyhow::Error) -> Self {
        Self::new(format!("{error:#}"))
    }
}

/// Async capability result.
pub type CapabilityFuture<'a> =
    Pin<Box<dyn Future<Output = Result<GeneratedImage, CapabilityFailure>> + Send + 'a>>;

/// The external "create image" / "edit image" service.
pub trait ImageCapability: Send + Sync {
    fn invoke<'a>(&'a self, request: &'a ImageRequest) -> CapabilityFuture<'a>;
}

impl<T: ImageCapability + ?Sized> ImageCapability for std::sync::Arc<T> {
    fn invoke<'a>(&'a self, request: &'a ImageRequest) -> CapabilityFuture<'a> {
        (**self).invoke(request)
    }
}
