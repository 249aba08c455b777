//! Gemini image provider.

pub mod api;

pub use api::{DEFAULT_IMAGE_MODEL, GeminiClient, GeminiConfig, GeminiImageOptions};
