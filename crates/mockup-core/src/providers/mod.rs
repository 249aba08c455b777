//! Image service providers.

pub mod gemini;
pub mod shared;

pub use shared::{ProviderError, ProviderErrorKind};
