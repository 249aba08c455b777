//! Core mockup library (encoding, lifecycle controller, providers, config).

pub mod capability;
pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod images;
pub mod prompts;
pub mod providers;
pub mod session;

pub use capability::{CapabilityFailure, CapabilityFuture, ImageCapability, ImageRequest};
pub use controller::LifecycleController;
pub use error::{MockupError, Result};
pub use images::{EncodedPayload, MediaType};
pub use session::{GeneratedImage, RequestStatus, SessionSnapshot, SourceFile};
