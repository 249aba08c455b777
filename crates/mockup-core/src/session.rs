//! Single-session state owned by the lifecycle controller.
//!
//! ```text
//! Session
//! ├── source: Option<SourceFile>        (reference logo, replaced wholesale)
//! ├── description: String               (product description)
//! ├── image: Option<GeneratedImage>     (authoritative result, no history)
//! ├── edit_instruction: String          (cleared after a successful edit)
//! ├── status: RequestStatus
//! └── error: Option<String>             (cleared when a request starts)
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::images::EncodedPayload;
use crate::images::path_mime::declared_type_for_path;

/// Where the bytes of a [`SourceFile`] come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceContent {
    /// Read lazily when the payload is encoded.
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// A user-selected reference image and its declared media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    name: String,
    declared_type: String,
    content: SourceContent,
}

impl SourceFile {
    pub fn from_path(path: impl Into<PathBuf>, declared_type: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: display_name(&path),
            declared_type: declared_type.into(),
            content: SourceContent::Path(path),
        }
    }

    /// Like [`SourceFile::from_path`], declaring the type from the extension.
    pub fn from_path_guess(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let declared = declared_type_for_path(&path);
        Self::from_path(path, declared)
    }

    pub fn from_bytes(
        name: impl Into<String>,
        bytes: Vec<u8>,
        declared_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            content: SourceContent::Bytes(bytes),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> &str {
        &self.declared_type
    }

    pub fn content(&self) -> &SourceContent {
        &self.content
    }
}

fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

/// The authoritative generated (or edited) image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub payload: EncodedPayload,
    /// Text the model returned alongside the image, if any.
    pub commentary: Option<String>,
}

impl GeneratedImage {
    pub fn new(payload: EncodedPayload) -> Self {
        Self {
            payload,
            commentary: None,
        }
    }

    #[must_use]
    pub fn with_commentary(mut self, commentary: Option<String>) -> Self {
        self.commentary = commentary;
        self
    }
}

/// Request lifecycle status. Exactly one value at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestStatus {
    #[default]
    Idle,
    Generating,
    Editing,
    Success,
    Error,
}

impl RequestStatus {
    /// Returns true while a generate or edit request is outstanding.
    pub fn is_in_flight(self) -> bool {
        matches!(self, RequestStatus::Generating | RequestStatus::Editing)
    }

    pub fn label(self) -> &'static str {
        match self {
            RequestStatus::Idle => "idle",
            RequestStatus::Generating => "generating",
            RequestStatus::Editing => "editing",
            RequestStatus::Success => "success",
            RequestStatus::Error => "error",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Default)]
pub(crate) struct Session {
    pub source: Option<Arc<SourceFile>>,
    pub description: String,
    pub image: Option<GeneratedImage>,
    pub edit_instruction: String,
    pub status: RequestStatus,
    pub error: Option<String>,
}

impl Session {
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            source_name: self.source.as_ref().map(|s| s.name().to_string()),
            description: self.description.clone(),
            image: self.image.clone(),
            edit_instruction: self.edit_instruction.clone(),
            status: self.status,
            error: self.error.clone(),
        }
    }
}

/// Read-only copy of the session for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub source_name: Option<String>,
    pub description: String,
    pub image: Option<GeneratedImage>,
    pub edit_instruction: String,
    pub status: RequestStatus,
    pub error: Option<String>,
}
