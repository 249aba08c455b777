//! Image-request lifecycle controller.
//!
//! Owns the [`Session`] and drives the status machine:
//!
//! ```text
//!            generate()                  ok
//!   idle ───────────────▶ generating ─────────▶ success ─┐
//!    │                        │ err                       │
//!    │ edit()                 ▼                           │ generate() / edit()
//!    └──────────────▶ editing ─────────▶ error ◀──────────┘
//! ```
//!
//! Pre-flight failures (missing inputs, unsupported media type) record an
//! error message without changing the status and never reach the capability.
//! At most one request is in flight; a second request is rejected with
//! [`MockupError::Busy`] before anything is invoked. Dropping a request
//! future before it completes moves the session to `error`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::capability::{ImageCapability, ImageRequest};
use crate::error::{MockupError, Result};
use crate::images::{EncodedPayload, classify_media_type};
use crate::session::{GeneratedImage, RequestStatus, Session, SessionSnapshot, SourceFile};

const GENERATE_FALLBACK_MESSAGE: &str = "Failed to generate mockup.";
const EDIT_FALLBACK_MESSAGE: &str = "Failed to edit mockup.";
const CANCELLED_MESSAGE: &str = "Request cancelled.";

pub struct LifecycleController<C> {
    capability: C,
    session: Mutex<Session>,
    status_tx: watch::Sender<RequestStatus>,
}

impl<C: ImageCapability> LifecycleController<C> {
    pub fn new(capability: C) -> Self {
        let (status_tx, _) = watch::channel(RequestStatus::Idle);
        Self {
            capability,
            session: Mutex::new(Session::default()),
            status_tx,
        }
    }

    /// Subscribes to status transitions.
    pub fn subscribe(&self) -> watch::Receiver<RequestStatus> {
        self.status_tx.subscribe()
    }

    pub fn status(&self) -> RequestStatus {
        self.session().status
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session().snapshot()
    }

    pub fn current_image(&self) -> Option<GeneratedImage> {
        self.session().image.clone()
    }

    /// Replaces the reference image.
    ///
    /// # Errors
    /// Returns [`MockupError::Busy`] while a request is in flight.
    pub fn select_source(&self, file: SourceFile) -> Result<()> {
        let mut session = self.idle_session()?;
        tracing::debug!(name = file.name(), declared = file.declared_type(), "source selected");
        session.source = Some(Arc::new(file));
        Ok(())
    }

    /// # Errors
    /// Returns [`MockupError::Busy`] while a request is in flight.
    pub fn set_description(&self, description: impl Into<String>) -> Result<()> {
        self.idle_session()?.description = description.into();
        Ok(())
    }

    /// # Errors
    /// Returns [`MockupError::Busy`] while a request is in flight.
    pub fn set_edit_instruction(&self, instruction: impl Into<String>) -> Result<()> {
        self.idle_session()?.edit_instruction = instruction.into();
        Ok(())
    }

    /// Generates a mockup from the selected source and product description.
    ///
    /// On success the result becomes the authoritative image.
    ///
    /// # Errors
    /// Every failure is also recorded in the session's error message, except
    /// [`MockupError::Busy`] which leaves the session untouched.
    pub async fn generate(&self) -> Result<GeneratedImage> {
        let (source, description) = {
            let mut session = self.session();
            if session.status.is_in_flight() {
                return Err(MockupError::Busy);
            }
            let Some(source) = session.source.clone() else {
                return Err(Self::reject(
                    &mut session,
                    MockupError::validation("Please upload a logo image first."),
                ));
            };
            let description = session.description.trim().to_string();
            if description.is_empty() {
                return Err(Self::reject(
                    &mut session,
                    MockupError::validation("Please describe the product for the mockup."),
                ));
            }
            if let Err(err) = classify_media_type(source.declared_type()) {
                return Err(Self::reject(&mut session, err));
            }
            self.begin(&mut session, RequestStatus::Generating);
            (source, description)
        };
        let in_flight = InFlight::new(self);

        tracing::info!(source = source.name(), "generating mockup");
        let outcome = match EncodedPayload::derive(&source).await {
            Ok(reference) => {
                let request = ImageRequest::Generate {
                    reference,
                    description,
                };
                self.capability
                    .invoke(&request)
                    .await
                    .map_err(MockupError::from)
            }
            Err(err) => Err(err),
        };
        in_flight.complete();

        let mut session = self.session();
        match outcome {
            Ok(image) => {
                session.image = Some(image.clone());
                self.transition(&mut session, RequestStatus::Success);
                tracing::info!(media_type = %image.payload.media_type, "mockup generated");
                Ok(image)
            }
            Err(err) => Err(self.fail(&mut session, err, GENERATE_FALLBACK_MESSAGE)),
        }
    }

    /// Applies the current edit instruction to the authoritative image.
    ///
    /// On success the result replaces the image and the instruction is
    /// cleared; on failure the instruction is kept so it can be retried.
    ///
    /// # Errors
    /// Same recording rules as [`LifecycleController::generate`].
    pub async fn edit(&self) -> Result<GeneratedImage> {
        let request = {
            let mut session = self.session();
            if session.status.is_in_flight() {
                return Err(MockupError::Busy);
            }
            let Some(current) = session.image.as_ref().map(|image| image.payload.clone()) else {
                return Err(Self::reject(
                    &mut session,
                    MockupError::validation("Generate a mockup before editing it."),
                ));
            };
            let instruction = session.edit_instruction.trim().to_string();
            if instruction.is_empty() {
                return Err(Self::reject(
                    &mut session,
                    MockupError::validation("Please describe the edit to apply."),
                ));
            }
            self.begin(&mut session, RequestStatus::Editing);
            ImageRequest::Edit {
                current,
                instruction,
            }
        };

        let in_flight = InFlight::new(self);

        tracing::info!(instruction = request.text(), "editing mockup");
        let outcome = self.capability.invoke(&request).await;
        in_flight.complete();

        let mut session = self.session();
        match outcome {
            Ok(image) => {
                session.image = Some(image.clone());
                session.edit_instruction.clear();
                self.transition(&mut session, RequestStatus::Success);
                tracing::info!(media_type = %image.payload.media_type, "mockup edited");
                Ok(image)
            }
            Err(failure) => Err(self.fail(&mut session, failure.into(), EDIT_FALLBACK_MESSAGE)),
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn idle_session(&self) -> Result<MutexGuard<'_, Session>> {
        let session = self.session();
        if session.status.is_in_flight() {
            return Err(MockupError::Busy);
        }
        Ok(session)
    }

    /// Records a pre-flight failure. The status does not change.
    fn reject(session: &mut Session, err: MockupError) -> MockupError {
        tracing::debug!(error = %err, status = %session.status, "request rejected");
        session.error = Some(err.to_string());
        err
    }

    fn begin(&self, session: &mut Session, status: RequestStatus) {
        session.error = None;
        self.transition(session, status);
    }

    fn fail(&self, session: &mut Session, err: MockupError, fallback: &str) -> MockupError {
        let message = match &err {
            MockupError::Capability(failure) => failure.message_or(fallback).to_string(),
            other => other.to_string(),
        };
        tracing::warn!(error = %message, "image request failed");
        session.error = Some(message);
        self.transition(session, RequestStatus::Error);
        err
    }

    fn transition(&self, session: &mut Session, status: RequestStatus) {
        tracing::debug!(from = %session.status, to = %status, "status transition");
        session.status = status;
        self.status_tx.send_replace(status);
    }
}

/// Armed while a capability call is outstanding. If the request future is
/// dropped before completing, the session moves to `Error` so later requests
/// are not rejected as busy.
struct InFlight<'a, C: ImageCapability> {
    controller: &'a LifecycleController<C>,
    armed: bool,
}

impl<'a, C: ImageCapability> InFlight<'a, C> {
    fn new(controller: &'a LifecycleController<C>) -> Self {
        Self {
            controller,
            armed: true,
        }
    }

    fn complete(mut self) {
        self.armed = false;
    }
}

impl<C: ImageCapability> Drop for InFlight<'_, C> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut session = self.controller.session();
        if session.status.is_in_flight() {
            tracing::warn!(status = %session.status, "image request cancelled");
            session.error = Some(CANCELLED_MESSAGE.to_string());
            self.controller.transition(&mut session, RequestStatus::Error);
        }
    }
}
