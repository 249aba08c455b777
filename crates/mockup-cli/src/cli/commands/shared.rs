//! Helpers shared by the request-issuing commands.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use mockup_core::config::Config;
use mockup_core::export::{resolve_output_path, save_image};
use mockup_core::images::path_mime::normalize_input_path;
use mockup_core::providers::gemini::GeminiClient;
use mockup_core::{GeneratedImage, LifecycleController, RequestStatus, SourceFile};

use crate::cli::RequestArgs;

const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

pub type Controller = LifecycleController<GeminiClient>;

#[derive(Debug, Clone, Copy)]
pub enum RequestKind {
    Generate,
    Edit,
}

/// Builds a Gemini-backed controller with the logo and product already set.
pub fn build_controller(root: &Path, request: &RequestArgs, config: &Config) -> Result<Controller> {
    let mut config = config.clone();
    if let Some(aspect) = &request.aspect {
        config.aspect_ratio = Some(aspect.clone());
    }
    if let Some(size) = &request.size {
        config.image_size = Some(size.clone());
    }

    let gemini_config = config.gemini_config(request.model.as_deref())?;
    let client = GeminiClient::new(gemini_config)?;
    tracing::debug!(model = client.model(), "using Gemini image model");

    let controller = LifecycleController::new(client);
    controller.select_source(source_file(root, &request.logo, request.mime.as_deref()))?;
    controller.set_description(request.product.as_str())?;
    Ok(controller)
}

/// Resolves a logo path against `root` and declares its media type.
pub fn source_file(root: &Path, logo: &str, mime: Option<&str>) -> SourceFile {
    let path = normalize_input_path(logo);
    let path = if path.is_absolute() {
        path
    } else {
        root.join(path)
    };

    match mime.map(str::trim).filter(|m| !m.is_empty()) {
        Some(declared) => SourceFile::from_path(path, declared),
        None => SourceFile::from_path_guess(path),
    }
}

/// Runs a generate or edit request, reporting progress on stderr.
///
/// On failure the returned error carries the session's error message.
pub async fn drive(controller: &Controller, kind: RequestKind) -> Result<GeneratedImage> {
    let mut status_rx = controller.subscribe();
    let started = Instant::now();
    let request = async {
        match kind {
            RequestKind::Generate => controller.generate().await,
            RequestKind::Edit => controller.edit().await,
        }
    };
    tokio::pin!(request);

    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    ticker.tick().await;

    loop {
        tokio::select! {
            result = &mut request => {
                return result.map_err(|err| {
                    let message = controller.snapshot().error.unwrap_or_else(|| err.to_string());
                    anyhow!(message)
                });
            }
            Ok(()) = status_rx.changed() => {
                match *status_rx.borrow_and_update() {
                    RequestStatus::Generating => eprintln!("Generating mockup..."),
                    RequestStatus::Editing => eprintln!("Applying edit..."),
                    _ => {}
                }
            }
            _ = ticker.tick() => {
                let status = controller.status();
                if status.is_in_flight() {
                    eprintln!("  still {status} ({}s)", started.elapsed().as_secs());
                }
            }
        }
    }
}

/// Saves the authoritative image and returns where it was written.
pub fn save_current(
    controller: &Controller,
    root: &Path,
    out: Option<&str>,
    config: &Config,
) -> Result<PathBuf> {
    let image = controller
        .current_image()
        .context("No mockup to save yet")?;
    let path = resolve_output_path(
        root,
        out,
        config.effective_output_name(),
        image.payload.media_type,
    );
    save_image(&image, &path)?;
    Ok(path)
}

pub fn print_commentary(image: &GeneratedImage) {
    if let Some(text) = &image.commentary {
        eprintln!("{text}");
    }
}
