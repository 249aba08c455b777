//! Generate command handler.

use std::path::Path;

use anyhow::{Context, Result};
use mockup_core::config::Config;

use super::shared::{RequestKind, build_controller, drive, print_commentary, save_current};
use crate::cli::RequestArgs;

pub struct GenerateRunOptions<'a> {
    pub root: &'a Path,
    pub request: &'a RequestArgs,
    pub edits: &'a [String],
    pub out: Option<&'a str>,
    pub config: &'a Config,
}

pub async fn run(options: GenerateRunOptions<'_>) -> Result<()> {
    let controller = build_controller(options.root, options.request, options.config)?;

    let image = drive(&controller, RequestKind::Generate).await?;
    print_commentary(&image);

    for (idx, edit) in options.edits.iter().enumerate() {
        controller.set_edit_instruction(edit.as_str())?;
        match drive(&controller, RequestKind::Edit).await {
            Ok(image) => print_commentary(&image),
            Err(err) => {
                // Keep the last good version before reporting the failed edit.
                let path = save_current(&controller, options.root, options.out, options.config)?;
                eprintln!("Saved last successful mockup to {}", path.display());
                return Err(err).with_context(|| format!("edit {} ('{}')", idx + 1, edit.trim()));
            }
        }
    }

    let path = save_current(&controller, options.root, options.out, options.config)?;
    println!("{}", path.display());
    Ok(())
}
