//! Interactive session: generate once, then edit line by line from stdin.

use std::path::Path;

use anyhow::Result;
use mockup_core::config::Config;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::shared::{
    Controller, RequestKind, build_controller, drive, print_commentary, save_current, source_file,
};
use crate::cli::RequestArgs;

const HELP: &str = "\
Type an edit instruction to change the mockup, or a command:
  /save [PATH]      save the current mockup
  /status           show the session state
  /product TEXT     change the product description
  /logo PATH        replace the logo (declared type from the extension)
  /regenerate       generate again from the logo and product
  /help             show this help
  /quit             save unsaved changes and exit";

pub struct SessionRunOptions<'a> {
    pub root: &'a Path,
    pub request: &'a RequestArgs,
    pub out: Option<&'a str>,
    pub config: &'a Config,
}

#[derive(Debug, PartialEq, Eq)]
enum SessionCommand<'a> {
    Edit(&'a str),
    Save(Option<&'a str>),
    Status,
    Product(&'a str),
    Logo(&'a str),
    Regenerate,
    Help,
    Quit,
    Empty,
    Unknown(&'a str),
}

fn parse_line(line: &str) -> SessionCommand<'_> {
    let line = line.trim();
    if line.is_empty() {
        return SessionCommand::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return SessionCommand::Edit(line);
    };

    let (name, arg) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(name, arg)| (name, arg.trim()));

    match name {
        "save" => SessionCommand::Save((!arg.is_empty()).then_some(arg)),
        "status" => SessionCommand::Status,
        "product" => SessionCommand::Product(arg),
        "logo" => SessionCommand::Logo(arg),
        "regenerate" => SessionCommand::Regenerate,
        "help" => SessionCommand::Help,
        "quit" | "exit" => SessionCommand::Quit,
        _ => SessionCommand::Unknown(name),
    }
}

pub async fn run(options: SessionRunOptions<'_>) -> Result<()> {
    let controller = build_controller(options.root, options.request, options.config)?;
    let mut unsaved = request(&controller, RequestKind::Generate).await;

    eprintln!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("> ");
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_line(&line) {
            SessionCommand::Empty => {}
            SessionCommand::Edit(instruction) => {
                controller.set_edit_instruction(instruction)?;
                unsaved |= request(&controller, RequestKind::Edit).await;
            }
            SessionCommand::Save(path) => {
                match save_current(&controller, options.root, path.or(options.out), options.config)
                {
                    Ok(path) => {
                        println!("{}", path.display());
                        unsaved = false;
                    }
                    Err(err) => eprintln!("Error: {err:#}"),
                }
            }
            SessionCommand::Status => print_status(&controller),
            SessionCommand::Product(text) => {
                controller.set_description(text)?;
                eprintln!("Product set. Use /regenerate to create a new mockup.");
            }
            SessionCommand::Logo("") => eprintln!("Usage: /logo PATH"),
            SessionCommand::Logo(path) => {
                controller.select_source(source_file(options.root, path, None))?;
                eprintln!("Logo replaced. Use /regenerate to create a new mockup.");
            }
            SessionCommand::Regenerate => {
                unsaved |= request(&controller, RequestKind::Generate).await;
            }
            SessionCommand::Help => eprintln!("{HELP}"),
            SessionCommand::Quit => break,
            SessionCommand::Unknown(name) => {
                eprintln!("Unknown command '/{name}'. Type /help for commands.");
            }
        }
    }

    if unsaved {
        let path = save_current(&controller, options.root, options.out, options.config)?;
        println!("{}", path.display());
    }
    Ok(())
}

/// Runs a request and reports the outcome. Returns true when the image changed.
async fn request(controller: &Controller, kind: RequestKind) -> bool {
    match drive(controller, kind).await {
        Ok(image) => {
            print_commentary(&image);
            eprintln!(
                "Mockup ready ({}). Type an edit, or /save.",
                image.payload.media_type
            );
            true
        }
        Err(err) => {
            eprintln!("Error: {err:#}");
            false
        }
    }
}

fn print_status(controller: &Controller) {
    let snapshot = controller.snapshot();
    eprintln!("status:  {}", snapshot.status);
    eprintln!(
        "logo:    {}",
        snapshot.source_name.as_deref().unwrap_or("(none)")
    );
    eprintln!("product: {}", snapshot.description);
    match &snapshot.image {
        Some(image) => eprintln!("image:   {}", image.payload.media_type),
        None => eprintln!("image:   (none)"),
    }
    if !snapshot.edit_instruction.is_empty() {
        eprintln!("pending edit: {}", snapshot.edit_instruction);
    }
    if let Some(error) = &snapshot.error {
        eprintln!("last error: {error}");
    }
}
