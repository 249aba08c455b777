//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mockup_core::config;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "mockup")]
#[command(version)]
#[command(about = "Turn a logo into AI-generated product mockups")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Root directory for input and output paths (default: current directory)
    #[arg(long, default_value = ".")]
    root: String,
}

/// Inputs shared by every command that issues image requests.
#[derive(clap::Args, Debug, Clone)]
pub(crate) struct RequestArgs {
    /// Logo image (PNG, JPEG or WEBP)
    #[arg(short, long, value_name = "PATH")]
    pub logo: String,

    /// Product to place the logo on (e.g. "a white t-shirt")
    #[arg(short, long, value_name = "TEXT")]
    pub product: String,

    /// Declared media type of the logo (default: from the file extension)
    #[arg(long, value_name = "TYPE")]
    pub mime: Option<String>,

    /// Override the model from config
    #[arg(short, long)]
    pub model: Option<String>,

    /// Output aspect ratio (e.g. "1:1", "16:9")
    #[arg(long)]
    pub aspect: Option<String>,

    /// Output size preset (e.g. "1K", "2K")
    #[arg(long)]
    pub size: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Generate a mockup, apply edits in order, and save it
    Generate {
        #[command(flatten)]
        request: RequestArgs,

        /// Edit instruction to apply after generation (repeatable)
        #[arg(short, long = "edit", value_name = "TEXT")]
        edits: Vec<String>,

        /// Output file or directory
        #[arg(short, long, value_name = "PATH")]
        out: Option<String>,
    },

    /// Generate a mockup, then edit it interactively from stdin
    Session {
        #[command(flatten)]
        request: RequestArgs,

        /// Output file or directory used by /save and on exit
        #[arg(short, long, value_name = "PATH")]
        out: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging();

    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

/// Logs go to stderr; stdout only carries saved file paths.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // Fails only when a subscriber is already installed.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

async fn dispatch(cli: Cli) -> Result<()> {
    let Cli { command, root } = cli;
    let root = PathBuf::from(root);

    match command {
        Commands::Generate {
            request,
            edits,
            out,
        } => {
            let config = config::Config::load().context("load config")?;
            commands::generate::run(commands::generate::GenerateRunOptions {
                root: &root,
                request: &request,
                edits: &edits,
                out: out.as_deref(),
                config: &config,
            })
            .await
        }
        Commands::Session { request, out } => {
            let config = config::Config::load().context("load config")?;
            commands::session::run(commands::session::SessionRunOptions {
                root: &root,
                request: &request,
                out: out.as_deref(),
                config: &config,
            })
            .await
        }
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
    }
}
