// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use photobooth::constants::{CaptureMode, realtime::DEFAULT_RELAY_BIND};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "photobooth")]
#[command(about = "Kiosk photo booth with countdown capture, frame overlays and phone remote control")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    /// Configuration file (default: ~/.config/photobooth/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Where frames come from
#[derive(clap::Args, Clone, Debug, Default)]
pub struct SourceArgs {
    /// Use a generated test pattern instead of real cameras
    #[arg(long = "virtual")]
    virtual_camera: bool,

    /// Use a still image as the only camera
    #[arg(long, value_name = "IMAGE", conflicts_with = "virtual_camera")]
    still: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the booth in this terminal (the default)
    Kiosk {
        #[command(flatten)]
        source: SourceArgs,

        /// Overlay for a mode, as MODE=PATH (repeatable)
        #[arg(short, long, value_name = "MODE=PATH")]
        overlay: Vec<String>,

        /// Relay for the phone remote, overrides the configuration
        #[arg(long, value_name = "URL")]
        relay: Option<String>,

        /// Directory for saved photos (default: ~/Pictures/Photobooth)
        #[arg(long)]
        save_dir: Option<PathBuf>,
    },

    /// Control a running booth
    Remote {
        /// Session code shown on the booth
        code: String,

        /// Relay the booth uses, overrides the configuration
        #[arg(long, value_name = "URL")]
        relay: Option<String>,
    },

    /// List available cameras
    List {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Capture one composite photo without a countdown
    Snap {
        #[command(flatten)]
        source: SourceArgs,

        /// Camera id to use (from 'photobooth list', default: first)
        #[arg(short, long)]
        camera: Option<String>,

        /// Capture mode
        #[arg(short, long, value_enum, default_value = "portrait")]
        mode: ModeArg,

        /// Overlay image drawn over the photo
        #[arg(long)]
        overlay: Option<PathBuf>,

        /// Output file path (default: ~/Pictures/Photobooth/photobooth_<ms>.png)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a relay for booths and remotes
    Relay {
        /// Address to listen on
        #[arg(short, long, default_value = DEFAULT_RELAY_BIND)]
        bind: String,
    },

    /// Show or change the upload service
    UploadConfig {
        #[command(subcommand)]
        action: Option<cli::UploadAction>,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Portrait,
    Landscape,
}

impl From<ModeArg> for CaptureMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Portrait => CaptureMode::Portrait,
            ModeArg::Landscape => CaptureMode::Landscape,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Interactive screens own the terminal, so their logs go to a file
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=photobooth=debug, RUST_LOG=info
    let interactive = matches!(
        cli.command,
        None | Some(Commands::Kiosk { .. }) | Some(Commands::Remote { .. })
    );
    cli::init_logging(interactive);

    let config_path = cli.config.clone();
    let config = cli::load_config(config_path.as_deref());

    match cli.command {
        None => cli::kiosk(config, SourceArgs::default(), Vec::new(), None, None).await,
        Some(Commands::Kiosk {
            source,
            overlay,
            relay,
            save_dir,
        }) => cli::kiosk(config, source, overlay, relay, save_dir).await,
        Some(Commands::Remote { code, relay }) => cli::remote(&config, &code, relay).await,
        Some(Commands::List { source }) => cli::list_cameras(&source).await,
        Some(Commands::Snap {
            source,
            camera,
            mode,
            overlay,
            output,
        }) => cli::snap(&config, &source, camera, mode.into(), overlay, output).await,
        Some(Commands::Relay { bind }) => cli::relay(&bind).await,
        Some(Commands::UploadConfig { action }) => {
            cli::upload_config(config, config_path.as_deref(), action)
        }
    }
}
