// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Running the booth and the remote control in the terminal
//! - Listing available cameras
//! - Capturing a single composite photo
//! - Running a realtime relay
//! - Configuring the upload service

use crate::SourceArgs;
use clap::Subcommand;
use photobooth::app::{Kiosk, KioskServices};
use photobooth::backends::camera::{
    CameraBackendManager, MediaSource, VirtualCamera, VirtualDevice, default_source,
};
use photobooth::backends::realtime::{self, WebSocketService, relay::RelayServer};
use photobooth::backends::upload;
use photobooth::config::{Config, UploadConfig};
use photobooth::constants::{CaptureMode, photo_file_name};
use photobooth::errors::CameraError;
use photobooth::pipelines::photo::{Overlay, PhotoPipeline, overlay};
use photobooth::remote::SessionCode;
use photobooth::{storage, terminal};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// How long `snap` waits for the camera to deliver a frame
const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Changes to the upload service
#[derive(Subcommand, Debug)]
pub enum UploadAction {
    /// Print the current upload service
    Show,
    /// Turn uploads off
    Disable,
    /// Image host taking a raw POST and answering `{ success, url }`
    Http {
        endpoint: String,
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Object storage taking a PUT per file
    Storage {
        base_url: String,
        bucket: String,
        #[arg(long)]
        token: String,
        /// Base URL the bucket is publicly served from
        #[arg(long)]
        public_base_url: String,
    },
}

/// Set up tracing, to a log file for screens that own the terminal
pub fn init_logging(interactive: bool) {
    let filter =
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if !interactive {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_target(true)
            .with_level(true)
            .with_writer(std::io::stderr)
            .init();
        return;
    }

    match log_file() {
        Some(file) => tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::sink)
            .init(),
    }
}

fn log_file() -> Option<std::fs::File> {
    let dir = dirs::cache_dir()?.join("photobooth");
    std::fs::create_dir_all(&dir).ok()?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("photobooth.log"))
        .ok()
}

pub fn load_config(path: Option<&Path>) -> Config {
    match path {
        Some(path) => Config::load_or_default(path),
        None => Config::load(),
    }
}

fn camera_source(args: &SourceArgs) -> Result<Arc<dyn MediaSource>, CameraError> {
    if let Some(path) = &args.still {
        let device = VirtualDevice::from_file("still-0", path)?;
        return Ok(Arc::new(VirtualCamera::new(vec![device])));
    }
    if args.virtual_camera {
        return Ok(Arc::new(VirtualCamera::test_pattern()));
    }
    Ok(default_source())
}

/// Run the booth in the terminal
pub async fn kiosk(
    mut config: Config,
    source: SourceArgs,
    overlay_args: Vec<String>,
    relay: Option<String>,
    save_dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let overlays = overlay_args
        .iter()
        .map(|arg| terminal::kiosk::parse_overlay_arg(arg))
        .collect::<Result<Vec<_>, _>>()?;
    if relay.is_some() {
        config.realtime.relay_url = relay;
    }

    let services = KioskServices {
        source: camera_source(&source)?,
        uploader: upload::from_config(&config.upload),
        realtime: realtime::from_url(config.realtime.relay_url.as_deref()),
    };
    let mut kiosk = Kiosk::new(&config, services);
    if let Some(dir) = save_dir {
        kiosk = kiosk.with_save_dir(dir);
    }

    terminal::kiosk::run(kiosk, overlays).await
}

/// Run the remote control for a booth
pub async fn remote(
    config: &Config,
    code: &str,
    relay: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let code = SessionCode::parse(code).ok_or_else(|| format!("'{}' is not a valid session code", code))?;
    let url = relay
        .or_else(|| config.realtime.relay_url.clone())
        .ok_or("No relay configured, pass --relay ws://HOST:PORT")?;

    terminal::remote::run(Arc::new(WebSocketService::new(&url)), code).await
}

/// List all available cameras
pub async fn list_cameras(source: &SourceArgs) -> Result<(), Box<dyn std::error::Error>> {
    let manager = CameraBackendManager::new(camera_source(source)?);
    let backend = manager.backend_name();
    let cameras = tokio::task::spawn_blocking(move || manager.list_devices()).await??;

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras ({}):", backend);
    println!();
    for camera in &cameras {
        println!("  {}  {}", camera.id, camera.label);
        if let Some(info) = &camera.device_info {
            println!("      Driver: {}  Bus: {}", info.driver, info.bus);
        }
    }

    Ok(())
}

/// Capture one composite photo
pub async fn snap(
    config: &Config,
    source: &SourceArgs,
    camera: Option<String>,
    mode: CaptureMode,
    overlay_path: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let manager = CameraBackendManager::new(camera_source(source)?);

    let lister = manager.clone();
    let devices = tokio::task::spawn_blocking(move || lister.list_devices()).await??;
    let device = match camera {
        Some(id) => devices
            .into_iter()
            .find(|d| d.id == id)
            .ok_or(CameraError::DeviceNotFound(id))?,
        None => devices.into_iter().next().ok_or(CameraError::NoCameraFound)?,
    };
    println!("Using camera: {}", device.label);

    let opener = manager.clone();
    let ideal = config.ideal_resolution;
    let id = device.id.clone();
    let format = tokio::task::spawn_blocking(move || opener.open(&id, ideal)).await??;
    println!("Capture format: {}", format);

    let frame = first_frame(&manager).await;
    manager.close();
    let frame = frame?;

    let overlay_image = match &overlay_path {
        Some(path) => match overlay::load_file(path).await {
            Overlay::Ready(image) => Some(image),
            Overlay::Unreadable(reason) => {
                eprintln!("Overlay skipped: {}", reason);
                None
            }
        },
        None => None,
    };

    let pipeline = PhotoPipeline::from_config(config);
    let result = pipeline.compose_async(frame, overlay_image, mode).await?;

    let path = output.unwrap_or_else(|| {
        storage::photo_directory(&config.save_folder)
            .join(photo_file_name(chrono::Utc::now().timestamp_millis()))
    });
    storage::save_composite(&path, &result).await?;
    println!(
        "Saved {}x{} {} photo to {}",
        result.width,
        result.height,
        mode.display_name(),
        path.display()
    );
    Ok(())
}

/// Wait for the freshly opened stream to deliver
async fn first_frame(
    manager: &CameraBackendManager,
) -> Result<photobooth::backends::camera::CameraFrame, CameraError> {
    let deadline = Instant::now() + FIRST_FRAME_TIMEOUT;
    loop {
        let reader = manager.clone();
        let frame = tokio::task::spawn_blocking(move || reader.capture_frame())
            .await
            .map_err(|e| CameraError::StreamFailed(e.to_string()))?;
        match frame {
            Err(CameraError::NoFrameAvailable) if Instant::now() < deadline => {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            other => return other,
        }
    }
}

/// Run a relay until interrupted
pub async fn relay(bind: &str) -> Result<(), Box<dyn std::error::Error>> {
    let server = RelayServer::bind(bind).await?;
    println!("Relay listening on ws://{}", server.local_addr()?);
    println!("Press Ctrl+C to stop.");

    tokio::select! {
        () = server.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Relay interrupted");
            println!();
            println!("Relay stopped.");
        }
    }
    Ok(())
}

/// Show or change the upload service
pub fn upload_config(
    mut config: Config,
    path: Option<&Path>,
    action: Option<UploadAction>,
) -> Result<(), Box<dyn std::error::Error>> {
    let upload = match action.unwrap_or(UploadAction::Show) {
        UploadAction::Show => {
            println!("{}", describe_upload(&config.upload));
            return Ok(());
        }
        UploadAction::Disable => UploadConfig::Disabled,
        UploadAction::Http { endpoint, api_key } => {
            upload::validate_url(&endpoint)?;
            UploadConfig::Http { endpoint, api_key }
        }
        UploadAction::Storage {
            base_url,
            bucket,
            token,
            public_base_url,
        } => {
            upload::validate_url(&base_url)?;
            upload::validate_url(&public_base_url)?;
            UploadConfig::Storage {
                base_url,
                bucket,
                token,
                public_base_url,
            }
        }
    };

    config.upload = upload;
    let saved_to = match path {
        Some(path) => {
            config.save_to(path)?;
            path.to_path_buf()
        }
        None => config.save()?,
    };
    println!("{}", describe_upload(&config.upload));
    println!("Saved to {}", saved_to.display());
    if !upload::from_config(&config.upload).is_enabled() {
        warn!("Uploads are disabled");
    }
    Ok(())
}

fn describe_upload(upload: &UploadConfig) -> String {
    match upload {
        UploadConfig::Disabled => "Uploads: disabled".to_string(),
        UploadConfig::Http { endpoint, api_key } => format!(
            "Uploads: POST {} ({})",
            endpoint,
            if api_key.is_some() { "with API key" } else { "no API key" }
        ),
        UploadConfig::Storage {
            base_url,
            bucket,
            public_base_url,
            ..
        } => format!(
            "Uploads: PUT {}/{} served from {}/{}",
            base_url.trim_end_matches('/'),
            bucket,
            public_base_url.trim_end_matches('/'),
            bucket
        ),
    }
}
