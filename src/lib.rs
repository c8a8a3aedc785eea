// SPDX-License-Identifier: MPL-2.0

//! Photobooth - a kiosk photo booth with countdown capture, frame overlays
//! and phone remote control
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Session state machine and the kiosk runtime driving it
//! - [`backends`]: Camera, realtime channel and upload abstractions
//! - [`pipelines`]: Crop, mirror and overlay compositing to PNG
//! - [`remote`]: Session codes and the remote command protocol
//! - [`config`]: User configuration handling
//! - [`storage`]: Saving composites to disk
//! - [`terminal`]: Terminal renderings of the booth and the remote
//!
//! # Example
//!
//! ```ignore
//! use photobooth::app::{Kiosk, KioskServices, Message};
//! use photobooth::backends::camera::VirtualCamera;
//!
//! let services = KioskServices {
//!     source: Arc::new(VirtualCamera::test_pattern()),
//!     uploader: upload::from_config(&config.upload),
//!     realtime: None,
//! };
//! let handle = Kiosk::new(&config, services).spawn();
//! handle.send(Message::StartCountdown);
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod pipelines;
pub mod remote;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use app::{Kiosk, KioskHandle, KioskServices, Message, Phase, SessionState};
pub use config::Config;
pub use constants::{CaptureMode, Resolution, TimerDuration};
pub use errors::{AppError, AppResult};
