// SPDX-License-Identifier: GPL-3.0-only

//! Session state, messages and effects

use crate::app::gallery::Gallery;
use crate::backends::camera::types::{CameraDevice, CameraFormat};
use crate::backends::realtime::ConnectionState;
use crate::config::Config;
use crate::constants::{CaptureMode, TimerDuration};
use crate::errors::{AppError, CameraError, UploadError};
use crate::pipelines::photo::{CompositeResult, Overlay, OverlaySet};
use crate::remote::{RemoteCommand, SessionCode};
use image::RgbaImage;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

/// Screen the kiosk is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Live preview, waiting for a trigger
    #[default]
    Setup,
    /// Counting down to a capture
    Countdown,
    /// Showing a captured photo
    Result,
}

/// One captured photo
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoRecord {
    pub image: CompositeResult,
    /// Unix milliseconds, unique within a session
    pub captured_at: i64,
    pub remote_url: Option<String>,
}

impl PhotoRecord {
    pub fn new(image: CompositeResult, captured_at: i64) -> Self {
        Self {
            image,
            captured_at,
            remote_url: None,
        }
    }
}

/// Upload state of the photo on screen
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UploadStatus {
    #[default]
    Idle,
    Uploading,
    /// Shareable URL, short enough for a QR code
    Uploaded(String),
    Failed(String),
    /// No upload service configured
    Disabled,
}

impl UploadStatus {
    pub fn url(&self) -> Option<&str> {
        match self {
            UploadStatus::Uploaded(url) => Some(url),
            _ => None,
        }
    }
}

/// Kiosk session state
///
/// Mutated only through [`SessionState::update`].
#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: Phase,
    pub mode: CaptureMode,
    pub timer: TimerDuration,

    // ===== Camera =====
    pub devices: Vec<CameraDevice>,
    pub active_device_id: Option<String>,
    /// Device an open request is pending for
    pub opening_device_id: Option<String>,
    pub stream_format: Option<CameraFormat>,
    pub camera_error: Option<CameraError>,

    // ===== Countdown =====
    /// Seconds left while counting down
    pub countdown: Option<u32>,
    /// Identifies the current countdown; ticks and captures from older
    /// countdowns are ignored
    pub countdown_generation: u64,

    // ===== Result and sharing =====
    pub current: Option<PhotoRecord>,
    pub upload: UploadStatus,
    pub uploads_in_flight: HashSet<i64>,
    /// Set once the upload service reports it is not configured
    pub uploads_disabled: bool,
    pub gallery: Gallery,
    pub overlays: OverlaySet,

    // ===== Remote =====
    pub session_code: Option<SessionCode>,
    pub remote_link: Option<ConnectionState>,

    /// Last human readable status line
    pub notice: Option<String>,
    pub running: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(CaptureMode::default(), TimerDuration::default(), crate::constants::DEFAULT_GALLERY_CAPACITY)
    }
}

impl SessionState {
    pub fn new(mode: CaptureMode, timer: TimerDuration, gallery_capacity: usize) -> Self {
        Self {
            phase: Phase::Setup,
            mode,
            timer,
            devices: Vec::new(),
            active_device_id: None,
            opening_device_id: None,
            stream_format: None,
            camera_error: None,
            countdown: None,
            countdown_generation: 0,
            current: None,
            upload: UploadStatus::Idle,
            uploads_in_flight: HashSet::new(),
            uploads_disabled: false,
            gallery: Gallery::new(gallery_capacity),
            overlays: OverlaySet::new(),
            session_code: None,
            remote_link: None,
            notice: None,
            running: true,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.default_mode, config.default_timer, config.gallery_capacity)
    }

    /// A stream is open on the active device
    pub fn stream_ready(&self) -> bool {
        self.stream_format.is_some()
    }

    /// Whether a countdown may start now
    pub fn can_start_countdown(&self) -> bool {
        self.phase == Phase::Setup
            && self.camera_error.is_none()
            && self.stream_ready()
            && self.active_device_id.is_some()
    }

    pub fn active_device(&self) -> Option<&CameraDevice> {
        let id = self.active_device_id.as_deref()?;
        self.devices.iter().find(|d| d.id == id)
    }

    /// Overlay image for the current mode
    pub fn overlay_image(&self) -> Option<Arc<RgbaImage>> {
        self.overlays.image(self.mode)
    }
}

/// Inputs to the session reducer
#[derive(Debug)]
pub enum Message {
    // ===== Countdown =====
    /// Local or remote trigger
    StartCountdown,
    Tick { generation: u64 },
    Captured {
        generation: u64,
        image: CompositeResult,
        captured_at: i64,
    },
    CaptureFailed { generation: u64, error: AppError },
    /// Back to setup from the result screen
    Retake,
    /// Back to setup from anywhere
    Reset,
    SetMode(CaptureMode),
    SetTimer(TimerDuration),

    // ===== Camera =====
    RefreshDevices,
    DevicesListed(Vec<CameraDevice>),
    DeviceListFailed(CameraError),
    SelectDevice(String),
    StreamOpened { device_id: String, format: CameraFormat },
    StreamFailed { device_id: String, error: CameraError },
    /// The open stream stopped delivering frames
    StreamLost { device_id: String },

    // ===== Remote =====
    RegenerateSessionCode,
    SessionStarted(SessionCode),
    Remote {
        code: SessionCode,
        command: RemoteCommand,
    },
    RemoteLink {
        code: SessionCode,
        state: ConnectionState,
    },

    // ===== Share =====
    OverlayLoaded { mode: CaptureMode, overlay: Overlay },
    OverlayCleared(CaptureMode),
    /// Show a gallery record, identified by capture time
    OpenFromGallery(i64),
    RetryUpload,
    UploadFinished {
        captured_at: i64,
        outcome: Result<String, UploadError>,
    },
    SaveLocal,
    Saved { captured_at: i64, path: PathBuf },
    SaveFailed { captured_at: i64, error: String },

    Shutdown,
}

/// Work the runtime performs for the reducer
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    StartTicker { generation: u64 },
    StopTicker,
    Capture {
        generation: u64,
        mode: CaptureMode,
        overlay: Option<Arc<RgbaImage>>,
    },
    ListDevices,
    OpenDevice(String),
    CloseStream,
    Upload(PhotoRecord),
    SaveToDevice(PhotoRecord),
    NewSessionCode,
    JoinRemote(SessionCode),
    LeaveRemote,
    Batch(Vec<Effect>),
}

impl Effect {
    /// Combine effects, dropping `None`
    pub fn batch(effects: impl IntoIterator<Item = Effect>) -> Self {
        let mut effects: Vec<Effect> = effects
            .into_iter()
            .flat_map(Effect::flatten)
            .collect();
        match effects.len() {
            0 => Effect::None,
            1 => effects.pop().unwrap_or(Effect::None),
            _ => Effect::Batch(effects),
        }
    }

    /// Effects in execution order, without `None` or nesting
    pub fn flatten(self) -> Vec<Effect> {
        match self {
            Effect::None => Vec::new(),
            Effect::Batch(effects) => effects.into_iter().flat_map(Effect::flatten).collect(),
            effect => vec![effect],
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Effect::None)
    }

    /// Whether this effect, or any nested one, matches `predicate`
    pub fn contains(&self, predicate: impl Fn(&Effect) -> bool + Copy) -> bool {
        match self {
            Effect::Batch(effects) => effects.iter().any(|e| e.contains(predicate)),
            effect => predicate(effect),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_flattens_and_drops_none() {
        let effect = Effect::batch([
            Effect::None,
            Effect::Batch(vec![Effect::StopTicker, Effect::None]),
            Effect::ListDevices,
        ]);
        assert_eq!(effect, Effect::Batch(vec![Effect::StopTicker, Effect::ListDevices]));
        assert_eq!(Effect::batch([Effect::None]), Effect::None);
        assert_eq!(Effect::batch([Effect::None, Effect::StopTicker]), Effect::StopTicker);
    }

    #[test]
    fn test_countdown_needs_a_stream() {
        let mut state = SessionState::default();
        assert!(!state.can_start_countdown());
        state.active_device_id = Some("cam".into());
        state.stream_format = Some(CameraFormat {
            width: 640,
            height: 480,
            pixel_format: crate::backends::camera::types::PixelFormat::RGBA,
        });
        assert!(state.can_start_countdown());
        state.camera_error = Some(CameraError::NoFrameAvailable);
        assert!(!state.can_start_countdown());
    }
}
