// SPDX-License-Identifier: GPL-3.0-only

//! Camera control handlers
//!
//! Handles device lists, camera selection and stream health. Camera errors
//! are kept in the state so the screen can show them while the rest of
//! the kiosk stays usable.

use crate::app::state::{Effect, Phase, SessionState};
use crate::backends::camera::types::{CameraDevice, CameraFormat};
use crate::errors::CameraError;
use tracing::{debug, info, warn};

impl SessionState {
    pub(crate) fn handle_devices_listed(&mut self, devices: Vec<CameraDevice>) -> Effect {
        debug!(count = devices.len(), "Camera list updated");
        self.devices = devices;

        if self.devices.is_empty() {
            warn!("No cameras found");
            let had_stream = self.active_device_id.is_some();
            let cancel = self.cancel_countdown();
            self.active_device_id = None;
            self.opening_device_id = None;
            self.stream_format = None;
            self.camera_error = Some(CameraError::NoCameraFound);
            return Effect::batch([cancel, if had_stream { Effect::CloseStream } else { Effect::None }]);
        }

        // The listing itself worked
        if matches!(
            self.camera_error,
            Some(CameraError::PermissionDenied | CameraError::NoCameraFound)
        ) {
            self.camera_error = None;
        }

        let first = self.devices[0].id.clone();
        match self.active_device_id.clone() {
            Some(id) if self.devices.iter().any(|d| d.id == id) => {
                if !self.stream_ready()
                    && self.opening_device_id.is_none()
                    && self.phase != Phase::Countdown
                {
                    info!(device = %id, "Reopening camera");
                    return self.open_device(id);
                }
                Effect::None
            }
            Some(id) => {
                warn!(device = %id, fallback = %first, "Active camera disappeared");
                let cancel = self.cancel_countdown();
                self.notice = Some(format!("Camera {} disconnected", id));
                self.camera_error = Some(CameraError::Disconnected(id));
                Effect::batch([cancel, self.open_device(first)])
            }
            None if self.opening_device_id.is_none() => {
                info!(device = %first, "Selecting first camera");
                self.open_device(first)
            }
            None => Effect::None,
        }
    }

    pub(crate) fn handle_device_list_failed(&mut self, error: CameraError) -> Effect {
        warn!(error = %error, "Could not list cameras");
        let cancel = self.cancel_countdown();
        self.camera_error = Some(error);
        cancel
    }

    pub(crate) fn handle_select_device(&mut self, device_id: String) -> Effect {
        if self.phase == Phase::Countdown {
            debug!(device = %device_id, "Not switching camera during countdown");
            return Effect::None;
        }
        if !self.devices.iter().any(|d| d.id == device_id) {
            debug!(device = %device_id, "Ignoring unknown camera");
            return Effect::None;
        }
        if self.active_device_id.as_deref() == Some(device_id.as_str()) && self.stream_ready() {
            return Effect::None;
        }
        info!(device = %device_id, "Switching camera");
        self.open_device(device_id)
    }

    pub(crate) fn handle_stream_opened(&mut self, device_id: String, format: CameraFormat) -> Effect {
        if self.active_device_id.as_deref() != Some(device_id.as_str()) {
            debug!(device = %device_id, "Ignoring stream for a camera no longer selected");
            return Effect::None;
        }
        info!(device = %device_id, format = %format, "Camera ready");
        self.opening_device_id = None;
        self.stream_format = Some(format);
        self.camera_error = None;
        Effect::None
    }

    pub(crate) fn handle_stream_failed(&mut self, device_id: String, error: CameraError) -> Effect {
        if self.active_device_id.as_deref() != Some(device_id.as_str()) {
            debug!(device = %device_id, "Ignoring failure for a camera no longer selected");
            return Effect::None;
        }
        warn!(device = %device_id, error = %error, "Camera failed to open");
        self.opening_device_id = None;
        self.stream_format = None;
        self.camera_error = Some(error);
        Effect::None
    }

    pub(crate) fn handle_stream_lost(&mut self, device_id: String) -> Effect {
        if self.active_device_id.as_deref() != Some(device_id.as_str()) || !self.stream_ready() {
            return Effect::None;
        }
        warn!(device = %device_id, "Camera stream lost");
        let cancel = self.cancel_countdown();
        self.stream_format = None;
        self.camera_error = Some(CameraError::Disconnected(device_id));
        cancel
    }

    fn open_device(&mut self, device_id: String) -> Effect {
        self.active_device_id = Some(device_id.clone());
        self.opening_device_id = Some(device_id.clone());
        self.stream_format = None;
        Effect::OpenDevice(device_id)
    }
}
