// SPDX-License-Identifier: GPL-3.0-only

//! Camera device manager
//!
//! The manager provides:
//! - Permission handling before the first enumeration
//! - The current device list and the active device
//! - Exactly one open stream, released before any other is opened

use super::types::*;
use super::{MediaSource, MediaStream};
use crate::constants::Resolution;
use crate::errors::CameraError;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Internal manager state
#[derive(Default)]
struct ManagerState {
    /// Set once `request_access` succeeded
    access_granted: bool,
    /// Last enumeration result
    devices: Vec<CameraDevice>,
    /// The open stream, if any
    stream: Option<Box<dyn MediaStream>>,
}

/// Camera device manager
///
/// Thread-safe and can be shared across threads. Every method blocks.
#[derive(Clone)]
pub struct CameraBackendManager {
    source: Arc<dyn MediaSource>,
    state: Arc<Mutex<ManagerState>>,
}

impl CameraBackendManager {
    /// Create a manager over `source`
    pub fn new(source: Arc<dyn MediaSource>) -> Self {
        info!(backend = source.name(), "Creating camera manager");
        Self {
            source,
            state: Arc::new(Mutex::new(ManagerState::default())),
        }
    }

    /// Backend name
    pub fn backend_name(&self) -> &'static str {
        self.source.name()
    }

    /// Enumerate cameras, asking for permission first if needed
    pub fn list_devices(&self) -> BackendResult<Vec<CameraDevice>> {
        let mut state = self.state.lock();

        if !state.access_granted {
            self.source.request_access()?;
            state.access_granted = true;
            debug!("Camera access granted");
        }

        let devices = self.source.enumerate()?;
        debug!(count = devices.len(), "Enumerated cameras");
        state.devices = devices.clone();
        Ok(devices)
    }

    /// Open `device_id`, stopping the current stream first
    pub fn open(&self, device_id: &str, ideal: Resolution) -> BackendResult<CameraFormat> {
        let mut state = self.state.lock();

        if let Some(mut old) = state.stream.take() {
            info!(device = old.device_id(), "Stopping previous stream");
            old.stop();
        }

        let device = match state.devices.iter().find(|d| d.id == device_id) {
            Some(device) => device.clone(),
            None => {
                // Device may have been plugged in after the last enumeration
                let devices = self.source.enumerate()?;
                let found = devices.iter().find(|d| d.id == device_id).cloned();
                state.devices = devices;
                found.ok_or_else(|| CameraError::DeviceNotFound(device_id.to_string()))?
            }
        };

        info!(device = %device.label, id = %device.id, ideal = %ideal, "Opening camera");
        let mut stream = self.source.open(&device, ideal)?;
        let format = stream.format();
        if let Err(e) = format.check_convertible() {
            stream.stop();
            return Err(e);
        }
        info!(format = %format, "Camera stream started");
        state.stream = Some(stream);
        Ok(format)
    }

    /// Stop the open stream, if any
    pub fn close(&self) {
        if let Some(mut stream) = self.state.lock().stream.take() {
            info!(device = stream.device_id(), "Closing camera stream");
            stream.stop();
        }
    }

    /// Read the current frame of the open stream
    pub fn capture_frame(&self) -> BackendResult<CameraFrame> {
        let state = self.state.lock();
        let stream = state
            .stream
            .as_ref()
            .ok_or_else(|| CameraError::StreamFailed("no stream open".into()))?;
        if !stream.is_alive() {
            return Err(CameraError::Disconnected(stream.device_id().to_string()));
        }
        stream.latest_frame()
    }

    /// Id of the device with an open stream
    pub fn active_device_id(&self) -> Option<String> {
        self.state
            .lock()
            .stream
            .as_ref()
            .map(|s| s.device_id().to_string())
    }

    /// Whether the open stream still delivers, `None` without a stream
    pub fn stream_alive(&self) -> Option<bool> {
        let state = self.state.lock();
        let alive = state.stream.as_ref().map(|s| s.is_alive());
        if alive == Some(false) {
            warn!("Camera stream is no longer alive");
        }
        alive
    }

    /// Devices from the last enumeration
    pub fn devices(&self) -> Vec<CameraDevice> {
        self.state.lock().devices.clone()
    }
}

impl std::fmt::Debug for CameraBackendManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraBackendManager")
            .field("backend", &self.source.name())
            .field("active", &self.active_device_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{VirtualCamera, VirtualDevice};

    fn manager_with_two() -> (CameraBackendManager, crate::backends::camera::VirtualCameraControls) {
        let camera = VirtualCamera::new(vec![
            VirtualDevice::test_pattern("cam-a", "Camera A", Resolution::new(64, 48)),
            VirtualDevice::test_pattern("cam-b", "Camera B", Resolution::new(48, 64)),
        ]);
        let controls = camera.controls();
        (CameraBackendManager::new(Arc::new(camera)), controls)
    }

    #[test]
    fn test_switching_keeps_one_stream_open() {
        let (manager, controls) = manager_with_two();
        manager.list_devices().unwrap();

        manager.open("cam-a", Resolution::new(64, 48)).unwrap();
        manager.open("cam-b", Resolution::new(64, 48)).unwrap();
        manager.open("cam-a", Resolution::new(64, 48)).unwrap();

        assert_eq!(controls.open_streams(), 1);
        assert_eq!(manager.active_device_id().as_deref(), Some("cam-a"));

        manager.close();
        assert_eq!(controls.open_streams(), 0);
    }

    #[test]
    fn test_failed_open_leaves_no_stream() {
        let (manager, controls) = manager_with_two();
        manager.list_devices().unwrap();
        manager.open("cam-a", Resolution::new(64, 48)).unwrap();

        let err = manager.open("missing", Resolution::new(64, 48)).unwrap_err();
        assert_eq!(err, CameraError::DeviceNotFound("missing".into()));
        assert_eq!(controls.open_streams(), 0);
        assert_eq!(manager.active_device_id(), None);
    }

    #[test]
    fn test_denied_access_is_reported() {
        let (manager, controls) = manager_with_two();
        controls.deny_access(true);
        assert_eq!(manager.list_devices(), Err(CameraError::PermissionDenied));
    }

    #[test]
    fn test_removed_device_reports_disconnected() {
        let (manager, controls) = manager_with_two();
        manager.list_devices().unwrap();
        manager.open("cam-b", Resolution::new(64, 48)).unwrap();
        assert!(manager.capture_frame().is_ok());

        controls.remove_device("cam-b");
        assert_eq!(manager.stream_alive(), Some(false));
        assert_eq!(
            manager.capture_frame().unwrap_err(),
            CameraError::Disconnected("cam-b".into())
        );
    }
}
