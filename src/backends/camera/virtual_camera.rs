// SPDX-License-Identifier: GPL-3.0-only

//! Virtual camera source
//!
//! Devices that produce a color-bar test pattern or a still image, so the
//! kiosk runs without hardware. [`VirtualCameraControls`] changes the
//! device set at runtime (hot-plug), refuses access, and counts open
//! streams.

use super::types::*;
use super::{MediaSource, MediaStream};
use crate::constants::Resolution;
use crate::errors::CameraError;
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::{debug, info};

/// SMPTE-ish color bars, left to right
const BARS: [[u8; 4]; 7] = [
    [192, 192, 192, 255],
    [192, 192, 0, 255],
    [0, 192, 192, 255],
    [0, 192, 0, 255],
    [192, 0, 192, 255],
    [192, 0, 0, 255],
    [0, 0, 192, 255],
];

/// What a virtual device shows
#[derive(Debug, Clone)]
pub enum VirtualContent {
    /// Color bars with a moving marker
    TestPattern,
    /// The same image on every frame
    Still(Arc<RgbaImage>),
}

/// A virtual capture device
#[derive(Debug, Clone)]
pub struct VirtualDevice {
    pub id: String,
    pub label: String,
    pub resolution: Resolution,
    pub content: VirtualContent,
}

impl VirtualDevice {
    pub fn test_pattern(id: &str, label: &str, resolution: Resolution) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            resolution,
            content: VirtualContent::TestPattern,
        }
    }

    /// A device that always shows `image`
    pub fn still(id: &str, label: &str, image: RgbaImage) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            resolution: Resolution::new(image.width(), image.height()),
            content: VirtualContent::Still(Arc::new(image)),
        }
    }

    /// A device showing an image file
    pub fn from_file(id: &str, path: &Path) -> BackendResult<Self> {
        info!(path = %path.display(), "Loading virtual camera image");
        let image = image::open(path)
            .map_err(|e| CameraError::StreamFailed(format!("{}: {}", path.display(), e)))?
            .into_rgba8();
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| id.to_string());
        Ok(Self::still(id, &label, image))
    }

    fn render(&self, frame_number: u64) -> RgbaImage {
        match &self.content {
            VirtualContent::Still(image) => image.as_ref().clone(),
            VirtualContent::TestPattern => {
                let Resolution { width, height } = self.resolution;
                let marker = (frame_number * 4 % width.max(1) as u64) as u32;
                RgbaImage::from_fn(width, height, |x, y| {
                    if x == marker || (y >= height - height / 8 && x < width / 4) {
                        Rgba([255, 255, 255, 255])
                    } else {
                        Rgba(BARS[(x as usize * BARS.len()) / width as usize])
                    }
                })
            }
        }
    }
}

#[derive(Debug)]
struct VirtualState {
    devices: Vec<VirtualDevice>,
    deny_access: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<VirtualState>,
    open_streams: AtomicUsize,
}

/// Virtual camera source
#[derive(Debug, Clone)]
pub struct VirtualCamera {
    shared: Arc<Shared>,
}

impl VirtualCamera {
    pub fn new(devices: Vec<VirtualDevice>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(VirtualState {
                    devices,
                    deny_access: false,
                }),
                open_streams: AtomicUsize::new(0),
            }),
        }
    }

    /// One 1280x720 test pattern device
    pub fn test_pattern() -> Self {
        Self::new(vec![VirtualDevice::test_pattern(
            "virtual-0",
            "Test Pattern",
            Resolution::new(1280, 720),
        )])
    }

    /// Runtime controls sharing this camera's state
    pub fn controls(&self) -> VirtualCameraControls {
        VirtualCameraControls {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl MediaSource for VirtualCamera {
    fn name(&self) -> &'static str {
        "virtual"
    }

    fn request_access(&self) -> BackendResult<()> {
        if self.shared.state.lock().deny_access {
            return Err(CameraError::PermissionDenied);
        }
        Ok(())
    }

    fn enumerate(&self) -> BackendResult<Vec<CameraDevice>> {
        let state = self.shared.state.lock();
        Ok(state
            .devices
            .iter()
            .map(|d| CameraDevice::new(&d.id, &d.label))
            .collect())
    }

    fn open(&self, device: &CameraDevice, ideal: Resolution) -> BackendResult<Box<dyn MediaStream>> {
        let state = self.shared.state.lock();
        if state.deny_access {
            return Err(CameraError::PermissionDenied);
        }
        let virtual_device = state
            .devices
            .iter()
            .find(|d| d.id == device.id)
            .cloned()
            .ok_or_else(|| CameraError::DeviceNotFound(device.id.clone()))?;
        drop(state);

        debug!(device = %device.id, ideal = %ideal, native = %virtual_device.resolution, "Opening virtual stream");
        self.shared.open_streams.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(VirtualStream {
            device: virtual_device,
            shared: Arc::clone(&self.shared),
            frame_number: AtomicU64::new(0),
            stopped: false,
        }))
    }
}

struct VirtualStream {
    device: VirtualDevice,
    shared: Arc<Shared>,
    frame_number: AtomicU64,
    stopped: bool,
}

impl MediaStream for VirtualStream {
    fn device_id(&self) -> &str {
        &self.device.id
    }

    fn format(&self) -> CameraFormat {
        CameraFormat {
            width: self.device.resolution.width,
            height: self.device.resolution.height,
            pixel_format: PixelFormat::RGBA,
        }
    }

    fn latest_frame(&self) -> BackendResult<CameraFrame> {
        if self.stopped {
            return Err(CameraError::StreamFailed("stream stopped".into()));
        }
        if !self.is_alive() {
            return Err(CameraError::Disconnected(self.device.id.clone()));
        }
        let n = self.frame_number.fetch_add(1, Ordering::Relaxed);
        Ok(CameraFrame::from_rgba(self.device.render(n)))
    }

    fn is_alive(&self) -> bool {
        !self.stopped
            && self
                .shared
                .state
                .lock()
                .devices
                .iter()
                .any(|d| d.id == self.device.id)
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.shared.open_streams.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for VirtualStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Runtime controls for a [`VirtualCamera`]
#[derive(Debug, Clone)]
pub struct VirtualCameraControls {
    shared: Arc<Shared>,
}

impl VirtualCameraControls {
    /// Replace the whole device set
    pub fn set_devices(&self, devices: Vec<VirtualDevice>) {
        self.shared.state.lock().devices = devices;
    }

    /// Plug in a device
    pub fn add_device(&self, device: VirtualDevice) {
        info!(device = %device.id, "Virtual device added");
        self.shared.state.lock().devices.push(device);
    }

    /// Unplug a device; streams on it stop being alive
    pub fn remove_device(&self, id: &str) {
        info!(device = %id, "Virtual device removed");
        self.shared.state.lock().devices.retain(|d| d.id != id);
    }

    /// Refuse (or allow again) camera access
    pub fn deny_access(&self, deny: bool) {
        self.shared.state.lock().deny_access = deny;
    }

    /// Number of streams currently open
    pub fn open_streams(&self) -> usize {
        self.shared.open_streams.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_frame_has_native_size() {
        let camera = VirtualCamera::test_pattern();
        let device = camera.enumerate().unwrap().remove(0);
        let stream = camera.open(&device, Resolution::new(1920, 1080)).unwrap();

        let frame = stream.latest_frame().unwrap();
        assert_eq!((frame.width, frame.height), (1280, 720));
        assert_eq!(frame.data.len(), 1280 * 720 * 4);
    }

    #[test]
    fn test_dropping_stream_releases_it() {
        let camera = VirtualCamera::test_pattern();
        let controls = camera.controls();
        let device = camera.enumerate().unwrap().remove(0);

        let stream = camera.open(&device, Resolution::new(640, 480)).unwrap();
        assert_eq!(controls.open_streams(), 1);
        drop(stream);
        assert_eq!(controls.open_streams(), 0);
    }
}
