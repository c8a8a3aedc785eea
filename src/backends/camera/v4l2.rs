// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 capture source
//!
//! Each open stream owns a capture thread that dequeues mmap buffers and
//! keeps only the most recent one. MJPEG buffers are stored as-is and
//! decoded when a frame is actually read.

use super::types::*;
use super::{MediaSource, MediaStream};
use crate::constants::Resolution;
use crate::errors::CameraError;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use v4l::buffer::Type;
use v4l::capability::Flags;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

/// Number of mmap buffers requested from the driver
const BUFFER_COUNT: u32 = 4;

/// A stream that produces nothing for this long counts as failed
const DEQUEUE_TIMEOUT: Duration = Duration::from_secs(3);

/// Formats we can convert, in order of preference
const PREFERRED_FORMATS: [PixelFormat; 3] =
    [PixelFormat::MJPEG, PixelFormat::YUYV, PixelFormat::RGB24];

/// V4L2 capture source
#[derive(Debug, Default)]
pub struct V4l2Source;

impl V4l2Source {
    pub fn new() -> Self {
        Self
    }
}

fn capture_info(path: &Path) -> std::io::Result<Option<DeviceInfo>> {
    let device = Device::with_path(path)?;
    let caps = device.query_caps()?;
    if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
        return Ok(None);
    }
    Ok(Some(DeviceInfo {
        card: caps.card,
        driver: caps.driver,
        bus: caps.bus,
    }))
}

impl MediaSource for V4l2Source {
    fn name(&self) -> &'static str {
        "v4l2"
    }

    fn request_access(&self) -> BackendResult<()> {
        let nodes = v4l::context::enum_devices();
        if nodes.is_empty() {
            return Ok(());
        }

        let mut denied = 0;
        for node in &nodes {
            match Device::with_path(node.path()) {
                Ok(_) => return Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => denied += 1,
                Err(e) => debug!(path = %node.path().display(), error = %e, "Skipping node"),
            }
        }

        if denied > 0 {
            warn!(denied, "No readable video device, access denied");
            return Err(CameraError::PermissionDenied);
        }
        Ok(())
    }

    fn enumerate(&self) -> BackendResult<Vec<CameraDevice>> {
        let mut nodes = v4l::context::enum_devices();
        nodes.sort_by_key(|node| node.index());

        let mut devices = Vec::new();
        for node in nodes {
            let path = node.path().to_path_buf();
            match capture_info(&path) {
                Ok(Some(info)) => {
                    let label = node.name().unwrap_or_else(|| info.card.clone());
                    devices.push(CameraDevice {
                        id: path.display().to_string(),
                        label,
                        device_info: Some(info),
                    });
                }
                // Metadata nodes share the card name but cannot capture
                Ok(None) => {}
                Err(e) => debug!(path = %path.display(), error = %e, "Cannot query device"),
            }
        }
        Ok(devices)
    }

    fn open(&self, device: &CameraDevice, ideal: Resolution) -> BackendResult<Box<dyn MediaStream>> {
        let running = Arc::new(AtomicBool::new(true));
        let alive = Arc::new(AtomicBool::new(true));
        let latest: Arc<Mutex<Option<(Arc<[u8]>, Instant)>>> = Arc::new(Mutex::new(None));
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        let path = device.id.clone();
        let thread = {
            let running = Arc::clone(&running);
            let alive = Arc::clone(&alive);
            let latest = Arc::clone(&latest);
            std::thread::Builder::new()
                .name(format!("v4l2-capture {}", path))
                .spawn(move || capture_thread(&path, ideal, ready_tx, running, alive, latest))
                .map_err(|e| CameraError::StreamFailed(e.to_string()))?
        };

        let negotiated = match ready_rx.recv() {
            Ok(Ok(negotiated)) => negotiated,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(CameraError::StreamFailed("capture thread exited".into()));
            }
        };

        Ok(Box::new(V4l2Stream {
            device_id: device.id.clone(),
            format: negotiated.format,
            stride: negotiated.stride,
            running,
            alive,
            latest,
            thread: Some(thread),
        }))
    }
}

/// Format agreed with the driver, with its row stride
#[derive(Debug, Clone, Copy)]
struct Negotiated {
    format: CameraFormat,
    stride: u32,
}

/// Negotiate a format we can convert, closest to `ideal`
fn negotiate(device: &Device, ideal: Resolution) -> BackendResult<Negotiated> {
    let mut last_seen = None;
    for wanted in PREFERRED_FORMATS {
        let mut format = device.format()?;
        format.width = ideal.width;
        format.height = ideal.height;
        format.fourcc = FourCC::new(&fourcc_bytes(wanted));
        let applied = device.set_format(&format)?;

        let code = applied.fourcc.str().unwrap_or_default().to_string();
        if PixelFormat::from_fourcc(&code) == Some(wanted) {
            let format = CameraFormat {
                width: applied.width,
                height: applied.height,
                pixel_format: wanted,
            };
            match format.check_convertible() {
                Ok(()) => {
                    return Ok(Negotiated {
                        format,
                        stride: format.row_stride(applied.stride),
                    });
                }
                Err(e) => warn!(format = %format, error = %e, "Driver format not usable"),
            }
        }
        last_seen = Some(code);
    }

    Err(CameraError::StreamFailed(format!(
        "no supported pixel format (device offers {})",
        last_seen.unwrap_or_default()
    )))
}

fn fourcc_bytes(format: PixelFormat) -> [u8; 4] {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(format.fourcc().as_bytes());
    bytes
}

fn capture_thread(
    path: &str,
    ideal: Resolution,
    ready: std::sync::mpsc::Sender<BackendResult<Negotiated>>,
    running: Arc<AtomicBool>,
    alive: Arc<AtomicBool>,
    latest: Arc<Mutex<Option<(Arc<[u8]>, Instant)>>>,
) {
    let setup = Device::with_path(path)
        .map_err(CameraError::from)
        .and_then(|device| negotiate(&device, ideal).map(|negotiated| (device, negotiated)));
    let (device, negotiated) = match setup {
        Ok(ok) => ok,
        Err(e) => {
            alive.store(false, Ordering::SeqCst);
            let _ = ready.send(Err(e));
            return;
        }
    };

    let mut stream = match Stream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT) {
        Ok(stream) => stream,
        Err(e) => {
            alive.store(false, Ordering::SeqCst);
            let _ = ready.send(Err(CameraError::from(e)));
            return;
        }
    };
    stream.set_timeout(DEQUEUE_TIMEOUT);

    let _ = ready.send(Ok(negotiated));
    info!(
        path,
        format = %negotiated.format,
        stride = negotiated.stride,
        "Capture thread started"
    );

    while running.load(Ordering::SeqCst) {
        match stream.next() {
            Ok((buffer, meta)) => {
                let used = match meta.bytesused as usize {
                    0 => buffer.len(),
                    n => n.min(buffer.len()),
                };
                *latest.lock() = Some((Arc::from(&buffer[..used]), Instant::now()));
            }
            Err(e) => {
                error!(path, error = %e, "Capture failed");
                alive.store(false, Ordering::SeqCst);
                break;
            }
        }
    }

    debug!(path, "Capture thread stopped");
}

struct V4l2Stream {
    device_id: String,
    format: CameraFormat,
    /// Bytes per row as reported by the driver
    stride: u32,
    running: Arc<AtomicBool>,
    alive: Arc<AtomicBool>,
    latest: Arc<Mutex<Option<(Arc<[u8]>, Instant)>>>,
    thread: Option<JoinHandle<()>>,
}

impl MediaStream for V4l2Stream {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn format(&self) -> CameraFormat {
        self.format
    }

    fn latest_frame(&self) -> BackendResult<CameraFrame> {
        let (data, captured_at) = self
            .latest
            .lock()
            .clone()
            .ok_or(CameraError::NoFrameAvailable)?;
        Ok(CameraFrame {
            width: self.format.width,
            height: self.format.height,
            data,
            format: self.format.pixel_format,
            stride: self.stride,
            captured_at,
        })
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst) && Path::new(&self.device_id).exists()
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!(device = %self.device_id, "Capture thread panicked");
            }
            info!(device = %self.device_id, "Stream released");
        }
    }
}

impl Drop for V4l2Stream {
    fn drop(&mut self) {
        self.stop();
    }
}
