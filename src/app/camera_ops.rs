// SPDX-License-Identifier: GPL-3.0-only

//! Camera operations for the kiosk
//!
//! Camera calls block, so they run on the blocking pool. Opening, closing
//! and capturing are awaited in the event loop, which keeps device
//! switches strictly ordered; listing runs in the background.

use super::kiosk::Kiosk;
use crate::app::state::Message;
use crate::constants::CaptureMode;
use crate::errors::{AppError, CameraError};
use image::RgbaImage;
use std::sync::Arc;
use tracing::{debug, error, warn};

impl Kiosk {
    /// Read the current frame and compose it
    ///
    /// The outcome is handled before any other queued message.
    pub(super) async fn capture(
        &mut self,
        generation: u64,
        mode: CaptureMode,
        overlay: Option<Arc<RgbaImage>>,
    ) {
        let camera = self.camera.clone();
        let captured_at = chrono::Utc::now().timestamp_millis();
        let frame = match tokio::task::spawn_blocking(move || camera.capture_frame()).await {
            Ok(frame) => frame.map_err(AppError::from),
            Err(e) => Err(AppError::Other(format!("capture task failed: {}", e))),
        };

        let composed = match frame {
            Ok(frame) => self
                .pipeline
                .compose_async(frame, overlay, mode)
                .await
                .map_err(AppError::from),
            Err(e) => Err(e),
        };

        let message = match composed {
            Ok(image) => Message::Captured {
                generation,
                image,
                captured_at,
            },
            Err(error) => Message::CaptureFailed { generation, error },
        };
        self.queue.push_front(message);
    }

    /// Open `device_id`, closing whatever was open before
    pub(super) async fn open_device(&mut self, device_id: String) {
        let camera = self.camera.clone();
        let ideal = self.ideal_resolution;
        let id = device_id.clone();
        let message = match tokio::task::spawn_blocking(move || camera.open(&id, ideal)).await {
            Ok(Ok(format)) => Message::StreamOpened { device_id, format },
            Ok(Err(error)) => Message::StreamFailed { device_id, error },
            Err(e) => Message::StreamFailed {
                device_id,
                error: CameraError::StreamFailed(e.to_string()),
            },
        };
        self.queue.push_front(message);
    }

    pub(super) async fn close_stream(&mut self) {
        let camera = self.camera.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || camera.close()).await {
            error!(error = %e, "Failed to close camera stream");
        }
    }

    pub(super) fn spawn_list_devices(&self) {
        self.spawn_enumeration(false);
    }

    /// Re-list devices and check that the open stream still delivers
    pub(super) fn spawn_device_poll(&self) {
        self.spawn_enumeration(true);
    }

    fn spawn_enumeration(&self, check_stream: bool) {
        let camera = self.camera.clone();
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let result = tokio::task::spawn_blocking(move || {
                let lost = if check_stream && camera.stream_alive() == Some(false) {
                    camera.active_device_id()
                } else {
                    None
                };
                (lost, camera.list_devices())
            })
            .await;

            let (lost, listed) = match result {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "Camera enumeration task failed");
                    return;
                }
            };
            if let Some(device_id) = lost {
                let _ = tx.send(Message::StreamLost { device_id });
            }
            let message = match listed {
                Ok(devices) => Message::DevicesListed(devices),
                Err(error) => Message::DeviceListFailed(error),
            };
            debug!(check_stream, "Camera enumeration done");
            let _ = tx.send(message);
        });
    }
}
