// SPDX-License-Identifier: GPL-3.0-only

//! Message update handling
//!
//! The reducer is a plain function of the state and one message. It never
//! touches the camera, the network or the clock; everything with a side
//! effect is returned as an [`Effect`] for the runtime to carry out.
//!
//! # Handler Modules
//!
//! - `handlers::capture`: countdown, capture, retake, reset, mode and timer
//! - `handlers::camera`: device lists, selection, stream health
//! - `handlers::remote`: session codes, remote commands, link state
//! - `handlers::share`: overlays, gallery, upload, local save

use crate::app::state::{Effect, Message, SessionState};
use tracing::info;

impl SessionState {
    /// Apply one message, returning the work it requires
    pub fn update(&mut self, message: Message) -> Effect {
        match message {
            // ===== Countdown =====
            Message::StartCountdown => self.handle_start_countdown(),
            Message::Tick { generation } => self.handle_tick(generation),
            Message::Captured {
                generation,
                image,
                captured_at,
            } => self.handle_captured(generation, image, captured_at),
            Message::CaptureFailed { generation, error } => {
                self.handle_capture_failed(generation, error)
            }
            Message::Retake => self.handle_retake(),
            Message::Reset => self.handle_reset(),
            Message::SetMode(mode) => self.handle_set_mode(mode),
            Message::SetTimer(timer) => self.handle_set_timer(timer),

            // ===== Camera =====
            Message::RefreshDevices => Effect::ListDevices,
            Message::DevicesListed(devices) => self.handle_devices_listed(devices),
            Message::DeviceListFailed(error) => self.handle_device_list_failed(error),
            Message::SelectDevice(id) => self.handle_select_device(id),
            Message::StreamOpened { device_id, format } => {
                self.handle_stream_opened(device_id, format)
            }
            Message::StreamFailed { device_id, error } => {
                self.handle_stream_failed(device_id, error)
            }
            Message::StreamLost { device_id } => self.handle_stream_lost(device_id),

            // ===== Remote =====
            Message::RegenerateSessionCode => Effect::NewSessionCode,
            Message::SessionStarted(code) => self.handle_session_started(code),
            Message::Remote { code, command } => self.handle_remote_command(code, command),
            Message::RemoteLink { code, state } => self.handle_remote_link(code, state),

            // ===== Share =====
            Message::OverlayLoaded { mode, overlay } => self.handle_overlay_loaded(mode, overlay),
            Message::OverlayCleared(mode) => {
                self.overlays.clear(mode);
                Effect::None
            }
            Message::OpenFromGallery(captured_at) => self.handle_open_from_gallery(captured_at),
            Message::RetryUpload => self.handle_retry_upload(),
            Message::UploadFinished {
                captured_at,
                outcome,
            } => self.handle_upload_finished(captured_at, outcome),
            Message::SaveLocal => self.handle_save_local(),
            Message::Saved { captured_at, path } => {
                info!(captured_at, path = %path.display(), "Photo saved");
                self.notice = Some(format!("Saved to {}", path.display()));
                Effect::None
            }
            Message::SaveFailed { captured_at, error } => {
                self.notice = Some(format!("Could not save photo: {}", error));
                tracing::warn!(captured_at, error = %error, "Photo save failed");
                Effect::None
            }

            Message::Shutdown => {
                info!("Kiosk shutting down");
                self.running = false;
                Effect::batch([Effect::StopTicker, Effect::LeaveRemote, Effect::CloseStream])
            }
        }
    }
}

/// Pure form of [`SessionState::update`]
pub fn reduce(mut state: SessionState, message: Message) -> (SessionState, Effect) {
    let effect = state.update(message);
    (state, effect)
}

#[cfg(test)]
mod tests {
    use super::reduce;
    use crate::app::state::{Effect, Message, Phase, SessionState, UploadStatus};
    use crate::backends::camera::types::{CameraDevice, CameraFormat, PixelFormat};
    use crate::constants::CaptureMode;
    use crate::pipelines::photo::encoding::encode_png;
    use image::RgbaImage;

    fn ready_state() -> SessionState {
        let mut state = SessionState::default();
        state.devices = vec![CameraDevice::new("cam0", "Camera")];
        state.active_device_id = Some("cam0".into());
        state.stream_format = Some(CameraFormat {
            width: 640,
            height: 480,
            pixel_format: PixelFormat::RGBA,
        });
        state
    }

    #[test]
    fn test_reduce_runs_a_full_capture() {
        let (state, effect) = reduce(ready_state(), Message::StartCountdown);
        assert_eq!(effect, Effect::StartTicker { generation: 1 });
        assert_eq!(state.phase, Phase::Countdown);

        let (state, effect) = reduce(state, Message::Tick { generation: 1 });
        assert!(effect.is_none());
        let (state, effect) = reduce(state, Message::Tick { generation: 1 });
        assert!(effect.is_none());
        assert_eq!(state.countdown, Some(1));

        let (state, effect) = reduce(state, Message::Tick { generation: 1 });
        let effects = effect.flatten();
        assert_eq!(effects.len(), 2);
        assert_eq!(effects[0], Effect::StopTicker);
        assert!(matches!(
            effects[1],
            Effect::Capture {
                generation: 1,
                mode: CaptureMode::Portrait,
                overlay: None,
            }
        ));

        let image = encode_png(&RgbaImage::new(4, 4), CaptureMode::Portrait).unwrap();
        let (state, effect) = reduce(
            state,
            Message::Captured {
                generation: 1,
                image,
                captured_at: 1_000,
            },
        );
        assert!(matches!(&effect, Effect::Upload(record) if record.captured_at == 1_000));
        assert_eq!(state.phase, Phase::Result);
        assert_eq!(state.upload, UploadStatus::Uploading);
        assert_eq!(state.gallery.len(), 1);
    }

    #[test]
    fn test_reduce_drops_ticks_after_reset() {
        let (state, _) = reduce(ready_state(), Message::StartCountdown);
        let (state, effect) = reduce(state, Message::Reset);
        assert_eq!(effect, Effect::StopTicker);

        let (state, effect) = reduce(state, Message::Tick { generation: 1 });
        assert!(effect.is_none());
        assert_eq!(state.phase, Phase::Setup);
        assert_eq!(state.countdown, None);
    }
}
