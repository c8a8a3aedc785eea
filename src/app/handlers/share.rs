// SPDX-License-Identifier: GPL-3.0-only

//! Overlay, gallery, upload and save handlers

use crate::app::state::{Effect, Phase, SessionState, UploadStatus};
use crate::constants::CaptureMode;
use crate::errors::UploadError;
use crate::pipelines::photo::Overlay;
use tracing::{debug, info, warn};

impl SessionState {
    pub(crate) fn handle_overlay_loaded(&mut self, mode: CaptureMode, overlay: Overlay) -> Effect {
        match &overlay {
            Overlay::Ready(image) => {
                info!(mode = ?mode, width = image.width(), height = image.height(), "Overlay loaded")
            }
            Overlay::Unreadable(reason) => {
                warn!(mode = ?mode, reason = %reason, "Overlay unreadable, photos will have none");
                self.notice = Some(format!("{} overlay could not be read", mode.display_name()));
            }
        }
        self.overlays.set(mode, overlay);
        Effect::None
    }

    pub(crate) fn handle_open_from_gallery(&mut self, captured_at: i64) -> Effect {
        if self.phase == Phase::Countdown {
            debug!("Gallery is closed during countdown");
            return Effect::None;
        }
        let Some(record) = self.gallery.get(captured_at).cloned() else {
            debug!(captured_at, "Gallery photo not found");
            return Effect::None;
        };
        info!(captured_at, "Opening gallery photo");
        self.current = Some(record);
        self.phase = Phase::Result;
        self.begin_upload()
    }

    pub(crate) fn handle_retry_upload(&mut self) -> Effect {
        if self.phase != Phase::Result || !matches!(self.upload, UploadStatus::Failed(_)) {
            return Effect::None;
        }
        self.begin_upload()
    }

    pub(crate) fn handle_upload_finished(
        &mut self,
        captured_at: i64,
        outcome: Result<String, UploadError>,
    ) -> Effect {
        self.uploads_in_flight.remove(&captured_at);
        let on_screen = self
            .current
            .as_ref()
            .is_some_and(|r| r.captured_at == captured_at);

        match outcome {
            Ok(url) => {
                info!(captured_at, url = %url, "Upload finished");
                self.gallery.attach_url(captured_at, &url);
                if on_screen {
                    if let Some(current) = self.current.as_mut() {
                        current.remote_url.get_or_insert_with(|| url.clone());
                    }
                    self.upload = UploadStatus::Uploaded(url);
                }
            }
            Err(UploadError::Disabled) => {
                info!("Uploads are not configured, skipping for this session");
                self.uploads_disabled = true;
                if on_screen {
                    self.upload = UploadStatus::Disabled;
                }
            }
            Err(e) => {
                warn!(captured_at, error = %e, "Upload failed");
                if on_screen {
                    self.upload = UploadStatus::Failed(e.to_string());
                }
            }
        }
        Effect::None
    }

    pub(crate) fn handle_save_local(&mut self) -> Effect {
        match &self.current {
            Some(record) => Effect::SaveToDevice(record.clone()),
            None => {
                debug!("Nothing to save");
                Effect::None
            }
        }
    }

    /// Start the upload for the record on screen unless it has a URL, one
    /// is already running, or uploads are off
    pub(crate) fn begin_upload(&mut self) -> Effect {
        let Some(record) = self.current.clone() else {
            return Effect::None;
        };
        if let Some(url) = &record.remote_url {
            self.upload = UploadStatus::Uploaded(url.clone());
            return Effect::None;
        }
        if self.uploads_disabled {
            self.upload = UploadStatus::Disabled;
            return Effect::None;
        }
        self.upload = UploadStatus::Uploading;
        if !self.uploads_in_flight.insert(record.captured_at) {
            debug!(captured_at = record.captured_at, "Upload already in flight");
            return Effect::None;
        }
        Effect::Upload(record)
    }
}

#[cfg(test)]
mod tests {
    use crate::app::state::{Effect, Message, Phase, PhotoRecord, SessionState, UploadStatus};
    use crate::constants::CaptureMode;
    use crate::errors::UploadError;
    use crate::pipelines::photo::encoding::encode_png;
    use image::RgbaImage;

    fn with_photo(captured_at: i64) -> SessionState {
        let mut state = SessionState::default();
        let image = encode_png(&RgbaImage::new(2, 2), CaptureMode::Portrait).unwrap();
        state.gallery.push(PhotoRecord::new(image, captured_at));
        state
    }

    fn is_upload(effect: &Effect) -> bool {
        matches!(effect, Effect::Upload(_))
    }

    #[test]
    fn test_revisit_with_url_does_not_upload() {
        let mut state = with_photo(5);
        assert!(is_upload(&state.update(Message::OpenFromGallery(5))));
        state.update(Message::UploadFinished {
            captured_at: 5,
            outcome: Ok("https://share/5.png".into()),
        });
        assert_eq!(state.upload, UploadStatus::Uploaded("https://share/5.png".into()));

        state.update(Message::Retake);
        assert_eq!(state.update(Message::OpenFromGallery(5)), Effect::None);
        assert_eq!(state.upload.url(), Some("https://share/5.png"));
    }

    #[test]
    fn test_revisit_while_in_flight_does_not_upload() {
        let mut state = with_photo(5);
        assert!(is_upload(&state.update(Message::OpenFromGallery(5))));
        state.update(Message::Retake);
        assert_eq!(state.update(Message::OpenFromGallery(5)), Effect::None);
        assert_eq!(state.upload, UploadStatus::Uploading);
    }

    #[test]
    fn test_disabled_is_permanent() {
        let mut state = with_photo(5);
        state.update(Message::OpenFromGallery(5));
        state.update(Message::UploadFinished {
            captured_at: 5,
            outcome: Err(UploadError::Disabled),
        });
        assert_eq!(state.upload, UploadStatus::Disabled);
        state.update(Message::Reset);
        assert_eq!(state.update(Message::OpenFromGallery(5)), Effect::None);
        assert_eq!(state.upload, UploadStatus::Disabled);
        assert_eq!(state.update(Message::RetryUpload), Effect::None);
    }

    #[test]
    fn test_failure_keeps_save_available() {
        let mut state = with_photo(5);
        state.update(Message::OpenFromGallery(5));
        state.update(Message::UploadFinished {
            captured_at: 5,
            outcome: Err(UploadError::Network("offline".into())),
        });
        assert!(matches!(state.upload, UploadStatus::Failed(_)));
        assert_eq!(state.phase, Phase::Result);
        assert!(matches!(state.update(Message::SaveLocal), Effect::SaveToDevice(_)));
        assert!(is_upload(&state.update(Message::RetryUpload)));
    }

    #[test]
    fn test_late_url_lands_in_gallery_after_retake() {
        let mut state = with_photo(5);
        state.update(Message::OpenFromGallery(5));
        state.update(Message::Retake);
        state.update(Message::UploadFinished {
            captured_at: 5,
            outcome: Ok("https://share/5.png".into()),
        });
        assert_eq!(state.upload, UploadStatus::Idle);
        assert_eq!(
            state.gallery.get(5).unwrap().remote_url.as_deref(),
            Some("https://share/5.png")
        );
    }
}
