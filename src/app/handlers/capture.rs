// SPDX-License-Identifier: GPL-3.0-only

//! Countdown and capture handlers
//!
//! `setup -> countdown -> result -> setup`. Every handler is safe to call
//! in any phase; messages that do not apply are dropped, which is what
//! makes duplicate or late remote commands harmless.

use crate::app::state::{Effect, Phase, PhotoRecord, SessionState, UploadStatus};
use crate::constants::{CaptureMode, TimerDuration};
use crate::errors::{AppError, CameraError};
use crate::pipelines::photo::CompositeResult;
use tracing::{debug, info, warn};

impl SessionState {
    pub(crate) fn handle_start_countdown(&mut self) -> Effect {
        if self.phase == Phase::Countdown {
            debug!("Countdown already running");
            return Effect::None;
        }
        if !self.can_start_countdown() {
            debug!(
                phase = ?self.phase,
                camera_error = ?self.camera_error,
                stream_ready = self.stream_ready(),
                "Countdown not possible now"
            );
            return Effect::None;
        }

        let seconds = self.timer.seconds();
        self.countdown_generation += 1;
        self.countdown = Some(seconds);
        self.phase = Phase::Countdown;
        info!(seconds, generation = self.countdown_generation, "Starting countdown");
        Effect::StartTicker {
            generation: self.countdown_generation,
        }
    }

    pub(crate) fn handle_tick(&mut self, generation: u64) -> Effect {
        if self.phase != Phase::Countdown || generation != self.countdown_generation {
            debug!(generation, "Ignoring stale countdown tick");
            return Effect::None;
        }
        let remaining = match self.countdown {
            Some(remaining) if remaining > 0 => remaining - 1,
            // Already at zero, the capture is under way
            _ => return Effect::None,
        };
        self.countdown = Some(remaining);

        if remaining > 0 {
            debug!(remaining, "Countdown tick");
            return Effect::None;
        }

        info!(mode = ?self.mode, "Countdown complete - capturing");
        Effect::batch([
            Effect::StopTicker,
            Effect::Capture {
                generation,
                mode: self.mode,
                overlay: self.overlay_image(),
            },
        ])
    }

    pub(crate) fn handle_captured(
        &mut self,
        generation: u64,
        image: CompositeResult,
        captured_at: i64,
    ) -> Effect {
        if self.phase != Phase::Countdown || generation != self.countdown_generation {
            debug!(generation, "Dropping capture from a cancelled countdown");
            return Effect::None;
        }

        // Capture times identify records, keep them strictly increasing
        let captured_at = match self.gallery.latest() {
            Some(latest) if captured_at <= latest.captured_at => latest.captured_at + 1,
            _ => captured_at,
        };

        let record = PhotoRecord::new(image, captured_at);
        info!(
            captured_at,
            width = record.image.width,
            height = record.image.height,
            "Photo captured"
        );
        self.gallery.push(record.clone());
        self.current = Some(record);
        self.countdown = None;
        self.phase = Phase::Result;
        self.begin_upload()
    }

    pub(crate) fn handle_capture_failed(&mut self, generation: u64, error: AppError) -> Effect {
        if generation != self.countdown_generation || self.phase != Phase::Countdown {
            debug!(generation, error = %error, "Ignoring failure from a cancelled countdown");
            return Effect::None;
        }
        warn!(error = %error, "Capture failed");
        // A missing frame is transient, anything else needs the camera reopened
        if let AppError::Camera(camera_error) = &error
            && *camera_error != CameraError::NoFrameAvailable
        {
            self.camera_error = Some(camera_error.clone());
            self.stream_format = None;
        }
        self.notice = Some(format!("Capture failed: {}", error));
        self.countdown = None;
        self.phase = Phase::Setup;
        Effect::None
    }

    pub(crate) fn handle_retake(&mut self) -> Effect {
        if self.phase != Phase::Result {
            debug!(phase = ?self.phase, "Retake only applies to the result screen");
            return Effect::None;
        }
        info!("Retake");
        self.clear_result();
        self.phase = Phase::Setup;
        Effect::None
    }

    pub(crate) fn handle_reset(&mut self) -> Effect {
        info!(phase = ?self.phase, "Reset to setup");
        let effect = self.cancel_countdown();
        self.clear_result();
        self.phase = Phase::Setup;
        effect
    }

    pub(crate) fn handle_set_mode(&mut self, mode: CaptureMode) -> Effect {
        if self.phase != Phase::Setup {
            debug!(mode = ?mode, phase = ?self.phase, "Mode can only change in setup");
            return Effect::None;
        }
        if self.mode != mode {
            info!(mode = ?mode, "Capture mode changed");
            self.mode = mode;
        }
        Effect::None
    }

    pub(crate) fn handle_set_timer(&mut self, timer: TimerDuration) -> Effect {
        if self.phase == Phase::Countdown {
            debug!(timer = %timer, "Timer is locked while counting down");
            return Effect::None;
        }
        if self.timer != timer {
            info!(timer = %timer, "Timer changed");
            self.timer = timer;
        }
        Effect::None
    }

    /// Leave the countdown, invalidating any tick or capture still on its way
    pub(crate) fn cancel_countdown(&mut self) -> Effect {
        if self.phase != Phase::Countdown {
            return Effect::None;
        }
        info!(remaining = ?self.countdown, "Countdown cancelled");
        self.countdown_generation += 1;
        self.countdown = None;
        self.phase = Phase::Setup;
        Effect::StopTicker
    }

    fn clear_result(&mut self) {
        self.current = None;
        self.upload = UploadStatus::Idle;
    }
}
