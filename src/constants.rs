// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pixel dimensions of an image or stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Default output size for portrait captures (9:16)
pub const PORTRAIT_TARGET: Resolution = Resolution::new(1080, 1920);

/// Default output size for landscape captures (4:3)
pub const LANDSCAPE_TARGET: Resolution = Resolution::new(1440, 1080);

/// Resolution requested from the camera. A hint only, devices may pick another.
pub const IDEAL_STREAM_RESOLUTION: Resolution = Resolution::new(1920, 1080);

/// Capture orientation
///
/// Each mode has its own fixed output resolution and its own overlay asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// Standing frame, taller than wide
    #[default]
    Portrait,
    /// Lying frame, wider than tall
    Landscape,
}

impl CaptureMode {
    pub const ALL: [CaptureMode; 2] = [CaptureMode::Portrait, CaptureMode::Landscape];

    pub fn display_name(&self) -> &'static str {
        match self {
            CaptureMode::Portrait => "Portrait",
            CaptureMode::Landscape => "Landscape",
        }
    }

    /// The other orientation
    pub fn toggled(&self) -> Self {
        match self {
            CaptureMode::Portrait => CaptureMode::Landscape,
            CaptureMode::Landscape => CaptureMode::Portrait,
        }
    }
}

/// Countdown duration before a capture
///
/// A closed set: remote commands carrying any other value are rejected
/// during deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum TimerDuration {
    #[default]
    Three,
    Five,
    Ten,
}

impl TimerDuration {
    pub const ALL: [TimerDuration; 3] = [TimerDuration::Three, TimerDuration::Five, TimerDuration::Ten];

    /// Number of one-second ticks before the capture fires
    pub fn seconds(&self) -> u32 {
        match self {
            TimerDuration::Three => 3,
            TimerDuration::Five => 5,
            TimerDuration::Ten => 10,
        }
    }

    /// Cycle to the next duration (3 -> 5 -> 10 -> 3)
    pub fn next(&self) -> Self {
        match self {
            TimerDuration::Three => TimerDuration::Five,
            TimerDuration::Five => TimerDuration::Ten,
            TimerDuration::Ten => TimerDuration::Three,
        }
    }
}

impl TryFrom<u32> for TimerDuration {
    type Error = String;

    fn try_from(seconds: u32) -> Result<Self, Self::Error> {
        match seconds {
            3 => Ok(TimerDuration::Three),
            5 => Ok(TimerDuration::Five),
            10 => Ok(TimerDuration::Ten),
            other => Err(format!("unsupported timer duration: {}s", other)),
        }
    }
}

impl From<TimerDuration> for u32 {
    fn from(timer: TimerDuration) -> Self {
        timer.seconds()
    }
}

impl std::fmt::Display for TimerDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.seconds())
    }
}

/// Interval between countdown ticks
pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

/// Session code settings
pub mod session_code {
    /// Characters a session code is drawn from.
    /// Excludes look-alikes: 0/O, 1/I/L.
    pub const ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

    /// Number of characters in a session code
    pub const LENGTH: usize = 6;

    /// Prefix of the realtime channel derived from a session code
    pub const CHANNEL_PREFIX: &str = "photobooth-remote-";
}

/// Realtime channel settings
pub mod realtime {
    use std::time::Duration;

    /// Broadcast event name carrying remote commands
    pub const REMOTE_COMMAND_EVENT: &str = "remote-command";

    /// Current version of the remote command schema
    pub const COMMAND_SCHEMA_VERSION: u32 = 1;

    /// Buffered broadcasts per channel before slow subscribers lag
    pub const CHANNEL_CAPACITY: usize = 64;

    /// Give up on a relay that does not acknowledge a join
    pub const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

    /// Wait before the kiosk joins its channel again after losing it
    pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

    /// Default relay listen address
    pub const DEFAULT_RELAY_BIND: &str = "0.0.0.0:8787";
}

/// Maximum payload of a QR code (version 40, error correction L, byte mode)
pub const QR_MAX_BYTES: usize = 2953;

/// Number of captures kept in the session gallery by default
pub const DEFAULT_GALLERY_CAPACITY: usize = 12;

/// Seconds between device re-enumerations (hot-plug detection)
pub const DEFAULT_DEVICE_POLL_SECS: u64 = 2;

/// Default folder name for saving photos
pub const DEFAULT_SAVE_FOLDER: &str = "Photobooth";

/// Filename for a capture taken at the given unix time in milliseconds
pub fn photo_file_name(captured_at_ms: i64) -> String {
    format!("photobooth_{}.png", captured_at_ms)
}
