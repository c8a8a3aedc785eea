// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │   Kiosk runtime     │
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ CameraBackendManager│  ← Device list, single open stream
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  MediaSource Trait  │  ← Permission, enumeration, open
//! └──────────┬──────────┘
//!            │
//!       ┌────┴─────┐
//!       ▼          ▼
//!   ┌──────┐  ┌─────────┐
//!   │ V4L2 │  │ Virtual │
//!   └──────┘  └─────────┘
//! ```
//!
//! All trait methods block; async callers go through `spawn_blocking`.

pub mod format_converters;
pub mod manager;
pub mod types;
#[cfg(all(target_os = "linux", feature = "v4l2"))]
pub mod v4l2;
pub mod virtual_camera;

pub use manager::CameraBackendManager;
pub use types::*;
pub use virtual_camera::{VirtualCamera, VirtualCameraControls, VirtualDevice};

use crate::constants::Resolution;
use std::sync::Arc;

/// A provider of capture devices
pub trait MediaSource: Send + Sync {
    // ===== Metadata =====

    /// Short backend name for logs
    fn name(&self) -> &'static str;

    // ===== Permission =====

    /// Ask for access to the cameras
    ///
    /// Returns `CameraError::PermissionDenied` when access is refused.
    /// Called before the first enumeration.
    fn request_access(&self) -> BackendResult<()>;

    // ===== Enumeration =====

    /// List capture devices in a stable order
    ///
    /// An empty list is not an error here; callers decide what it means.
    fn enumerate(&self) -> BackendResult<Vec<CameraDevice>>;

    // ===== Streaming =====

    /// Open a stream on `device`
    ///
    /// `ideal` is a hint: the device may settle on another resolution.
    fn open(&self, device: &CameraDevice, ideal: Resolution) -> BackendResult<Box<dyn MediaStream>>;
}

/// An open capture stream
///
/// Dropping a stream must release the device as `stop` does.
pub trait MediaStream: Send {
    /// Id of the device this stream reads from
    fn device_id(&self) -> &str;

    /// Format the device settled on
    fn format(&self) -> CameraFormat;

    /// Copy of the most recent frame
    fn latest_frame(&self) -> BackendResult<CameraFrame>;

    /// False once the device went away or the stream failed
    fn is_alive(&self) -> bool;

    /// Release the device
    fn stop(&mut self);
}

/// Pick the capture source for this platform
///
/// V4L2 on Linux builds with the `v4l2` feature, otherwise a test pattern.
pub fn default_source() -> Arc<dyn MediaSource> {
    #[cfg(all(target_os = "linux", feature = "v4l2"))]
    {
        Arc::new(v4l2::V4l2Source::new())
    }
    #[cfg(not(all(target_os = "linux", feature = "v4l2")))]
    {
        Arc::new(VirtualCamera::test_pattern())
    }
}
