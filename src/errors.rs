// SPDX-License-Identifier: MPL-2.0

//! Error types for the photo booth

use thiserror::Error;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Camera-related errors
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),
    /// Compositing and encoding errors
    #[error("Photo error: {0}")]
    Photo(#[from] PhotoError),
    /// Upload service errors
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),
    /// Realtime channel errors
    #[error("Remote channel error: {0}")]
    Channel(#[from] ChannelError),
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Storage/filesystem errors
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

/// Camera-specific errors
///
/// Cloneable so the session state can carry the current one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    /// The user or the system refused camera access
    #[error("Camera access denied, check permissions")]
    PermissionDenied,
    /// No camera devices found
    #[error("No camera devices found")]
    NoCameraFound,
    /// The active camera went away mid-session
    #[error("Camera disconnected: {0}")]
    Disconnected(String),
    /// Requested device id is unknown
    #[error("Device not found: {0}")]
    DeviceNotFound(String),
    /// Stream could not be started or stopped delivering frames
    #[error("Failed to start camera stream: {0}")]
    StreamFailed(String),
    /// Stream is open but has not produced a frame yet
    #[error("No frame available for capture")]
    NoFrameAvailable,
}

/// Compositing and encoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhotoError {
    /// Frame buffer does not match its declared format
    #[error("Unsupported frame: {0}")]
    UnsupportedFrame(String),
    /// PNG encoding failed
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),
    /// Writing the photo to disk failed
    #[error("Save failed: {0}")]
    SaveFailed(String),
}

/// Upload service errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// No credentials configured, uploads are skipped for the session
    #[error("Upload disabled: no credentials configured")]
    Disabled,
    /// Transport failure
    #[error("Network error: {0}")]
    Network(String),
    /// Service answered with an error
    #[error("Upload service error: {0}")]
    Service(String),
    /// Service answered but the locator is unusable
    #[error("Invalid upload response: {0}")]
    InvalidResponse(String),
}

/// Realtime channel errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// Sending while the channel is not connected
    #[error("Not connected")]
    NotConnected,
    /// Could not subscribe to the channel
    #[error("Failed to join channel: {0}")]
    JoinFailed(String),
    /// Could not publish a message
    #[error("Failed to send: {0}")]
    SendFailed(String),
    /// Peer sent something that does not follow the relay protocol
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No configuration directory available")]
    NoConfigDir,
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for PhotoError {
    fn from(err: std::io::Error) -> Self {
        PhotoError::SaveFailed(err.to_string())
    }
}

impl From<std::io::Error> for CameraError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => CameraError::PermissionDenied,
            std::io::ErrorKind::NotFound => CameraError::DeviceNotFound(err.to_string()),
            _ => CameraError::StreamFailed(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_permission_maps_to_permission_denied() {
        let err = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert_eq!(CameraError::from(err), CameraError::PermissionDenied);
    }

    #[test]
    fn test_app_error_wraps_camera_error() {
        let err: AppError = CameraError::NoCameraFound.into();
        assert_eq!(err.to_string(), "Camera error: No camera devices found");
    }
}
