// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the camera recorder

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for controller operations
pub type CameraResult<T> = Result<T, CameraError>;

/// Top-level application error
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera controller errors
    Camera(CameraError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Errors raised by the capture session controller
///
/// Each variant is terminal for the operation that raised it; nothing is
/// retried automatically.
#[derive(Debug, Clone, PartialEq)]
pub enum CameraError {
    /// The requested device is not (or no longer) in the device registry
    DeviceNotFound(String),
    /// The device could not be opened as a session input
    InputAttachFailed(String),
    /// The frame output could not be attached to the session
    OutputAttachFailed(String),
    /// The preview surface could not be bound to the session
    PreviewWiringFailed(String),
    /// No session has been prepared
    NoActiveSession,
    /// Exposure or white balance could not be applied to the device
    SettingApplyFailed(String),
    /// Recording state machine or sink failure
    Recording(RecordingError),
    /// The controller worker is gone
    ControllerUnavailable,
}

/// Recording-specific errors
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingError {
    /// Failed to start recording
    StartFailed(String),
    /// Failed to stop recording
    StopFailed(String),
    /// No usable encoder element
    EncoderNotAvailable(String),
    /// Recording already in progress
    AlreadyRecording,
    /// No recording in progress
    NotRecording,
    /// Pipeline error during recording
    PipelineError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::DeviceNotFound(msg) => write!(f, "Cannot detect camera device: {}", msg),
            CameraError::InputAttachFailed(msg) => write!(f, "Cannot add camera input: {}", msg),
            CameraError::OutputAttachFailed(msg) => write!(f, "Cannot add video output: {}", msg),
            CameraError::PreviewWiringFailed(msg) => {
                write!(f, "Preview connection error: {}", msg)
            }
            CameraError::NoActiveSession => write!(f, "No active camera session"),
            CameraError::SettingApplyFailed(msg) => write!(f, "Failed to apply setting: {}", msg),
            CameraError::Recording(e) => write!(f, "Recording error: {}", e),
            CameraError::ControllerUnavailable => write!(f, "Camera controller is not running"),
        }
    }
}

impl fmt::Display for RecordingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingError::StartFailed(msg) => write!(f, "Failed to start recording: {}", msg),
            RecordingError::StopFailed(msg) => write!(f, "Failed to stop recording: {}", msg),
            RecordingError::EncoderNotAvailable(msg) => write!(f, "Encoder not available: {}", msg),
            RecordingError::AlreadyRecording => write!(f, "Recording already in progress"),
            RecordingError::NotRecording => write!(f, "No recording in progress"),
            RecordingError::PipelineError(msg) => write!(f, "Pipeline error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CameraError {}
impl std::error::Error for RecordingError {}

impl From<CameraError> for AppError {
    fn from(err: CameraError) -> Self {
        AppError::Camera(err)
    }
}

impl From<RecordingError> for CameraError {
    fn from(err: RecordingError) -> Self {
        CameraError::Recording(err)
    }
}

impl From<RecordingError> for AppError {
    fn from(err: RecordingError) -> Self {
        AppError::Camera(CameraError::Recording(err))
    }
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

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}
