// SPDX-License-Identifier: GPL-3.0-only

//! What the controller tells the outside world

use crate::backends::camera::types::{CameraFrame, CaptureDevice};
use crate::errors::RecordingError;
use chrono::{DateTime, Local};
use std::path::PathBuf;

/// Lifecycle notifications broadcast by the controller
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// Video-capable devices found by `load_devices`
    DevicesLoaded(Vec<CaptureDevice>),
    SessionStarted {
        device: CaptureDevice,
    },
    SessionStopped {
        device: CaptureDevice,
    },
    RecordingStarted {
        path: PathBuf,
        started_at: DateTime<Local>,
    },
    RecordingFinished {
        path: PathBuf,
    },
    /// Finalizing the file failed; the recording is over either way
    RecordingFailed {
        path: PathBuf,
        error: RecordingError,
    },
}

/// Receives every captured frame
///
/// Called synchronously on the capture thread. Implementations must return
/// quickly; a slow observer stalls delivery for everyone.
pub trait FrameObserver: Send + Sync {
    fn on_frame(&self, frame: &CameraFrame);
}

/// Snapshot of the controller state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStatus {
    /// Device the session is bound to, if any
    pub device: Option<CaptureDevice>,
    pub running: bool,
    /// Output path of the recording in progress
    pub recording: Option<PathBuf>,
}

impl SessionStatus {
    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }
}
