// SPDX-License-Identifier: GPL-3.0-only

//! Application state management

use super::frame_stats::FrameStats;
use super::settings_panel::SettingsPanel;
use crate::backends::camera::types::CaptureDevice;
use crate::config::Config;
use crate::controller::{CameraController, ControllerEvent};
use crate::preview::PreviewSurface;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Runtime;
use tokio::sync::broadcast;

/// Recording state machine as seen by the UI
///
/// Simple two-state design: either recording or not.
#[derive(Debug, Default, Clone, PartialEq)]
pub enum RecordingState {
    #[default]
    Idle,
    Recording {
        /// When recording started
        start_time: Instant,
        /// Output file path
        file_path: PathBuf,
    },
}

impl RecordingState {
    pub fn is_recording(&self) -> bool {
        matches!(self, RecordingState::Recording { .. })
    }

    pub fn file_path(&self) -> Option<&Path> {
        match self {
            RecordingState::Idle => None,
            RecordingState::Recording { file_path, .. } => Some(file_path),
        }
    }

    /// Elapsed recording time in whole seconds
    pub fn elapsed_duration(&self) -> u64 {
        match self {
            RecordingState::Idle => 0,
            RecordingState::Recording { start_time, .. } => start_time.elapsed().as_secs(),
        }
    }

    pub fn start(file_path: PathBuf) -> Self {
        RecordingState::Recording {
            start_time: Instant::now(),
            file_path,
        }
    }

    /// Stop recording (returns the previous state)
    pub fn stop(&mut self) -> Self {
        std::mem::replace(self, RecordingState::Idle)
    }
}

/// Everything the UI can ask for
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // ===== Camera Control =====
    /// Re-read the device list
    LoadDevices,
    /// Select specific camera by index into the device list
    SelectCamera(usize),
    /// Switch to the next camera
    SwitchCamera,
    /// Switch to the previous camera
    SwitchCameraPrev,
    /// Pause or resume the live session
    ToggleSession,
    /// Toggle mirror preview (horizontal flip)
    ToggleMirrorPreview,

    // ===== Device Picker =====
    ToggleDevicePicker,
    /// Move the highlighted entry by an offset
    DevicePickerMove(i32),
    DevicePickerSelect,

    // ===== Recording =====
    ToggleRecording,

    // ===== Settings Panel =====
    OpenSettings,
    SettingsFocusNext,
    SettingsFocusPrev,
    /// Nudge the focused slider by a number of steps
    SettingsNudge(i32),
    /// Press the focused checkbox or button
    SettingsActivate,
    SettingsApply,
    SettingsClose,

    // ===== System =====
    Quit,
}

/// The main application model
pub struct AppModel {
    pub config: Config,
    pub(super) runtime: Runtime,
    pub(super) controller: CameraController,
    pub(super) events: broadcast::Receiver<ControllerEvent>,
    /// Surface the terminal renders from
    pub preview: PreviewSurface,
    pub frame_stats: Arc<FrameStats>,
    /// Video-capable devices in registry order
    pub devices: Vec<CaptureDevice>,
    /// Index into `devices` of the active session's device
    pub current_device: Option<usize>,
    /// Whether the session is streaming
    pub session_running: bool,
    pub recording: RecordingState,
    /// Highlighted entry while the device picker is open
    pub device_picker: Option<usize>,
    pub settings_panel: Option<SettingsPanel>,
    /// Last informational or error message for the status bar
    pub status_message: Option<String>,
    pub should_quit: bool,
}

impl AppModel {
    pub fn current_camera(&self) -> Option<&CaptureDevice> {
        self.current_device.and_then(|i| self.devices.get(i))
    }
}
