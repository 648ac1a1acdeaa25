// SPDX-License-Identifier: GPL-3.0-only

//! Application model driving the terminal UI
//!
//! The model owns a [`CameraController`] and a small tokio runtime. UI code
//! feeds it [`Message`]s through [`AppModel::update`]; controller operations
//! are awaited on the runtime so every message is fully handled when
//! `update` returns.
//!
//! # Modules
//!
//! - `state`: model fields, messages and the recording state machine
//! - `update`: message dispatch and controller event handling
//! - `settings_panel`: exposure/white balance draft view-model
//! - `frame_stats`: frame rate observer for the status bar

pub mod frame_stats;
pub mod settings_panel;
mod state;
mod update;

pub use frame_stats::FrameStats;
pub use settings_panel::{PanelAction, SettingsField, SettingsPanel};
pub use state::{AppModel, Message, RecordingState};

use crate::backends::camera::CaptureBackend;
use crate::config::Config;
use crate::controller::{CameraController, ControllerOptions};
use crate::errors::{AppError, AppResult};
use crate::pipelines::video::RecorderFactory;
use crate::preview::PreviewSurface;
use std::sync::Arc;
use tracing::info;

impl AppModel {
    /// Build the model and start the controller worker
    ///
    /// No device is opened until [`AppModel::init`].
    pub fn new(
        config: Config,
        backend: Box<dyn CaptureBackend>,
        recorder: Arc<dyn RecorderFactory>,
    ) -> AppResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| AppError::Other(format!("Cannot start async runtime: {}", e)))?;

        let preview = PreviewSurface::new(config.mirror_preview);
        let controller = CameraController::spawn(
            backend,
            recorder,
            preview.clone(),
            ControllerOptions {
                output_dir: config.recordings_dir(),
                capture: config.capture_config(),
            },
        )?;

        let frame_stats = Arc::new(FrameStats::new());
        controller.add_frame_observer(frame_stats.clone());
        let events = controller.subscribe();

        Ok(Self {
            config,
            runtime,
            controller,
            events,
            preview,
            frame_stats,
            devices: Vec::new(),
            current_device: None,
            session_running: false,
            recording: RecordingState::Idle,
            device_picker: None,
            settings_panel: None,
            status_message: None,
            should_quit: false,
        })
    }

    /// Load the device list and open the preferred camera
    ///
    /// Prefers the configured `last_camera_path`, then the first device.
    pub fn init(&mut self) {
        self.update(Message::LoadDevices);
        if self.devices.is_empty() {
            return;
        }

        let index = self
            .config
            .last_camera_path
            .as_deref()
            .and_then(|id| self.devices.iter().position(|d| d.id == id))
            .unwrap_or(0);
        info!(index, "Opening initial camera");
        self.update(Message::SelectCamera(index));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::CameraBackendType;
    use crate::backends::camera::types::CameraFrame;
    use crate::backends::virtual_camera::VirtualBackend;
    use crate::errors::RecordingError;
    use crate::pipelines::video::RecordingSink;
    use std::path::{Path, PathBuf};

    struct NullRecorder;

    struct NullSink(PathBuf);

    impl RecordingSink for NullSink {
        fn path(&self) -> &Path {
            &self.0
        }

        fn push_frame(&mut self, _frame: &CameraFrame) -> Result<(), RecordingError> {
            Ok(())
        }

        fn finish(self: Box<Self>) -> Result<PathBuf, RecordingError> {
            Ok(self.0)
        }
    }

    impl RecorderFactory for NullRecorder {
        fn create(&self, path: PathBuf) -> Result<Box<dyn RecordingSink>, RecordingError> {
            Ok(Box::new(NullSink(path)))
        }
    }

    fn model(dir: &Path) -> AppModel {
        let config = Config {
            backend: CameraBackendType::Virtual,
            output_dir: Some(dir.to_path_buf()),
            ..Config::default()
        };
        let mut model = AppModel::new(
            config,
            Box::new(VirtualBackend::default()),
            Arc::new(NullRecorder),
        )
        .unwrap();
        model.init();
        model
    }

    #[test]
    fn test_init_opens_first_video_device() {
        let dir = tempfile::tempdir().unwrap();
        let model = model(dir.path());

        assert_eq!(model.devices.len(), 2);
        assert_eq!(model.current_device, Some(0));
        assert!(model.session_running);
        assert_eq!(model.preview.bound_device().as_deref(), Some("virtual:0"));
    }

    #[test]
    fn test_init_prefers_last_camera() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            output_dir: Some(dir.path().to_path_buf()),
            last_camera_path: Some("virtual:1".into()),
            ..Config::default()
        };
        let mut model = AppModel::new(
            config,
            Box::new(VirtualBackend::default()),
            Arc::new(NullRecorder),
        )
        .unwrap();
        model.init();
        assert_eq!(model.current_device, Some(1));
    }

    #[test]
    fn test_record_toggle() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = model(dir.path());

        model.update(Message::ToggleRecording);
        let path = model.recording.file_path().map(Path::to_path_buf).unwrap();
        assert!(path.starts_with(dir.path()));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("mov"));

        model.update(Message::ToggleRecording);
        assert!(!model.recording.is_recording());
        assert!(model.status_message.as_deref().unwrap().starts_with("Saved"));
    }

    #[test]
    fn test_switching_camera_ends_recording() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = model(dir.path());

        model.update(Message::ToggleRecording);
        assert!(model.recording.is_recording());

        model.update(Message::SwitchCamera);
        model.poll_events();
        assert_eq!(model.current_device, Some(1));
        assert!(!model.recording.is_recording());
        assert_eq!(model.config.last_camera_path.as_deref(), Some("virtual:1"));
    }

    #[test]
    fn test_settings_apply_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = model(dir.path());

        model.update(Message::OpenSettings);
        let panel = model.settings_panel.as_mut().unwrap();
        panel.set_auto_exposure(false);
        panel.set_exposure(0.4);

        model.update(Message::SettingsApply);
        assert!(model.settings_panel.is_none());

        model.update(Message::OpenSettings);
        let draft = *model.settings_panel.as_ref().unwrap().draft();
        assert!(!draft.auto_exposure);
        assert!((draft.exposure_value - 0.4).abs() < 1e-3);

        model.update(Message::SettingsClose);
        assert!(model.settings_panel.is_none());
    }

    #[test]
    fn test_paused_session_rejects_recording() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = model(dir.path());

        model.update(Message::ToggleSession);
        assert!(!model.session_running);
        model.update(Message::ToggleRecording);
        assert!(!model.recording.is_recording());
        assert!(model.status_message.as_deref().unwrap().starts_with("Error"));

        model.update(Message::ToggleSession);
        assert!(model.session_running);
    }
}
