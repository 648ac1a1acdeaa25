// SPDX-License-Identifier: GPL-3.0-only

//! Message update handling
//!
//! `update()` routes each message to a focused handler. Handlers await the
//! controller on the model's runtime and record failures in the status bar.

use super::settings_panel::{PanelAction, SettingsPanel};
use super::state::{AppModel, Message, RecordingState};
use crate::controller::ControllerEvent;
use crate::controls::CameraSetting;
use crate::errors::CameraError;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{debug, error, info, warn};

impl AppModel {
    /// Main message handler
    pub fn update(&mut self, message: Message) {
        debug!(?message, "Handling message");
        match message {
            // ===== Camera Control =====
            Message::LoadDevices => self.handle_load_devices(),
            Message::SelectCamera(index) => self.handle_select_camera(index),
            Message::SwitchCamera => self.handle_switch_camera(1),
            Message::SwitchCameraPrev => self.handle_switch_camera(-1),
            Message::ToggleSession => self.handle_toggle_session(),
            Message::ToggleMirrorPreview => {
                self.config.mirror_preview = !self.config.mirror_preview;
                self.preview.set_mirrored(self.config.mirror_preview);
            }

            // ===== Device Picker =====
            Message::ToggleDevicePicker => {
                self.device_picker = match self.device_picker {
                    Some(_) => None,
                    None if self.devices.is_empty() => None,
                    None => Some(self.current_device.unwrap_or(0)),
                };
            }
            Message::DevicePickerMove(offset) => {
                if let Some(highlight) = self.device_picker {
                    self.device_picker = Some(wrap_index(highlight, offset, self.devices.len()));
                }
            }
            Message::DevicePickerSelect => {
                if let Some(index) = self.device_picker.take() {
                    self.handle_select_camera(index);
                }
            }

            // ===== Recording =====
            Message::ToggleRecording => self.handle_toggle_recording(),

            // ===== Settings Panel =====
            Message::OpenSettings => self.handle_open_settings(),
            Message::SettingsFocusNext => self.with_panel(SettingsPanel::focus_next),
            Message::SettingsFocusPrev => self.with_panel(SettingsPanel::focus_prev),
            Message::SettingsNudge(steps) => self.with_panel(|panel| panel.nudge(steps)),
            Message::SettingsActivate => {
                let action = self.settings_panel.as_mut().and_then(SettingsPanel::activate);
                match action {
                    Some(PanelAction::Apply(setting)) => self.handle_apply_settings(setting),
                    Some(PanelAction::Close) => self.close_settings(),
                    None => {}
                }
            }
            Message::SettingsApply => {
                if let Some(setting) = self.settings_panel.as_ref().map(SettingsPanel::apply) {
                    self.handle_apply_settings(setting);
                }
            }
            Message::SettingsClose => self.close_settings(),

            // ===== System =====
            Message::Quit => self.should_quit = true,
        }
    }

    /// Drain controller events without blocking
    pub fn poll_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.handle_event(event),
                Err(TryRecvError::Lagged(missed)) => {
                    warn!(missed, "UI fell behind controller events");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    /// Finalize any recording and stop the controller
    pub fn shutdown(&mut self) {
        if let Err(e) = self.runtime.block_on(self.controller.shutdown()) {
            debug!(error = %e, "Controller already stopped");
        }
        self.poll_events();
        self.preview.close();
    }

    fn handle_event(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::SessionStarted { device } => {
                debug!(id = %device.id, "Session started");
                self.session_running = true;
            }
            ControllerEvent::SessionStopped { device } => {
                debug!(id = %device.id, "Session stopped");
                self.session_running = false;
            }
            ControllerEvent::RecordingFinished { path } => {
                self.recording = RecordingState::Idle;
                self.status_message = Some(format!("Saved: {}", path.display()));
            }
            ControllerEvent::RecordingFailed { path, error } => {
                self.recording = RecordingState::Idle;
                self.status_message = Some(format!(
                    "Error: recording {} failed: {}",
                    path.display(),
                    error
                ));
            }
            ControllerEvent::DevicesLoaded(_) | ControllerEvent::RecordingStarted { .. } => {}
        }
    }

    fn report_error(&mut self, context: &str, error: CameraError) {
        error!(%error, "{}", context);
        self.status_message = Some(format!("Error: {}", error));
    }

    fn handle_load_devices(&mut self) {
        match self.runtime.block_on(self.controller.load_devices()) {
            Ok(devices) => {
                info!(count = devices.len(), "Devices loaded");
                if devices.is_empty() {
                    self.status_message = Some("No cameras found".into());
                }
                // Keep pointing at the same device if it is still present
                let current_id = self.current_camera().map(|d| d.id.clone());
                self.current_device =
                    current_id.and_then(|id| devices.iter().position(|d| d.id == id));
                self.devices = devices;
            }
            Err(e) => self.report_error("Failed to load devices", e),
        }
    }

    fn handle_select_camera(&mut self, index: usize) {
        let Some(device) = self.devices.get(index).cloned() else {
            warn!(index, "Camera index out of range");
            return;
        };

        let result = self
            .runtime
            .block_on(self.controller.change_device(device.clone()));
        // The previous session is gone either way, along with any recording
        self.poll_events();
        self.recording = RecordingState::Idle;

        match result {
            Ok(()) => {
                info!(id = %device.id, name = %device.name, "Camera selected");
                self.current_device = Some(index);
                self.session_running = true;
                self.config.last_camera_path = Some(device.id);
            }
            Err(e) => {
                self.current_device = None;
                self.session_running = false;
                self.report_error("Failed to select camera", e);
            }
        }
    }

    fn handle_switch_camera(&mut self, offset: i32) {
        if self.devices.len() < 2 {
            return;
        }
        let current = self.current_device.unwrap_or(0);
        self.handle_select_camera(wrap_index(current, offset, self.devices.len()));
    }

    fn handle_toggle_session(&mut self) {
        let result = if self.session_running {
            self.runtime.block_on(self.controller.stop_session())
        } else {
            self.runtime.block_on(self.controller.start_session())
        };
        self.poll_events();

        match result {
            Ok(()) => {
                if !self.session_running {
                    self.recording = RecordingState::Idle;
                }
            }
            Err(e) => self.report_error("Failed to toggle session", e),
        }
    }

    fn handle_toggle_recording(&mut self) {
        if self.recording.is_recording() {
            let result = self.runtime.block_on(self.controller.stop_recording());
            self.recording.stop();
            match result {
                Ok(path) => self.status_message = Some(format!("Saved: {}", path.display())),
                Err(e) => self.report_error("Failed to stop recording", e),
            }
            return;
        }

        match self.runtime.block_on(self.controller.start_recording()) {
            Ok(path) => {
                self.status_message = Some(format!("Recording to {}", path.display()));
                self.recording = RecordingState::start(path);
            }
            Err(e) => self.report_error("Failed to start recording", e),
        }
    }

    fn handle_open_settings(&mut self) {
        match self.runtime.block_on(self.controller.current_setting()) {
            Ok(setting) => self.settings_panel = Some(SettingsPanel::new(setting)),
            Err(e) => self.report_error("Failed to read camera settings", e),
        }
    }

    fn handle_apply_settings(&mut self, setting: CameraSetting) {
        match self.runtime.block_on(self.controller.apply_setting(setting)) {
            Ok(()) => {
                self.status_message = Some("Settings applied".into());
                self.close_settings();
            }
            Err(e) => self.report_error("Failed to apply camera settings", e),
        }
    }

    fn with_panel(&mut self, f: impl FnOnce(&mut SettingsPanel)) {
        if let Some(panel) = self.settings_panel.as_mut() {
            f(panel);
        }
    }

    fn close_settings(&mut self) {
        if let Some(panel) = self.settings_panel.take() {
            panel.close();
        }
    }
}

fn wrap_index(index: usize, offset: i32, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let len = len as i64;
    (index as i64 + offset as i64).rem_euclid(len) as usize
}
