// SPDX-License-Identifier: GPL-3.0-only

//! Session state owned by the `camera-queue` thread

use super::command::{Command, Reply};
use super::events::{ControllerEvent, FrameObserver, SessionStatus};
use crate::backends::camera::types::CameraFrame;
use crate::backends::camera::{
    BackendError, CaptureBackend, CaptureConfig, CaptureDevice, CaptureSession, FrameSink,
    MediaType,
};
use crate::constants::timing::FRAME_LOG_INTERVAL;
use crate::controls::{self, CameraSetting};
use crate::errors::{CameraError, CameraResult, RecordingError};
use crate::pipelines::video::{RecorderFactory, RecordingSink};
use crate::preview::PreviewSurface;
use crate::storage;
use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

/// Observers shared between the handles and the capture thread
pub(super) type ObserverList = Arc<RwLock<Vec<Arc<dyn FrameObserver>>>>;

/// The active recording sink, shared with the capture thread
#[derive(Default)]
struct RecordingSlot {
    sink: Option<Box<dyn RecordingSink>>,
    failed_frames: u64,
}

type SharedRecordingSlot = Arc<Mutex<RecordingSlot>>;

/// Recording state machine
#[derive(Debug, Clone, Default)]
enum RecordingState {
    #[default]
    Idle,
    Recording {
        file_path: PathBuf,
        started_at: DateTime<Local>,
    },
}

struct Session {
    device: CaptureDevice,
    capture: Box<dyn CaptureSession>,
}

/// Where each captured frame goes
#[derive(Clone)]
struct FrameFanout {
    preview: PreviewSurface,
    recording: SharedRecordingSlot,
    observers: ObserverList,
}

impl FrameFanout {
    fn deliver(&self, frame: CameraFrame) {
        {
            let mut slot = self
                .recording
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(sink) = slot.sink.as_mut()
                && let Err(e) = sink.push_frame(&frame)
            {
                slot.failed_frames += 1;
                if slot.failed_frames % FRAME_LOG_INTERVAL == 1 {
                    warn!(
                        error = %e,
                        failed_frames = slot.failed_frames,
                        "Failed to push frame to recording"
                    );
                }
            }
        }

        let observers = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        for observer in observers.iter() {
            observer.on_frame(&frame);
        }
        drop(observers);

        self.preview.present(frame);
    }

    fn into_sink(self) -> FrameSink {
        Arc::new(move |frame| self.deliver(frame))
    }
}

pub(super) struct Worker {
    backend: Box<dyn CaptureBackend>,
    recorder: Arc<dyn RecorderFactory>,
    capture_config: CaptureConfig,
    output_dir: PathBuf,
    preview: PreviewSurface,
    observers: ObserverList,
    events: broadcast::Sender<ControllerEvent>,
    recording_slot: SharedRecordingSlot,
    recording: RecordingState,
    session: Option<Session>,
}

impl Worker {
    pub(super) fn new(
        backend: Box<dyn CaptureBackend>,
        recorder: Arc<dyn RecorderFactory>,
        capture_config: CaptureConfig,
        output_dir: PathBuf,
        preview: PreviewSurface,
        observers: ObserverList,
        events: broadcast::Sender<ControllerEvent>,
    ) -> Self {
        Self {
            backend,
            recorder,
            capture_config,
            output_dir,
            preview,
            observers,
            events,
            recording_slot: SharedRecordingSlot::default(),
            recording: RecordingState::Idle,
            session: None,
        }
    }

    /// Process commands until shutdown or until every handle is dropped
    pub(super) fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        info!(backend = %self.backend.backend_type(), "Camera queue started");

        while let Some(command) = commands.blocking_recv() {
            debug!(?command, "Processing command");
            match command {
                Command::LoadDevices(reply) => respond(reply, self.load_devices()),
                Command::ChangeDevice(device, reply) => {
                    respond(reply, self.change_device(device))
                }
                Command::StartSession(reply) => respond(reply, self.start_session()),
                Command::StopSession(reply) => respond(reply, self.stop_session()),
                Command::StartRecording(reply) => respond(reply, self.start_recording()),
                Command::StopRecording(reply) => respond(reply, self.stop_recording()),
                Command::CurrentSetting(reply) => respond(reply, self.current_setting()),
                Command::ApplySetting(setting, reply) => {
                    respond(reply, self.apply_setting(&setting))
                }
                Command::Status(reply) => respond(reply, Ok(self.status())),
                Command::Shutdown(reply) => {
                    self.teardown();
                    respond(reply, Ok(()));
                    info!("Camera queue shut down");
                    return;
                }
            }
        }

        self.teardown();
        info!("All controller handles dropped, camera queue exiting");
    }

    fn emit(&self, event: ControllerEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn load_devices(&mut self) -> CameraResult<Vec<CaptureDevice>> {
        let devices: Vec<CaptureDevice> = self
            .backend
            .enumerate_devices()
            .map_err(|e| CameraError::DeviceNotFound(e.to_string()))?
            .into_iter()
            .filter(|d| d.has_media_type(MediaType::Video))
            .collect();

        info!(count = devices.len(), "Loaded video devices");
        self.emit(ControllerEvent::DevicesLoaded(devices.clone()));
        Ok(devices)
    }

    fn change_device(&mut self, device: CaptureDevice) -> CameraResult<()> {
        info!(id = %device.id, name = %device.name, "Changing device");
        self.teardown();

        let registered = self
            .backend
            .enumerate_devices()
            .map_err(|e| CameraError::DeviceNotFound(e.to_string()))?
            .into_iter()
            .any(|d| d.id == device.id);
        if !registered {
            warn!(id = %device.id, "Device is no longer available");
            return Err(CameraError::DeviceNotFound(device.name));
        }

        let mut capture = self
            .backend
            .open_session(&device, &self.capture_config)
            .map_err(|e| match e {
                BackendError::DeviceNotFound(msg) => CameraError::DeviceNotFound(msg),
                other => CameraError::InputAttachFailed(other.to_string()),
            })?;

        let fanout = FrameFanout {
            preview: self.preview.clone(),
            recording: Arc::clone(&self.recording_slot),
            observers: Arc::clone(&self.observers),
        };
        capture
            .attach_frame_output(fanout.into_sink())
            .map_err(|e| CameraError::OutputAttachFailed(e.to_string()))?;

        self.preview
            .bind(&device)
            .map_err(|e| CameraError::PreviewWiringFailed(e.to_string()))?;

        self.session = Some(Session { device, capture });
        self.start_session()
    }

    fn start_session(&mut self) -> CameraResult<()> {
        let session = self.session.as_mut().ok_or(CameraError::NoActiveSession)?;
        if session.capture.is_running() {
            debug!(id = %session.device.id, "Session already running");
            return Ok(());
        }

        session.capture.start().map_err(|e| {
            error!(id = %session.device.id, error = %e, "Failed to start session");
            CameraError::InputAttachFailed(e.to_string())
        })?;

        info!(id = %session.device.id, "Session started");
        let device = session.device.clone();
        self.emit(ControllerEvent::SessionStarted { device });
        Ok(())
    }

    fn stop_session(&mut self) -> CameraResult<()> {
        if self.session.is_none() {
            return Err(CameraError::NoActiveSession);
        }

        self.finalize_recording();

        let Some(session) = self.session.as_mut() else {
            return Err(CameraError::NoActiveSession);
        };
        if !session.capture.is_running() {
            debug!(id = %session.device.id, "Session already stopped");
            return Ok(());
        }

        if let Err(e) = session.capture.stop() {
            warn!(id = %session.device.id, error = %e, "Error while stopping session");
        }
        info!(id = %session.device.id, "Session stopped");
        let device = session.device.clone();
        self.emit(ControllerEvent::SessionStopped { device });
        Ok(())
    }

    /// Release the current session, finalizing any recording first
    fn teardown(&mut self) {
        if self.session.is_none() {
            return;
        }
        if let Err(e) = self.stop_session() {
            debug!(error = %e, "Nothing to stop");
        }
        if let Some(session) = self.session.take() {
            debug!(id = %session.device.id, "Releasing session");
            drop(session);
        }
        self.preview.unbind();
    }

    fn start_recording(&mut self) -> CameraResult<PathBuf> {
        let session = self.session.as_ref().ok_or(CameraError::NoActiveSession)?;
        if let RecordingState::Recording { .. } = self.recording {
            return Err(RecordingError::AlreadyRecording.into());
        }
        if !session.capture.is_running() {
            return Err(RecordingError::StartFailed("session is not running".into()).into());
        }

        let file_path = storage::recording_output_path(&self.output_dir)
            .map_err(|e| RecordingError::StartFailed(e.to_string()))?;
        let sink = self.recorder.create(file_path.clone())?;

        {
            let mut slot = self
                .recording_slot
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            slot.sink = Some(sink);
            slot.failed_frames = 0;
        }

        let started_at = Local::now();
        self.recording = RecordingState::Recording {
            file_path: file_path.clone(),
            started_at,
        };
        info!(path = %file_path.display(), "Recording started");
        self.emit(ControllerEvent::RecordingStarted {
            path: file_path.clone(),
            started_at,
        });
        Ok(file_path)
    }

    fn stop_recording(&mut self) -> CameraResult<PathBuf> {
        if self.session.is_none() {
            return Err(CameraError::NoActiveSession);
        }
        if let RecordingState::Idle = self.recording {
            return Err(RecordingError::NotRecording.into());
        }
        self.finish_recording().map_err(CameraError::from)
    }

    /// Stop any recording in progress; failures are reported as events
    fn finalize_recording(&mut self) {
        if let RecordingState::Recording { .. } = self.recording
            && let Err(e) = self.finish_recording()
        {
            warn!(error = %e, "Recording did not finalize cleanly");
        }
    }

    fn finish_recording(&mut self) -> Result<PathBuf, RecordingError> {
        let RecordingState::Recording {
            file_path,
            started_at,
        } = std::mem::take(&mut self.recording)
        else {
            return Err(RecordingError::NotRecording);
        };

        // Take the sink out first so the capture thread stops pushing
        let sink = self
            .recording_slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sink
            .take();
        let Some(sink) = sink else {
            let error = RecordingError::StopFailed("recording sink is missing".into());
            self.emit(ControllerEvent::RecordingFailed {
                path: file_path,
                error: error.clone(),
            });
            return Err(error);
        };

        let elapsed = Local::now().signed_duration_since(started_at);
        match sink.finish() {
            Ok(path) => {
                info!(
                    path = %path.display(),
                    seconds = elapsed.num_seconds(),
                    "Recording finished"
                );
                self.emit(ControllerEvent::RecordingFinished { path: path.clone() });
                Ok(path)
            }
            Err(e) => {
                error!(path = %file_path.display(), error = %e, "Recording failed");
                self.emit(ControllerEvent::RecordingFailed {
                    path: file_path,
                    error: e.clone(),
                });
                Err(e)
            }
        }
    }

    fn current_setting(&mut self) -> CameraResult<CameraSetting> {
        let session = self.session.as_mut().ok_or(CameraError::NoActiveSession)?;
        Ok(controls::read_setting(session.capture.controls()))
    }

    fn apply_setting(&mut self, setting: &CameraSetting) -> CameraResult<()> {
        let session = self.session.as_mut().ok_or(CameraError::NoActiveSession)?;
        controls::apply_setting(session.capture.controls(), setting).map_err(|e| {
            warn!(id = %session.device.id, error = %e, "Failed to apply settings");
            CameraError::SettingApplyFailed(e.to_string())
        })?;
        info!(id = %session.device.id, ?setting, "Settings applied");
        Ok(())
    }

    fn status(&self) -> SessionStatus {
        let recording = match &self.recording {
            RecordingState::Recording { file_path, .. } => Some(file_path.clone()),
            RecordingState::Idle => None,
        };
        match &self.session {
            Some(session) => SessionStatus {
                device: Some(session.device.clone()),
                running: session.capture.is_running(),
                recording,
            },
            None => SessionStatus {
                recording,
                ..SessionStatus::default()
            },
        }
    }
}

fn respond<T>(reply: Reply<T>, result: CameraResult<T>) {
    if reply.send(result).is_err() {
        debug!("Caller went away before the reply was sent");
    }
}
