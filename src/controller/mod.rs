// SPDX-License-Identifier: GPL-3.0-only

//! Capture session controller
//!
//! All session state lives on one worker thread (`camera-queue`). A
//! [`CameraController`] is a cheap handle that sends commands to it; every
//! operation resolves once the worker has finished it.
//!
//! ```text
//! CameraController ──Command──▶ camera-queue ──▶ CaptureBackend / CaptureSession
//!        ▲                            │
//!        └──── oneshot reply ◀────────┤
//!                                     └──broadcast──▶ ControllerEvent subscribers
//!
//! capture thread ──frame──▶ preview surface, recording sink, FrameObservers
//! ```

mod command;
mod events;
mod worker;

pub use events::{ControllerEvent, FrameObserver, SessionStatus};

use crate::backends::camera::{CaptureBackend, CaptureConfig, CaptureDevice};
use crate::controls::CameraSetting;
use crate::errors::{CameraError, CameraResult};
use crate::pipelines::video::RecorderFactory;
use crate::preview::PreviewSurface;
use command::{Command, Reply};
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::error;
use worker::{ObserverList, Worker};

/// Event channel depth; slow subscribers see `Lagged` rather than blocking the worker
const EVENT_CAPACITY: usize = 64;

/// Where recordings go and how devices are opened
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub output_dir: PathBuf,
    pub capture: CaptureConfig,
}

/// Handle to the capture session controller
#[derive(Clone)]
pub struct CameraController {
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<ControllerEvent>,
    observers: ObserverList,
}

impl std::fmt::Debug for CameraController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraController")
            .field("closed", &self.commands.is_closed())
            .finish_non_exhaustive()
    }
}

impl CameraController {
    /// Start the worker thread
    ///
    /// Frames of the active session are presented on `preview`.
    pub fn spawn(
        backend: Box<dyn CaptureBackend>,
        recorder: Arc<dyn RecorderFactory>,
        preview: PreviewSurface,
        options: ControllerOptions,
    ) -> CameraResult<Self> {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let observers: ObserverList = Arc::new(RwLock::new(Vec::new()));

        let worker = Worker::new(
            backend,
            recorder,
            options.capture,
            options.output_dir,
            preview,
            Arc::clone(&observers),
            events.clone(),
        );

        std::thread::Builder::new()
            .name("camera-queue".into())
            .spawn(move || worker.run(receiver))
            .map_err(|e| {
                error!(error = %e, "Failed to spawn camera queue");
                CameraError::ControllerUnavailable
            })?;

        Ok(Self {
            commands,
            events,
            observers,
        })
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> CameraResult<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| CameraError::ControllerUnavailable)?;
        response
            .await
            .map_err(|_| CameraError::ControllerUnavailable)?
    }

    /// Video-capable devices in registry order
    pub async fn load_devices(&self) -> CameraResult<Vec<CaptureDevice>> {
        self.request(Command::LoadDevices).await
    }

    /// Replace the current session with one bound to `device` and start it
    ///
    /// Any recording in progress is finalized first. On error no session is
    /// left behind.
    pub async fn change_device(&self, device: CaptureDevice) -> CameraResult<()> {
        self.request(|reply| Command::ChangeDevice(device, reply)).await
    }

    /// Start streaming; a running session is left alone
    pub async fn start_session(&self) -> CameraResult<()> {
        self.request(Command::StartSession).await
    }

    /// Stop streaming, finalizing any recording first
    pub async fn stop_session(&self) -> CameraResult<()> {
        self.request(Command::StopSession).await
    }

    /// Begin recording to a fresh file in the output directory
    pub async fn start_recording(&self) -> CameraResult<PathBuf> {
        self.request(Command::StartRecording).await
    }

    /// Finalize the recording and return the written file
    pub async fn stop_recording(&self) -> CameraResult<PathBuf> {
        self.request(Command::StopRecording).await
    }

    /// Read exposure and white balance from the device
    pub async fn current_setting(&self) -> CameraResult<CameraSetting> {
        self.request(Command::CurrentSetting).await
    }

    pub async fn apply_setting(&self, setting: CameraSetting) -> CameraResult<()> {
        self.request(|reply| Command::ApplySetting(setting, reply)).await
    }

    pub async fn status(&self) -> CameraResult<SessionStatus> {
        self.request(Command::Status).await
    }

    /// Tear down the session and stop the worker
    ///
    /// Other handles fail with `ControllerUnavailable` afterwards.
    pub async fn shutdown(&self) -> CameraResult<()> {
        self.request(Command::Shutdown).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    /// Register an observer for every future frame, across device changes
    pub fn add_frame_observer(&self, observer: Arc<dyn FrameObserver>) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::CameraFrame;
    use crate::backends::virtual_camera::VirtualBackend;
    use crate::errors::RecordingError;
    use crate::pipelines::video::RecordingSink;
    use std::path::Path;

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

    fn controller(dir: &Path) -> CameraController {
        CameraController::spawn(
            Box::new(VirtualBackend::default()),
            Arc::new(NullRecorder),
            PreviewSurface::new(false),
            ControllerOptions {
                output_dir: dir.to_path_buf(),
                capture: CaptureConfig::default(),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_operations_without_session() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());

        assert_eq!(
            controller.start_session().await,
            Err(CameraError::NoActiveSession)
        );
        assert_eq!(
            controller.stop_session().await,
            Err(CameraError::NoActiveSession)
        );
        assert_eq!(
            controller.start_recording().await,
            Err(CameraError::NoActiveSession)
        );
        assert_eq!(
            controller.current_setting().await,
            Err(CameraError::NoActiveSession)
        );
        assert_eq!(controller.status().await, Ok(SessionStatus::default()));
    }

    #[tokio::test]
    async fn test_shutdown_closes_every_handle() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());
        let other = controller.clone();

        controller.shutdown().await.unwrap();
        assert_eq!(
            other.load_devices().await,
            Err(CameraError::ControllerUnavailable)
        );
    }

    #[tokio::test]
    async fn test_stop_recording_when_idle() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());
        let devices = controller.load_devices().await.unwrap();
        controller.change_device(devices[0].clone()).await.unwrap();

        assert_eq!(
            controller.stop_recording().await,
            Err(CameraError::Recording(RecordingError::NotRecording))
        );
        controller.shutdown().await.unwrap();
    }
}
