// SPDX-License-Identifier: GPL-3.0-only

//! Virtual capture backend
//!
//! An in-process device registry with synthetic cameras. Frames are a moving
//! color-bar pattern rendered at the configured rate; exposure and white
//! balance are simulated so that changes are visible in the picture.
//!
//! # Architecture
//!
//! ```text
//! VirtualBackend (Clone, shared registry)
//!        │ open_session
//!        ▼
//! ┌──────────────────┐     ┌────────────────────┐
//! │ VirtualSession   │────▶│ CaptureLoopController│ ← "virtual-camera" thread
//! │  + SimulatedState│     │  PatternGenerator   │
//! └──────────────────┘     └────────────────────┘
//!                                   │ FrameSink
//!                                   ▼
//! ```
//!
//! The registry counts live sessions and can be told to fail input or output
//! attachment for a device, which the controller tests rely on.

mod controls;
mod pattern;

pub use controls::{SimulatedState, VirtualControls};
pub use pattern::PatternGenerator;

use crate::backends::camera::frame_loop::{CaptureLoopController, LoopAction};
use crate::backends::camera::types::*;
use crate::backends::camera::{CaptureBackend, CaptureSession, DeviceControls};
use crate::constants::frame_interval;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

#[derive(Default)]
struct Registry {
    devices: Vec<CaptureDevice>,
    fail_input: HashSet<String>,
    fail_output: HashSet<String>,
}

#[derive(Default)]
struct Shared {
    registry: Mutex<Registry>,
    live_sessions: AtomicUsize,
}

/// Synthetic device registry
///
/// Clones share the registry, so a test can keep one handle for inspection
/// while the controller owns another.
#[derive(Clone)]
pub struct VirtualBackend {
    shared: Arc<Shared>,
}

impl Default for VirtualBackend {
    fn default() -> Self {
        Self::new(Self::default_devices())
    }
}

impl VirtualBackend {
    pub fn new(devices: Vec<CaptureDevice>) -> Self {
        let shared = Shared::default();
        shared
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .devices = devices;
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Two cameras and a microphone
    pub fn default_devices() -> Vec<CaptureDevice> {
        vec![
            CaptureDevice::new("virtual:0", "Virtual Camera", vec![MediaType::Video]),
            CaptureDevice::new("virtual:mic0", "Virtual Microphone", vec![MediaType::Audio]),
            CaptureDevice::new("virtual:1", "Virtual Camera 2", vec![MediaType::Video]),
        ]
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.shared
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of sessions opened and not yet dropped
    pub fn live_sessions(&self) -> usize {
        self.shared.live_sessions.load(Ordering::SeqCst)
    }

    /// Take a device out of the registry, as if it was unplugged
    pub fn remove_device(&self, id: &str) {
        self.registry().devices.retain(|d| d.id != id);
    }

    /// Make `open_session` fail for a device
    pub fn fail_input_for(&self, id: &str) {
        self.registry().fail_input.insert(id.to_string());
    }

    /// Make `attach_frame_output` fail for sessions on a device
    pub fn fail_output_for(&self, id: &str) {
        self.registry().fail_output.insert(id.to_string());
    }
}

impl CaptureBackend for VirtualBackend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::Virtual
    }

    fn enumerate_devices(&self) -> BackendResult<Vec<CaptureDevice>> {
        Ok(self.registry().devices.clone())
    }

    fn open_session(
        &mut self,
        device: &CaptureDevice,
        config: &CaptureConfig,
    ) -> BackendResult<Box<dyn CaptureSession>> {
        let fail_output = {
            let registry = self.registry();
            if !registry.devices.iter().any(|d| d.id == device.id) {
                return Err(BackendError::DeviceNotFound(device.id.clone()));
            }
            if registry.fail_input.contains(&device.id) {
                return Err(BackendError::InitializationFailed(format!(
                    "{} refused the input",
                    device.name
                )));
            }
            registry.fail_output.contains(&device.id)
        };

        if !device.has_media_type(MediaType::Video) {
            return Err(BackendError::FormatNotSupported(format!(
                "{} does not capture video",
                device.name
            )));
        }

        self.shared.live_sessions.fetch_add(1, Ordering::SeqCst);
        info!(device = %device.name, live = self.live_sessions(), "Opened virtual session");

        Ok(Box::new(VirtualSession {
            device: device.clone(),
            config: *config,
            sink: None,
            frame_loop: None,
            controls: VirtualControls::default(),
            fail_output,
            shared: Arc::clone(&self.shared),
        }))
    }
}

/// Session on a synthetic camera
pub struct VirtualSession {
    device: CaptureDevice,
    config: CaptureConfig,
    sink: Option<FrameSink>,
    frame_loop: Option<CaptureLoopController>,
    controls: VirtualControls,
    fail_output: bool,
    shared: Arc<Shared>,
}

impl CaptureSession for VirtualSession {
    fn device(&self) -> &CaptureDevice {
        &self.device
    }

    fn attach_frame_output(&mut self, sink: FrameSink) -> BackendResult<()> {
        if self.fail_output {
            return Err(BackendError::Other(format!(
                "{} refused the frame output",
                self.device.name
            )));
        }
        self.sink = Some(sink);
        Ok(())
    }

    fn start(&mut self) -> BackendResult<()> {
        if self.is_running() {
            return Ok(());
        }
        let sink = self
            .sink
            .clone()
            .ok_or_else(|| BackendError::Other("no frame output attached".to_string()))?;

        let mut generator = PatternGenerator::new(self.config.width, self.config.height);
        let state = self.controls.shared_state();
        let controller = CaptureLoopController::start(
            "virtual-camera",
            frame_interval(self.config.framerate),
            move || {
                let snapshot = *state.lock().unwrap_or_else(PoisonError::into_inner);
                sink(generator.next_frame(&snapshot));
                LoopAction::Continue
            },
        )?;

        debug!(device = %self.device.name, "Virtual session started");
        self.frame_loop = Some(controller);
        Ok(())
    }

    fn stop(&mut self) -> BackendResult<()> {
        if let Some(mut frame_loop) = self.frame_loop.take() {
            frame_loop.stop();
            debug!(device = %self.device.name, "Virtual session stopped");
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.frame_loop
            .as_ref()
            .is_some_and(CaptureLoopController::is_running)
    }

    fn controls(&mut self) -> &mut dyn DeviceControls {
        &mut self.controls
    }
}

impl Drop for VirtualSession {
    fn drop(&mut self) {
        if let Some(mut frame_loop) = self.frame_loop.take() {
            frame_loop.stop();
        }
        self.shared.live_sessions.fetch_sub(1, Ordering::SeqCst);
        debug!(device = %self.device.name, "Virtual session released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;
    use std::time::{Duration, Instant};

    fn counting_sink() -> (FrameSink, Arc<AtomicU64>) {
        let count = Arc::new(AtomicU64::new(0));
        let inner = Arc::clone(&count);
        let sink: FrameSink = Arc::new(move |_frame| {
            inner.fetch_add(1, Ordering::SeqCst);
        });
        (sink, count)
    }

    fn wait_for(count: &AtomicU64, target: u64) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if count.load(Ordering::SeqCst) >= target {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_registry_is_mixed() {
        let backend = VirtualBackend::default();
        let devices = backend.enumerate_devices().unwrap();
        assert_eq!(devices.len(), 3);
        assert!(devices.iter().any(|d| d.has_media_type(MediaType::Audio)));
    }

    #[test]
    fn test_session_delivers_frames() {
        let mut backend = VirtualBackend::default();
        let device = backend.enumerate_devices().unwrap()[0].clone();
        let mut session = backend.open_session(&device, &CaptureConfig::default()).unwrap();

        let (sink, count) = counting_sink();
        session.attach_frame_output(sink).unwrap();
        session.start().unwrap();
        assert!(session.is_running());
        assert!(wait_for(&count, 3));

        session.stop().unwrap();
        assert!(!session.is_running());
    }

    #[test]
    fn test_live_session_count() {
        let mut backend = VirtualBackend::default();
        let device = backend.enumerate_devices().unwrap()[0].clone();

        let first = backend.open_session(&device, &CaptureConfig::default()).unwrap();
        let second = backend.open_session(&device, &CaptureConfig::default()).unwrap();
        assert_eq!(backend.live_sessions(), 2);
        drop(first);
        assert_eq!(backend.live_sessions(), 1);
        drop(second);
        assert_eq!(backend.live_sessions(), 0);
    }

    #[test]
    fn test_microphone_cannot_be_opened() {
        let mut backend = VirtualBackend::default();
        let mic = backend.enumerate_devices().unwrap()[1].clone();
        let result = backend.open_session(&mic, &CaptureConfig::default());
        assert!(matches!(result, Err(BackendError::FormatNotSupported(_))));
        assert_eq!(backend.live_sessions(), 0);
    }

    #[test]
    fn test_failure_injection() {
        let mut backend = VirtualBackend::default();
        let devices = backend.enumerate_devices().unwrap();

        backend.fail_input_for(&devices[0].id);
        assert!(matches!(
            backend.open_session(&devices[0], &CaptureConfig::default()),
            Err(BackendError::InitializationFailed(_))
        ));

        backend.fail_output_for(&devices[2].id);
        let mut session = backend.open_session(&devices[2], &CaptureConfig::default()).unwrap();
        let (sink, _) = counting_sink();
        assert!(session.attach_frame_output(sink).is_err());
    }

    #[test]
    fn test_removed_device_is_not_found() {
        let mut backend = VirtualBackend::default();
        let device = backend.enumerate_devices().unwrap()[0].clone();
        backend.remove_device(&device.id);
        assert!(matches!(
            backend.open_session(&device, &CaptureConfig::default()),
            Err(BackendError::DeviceNotFound(_))
        ));
    }
}
