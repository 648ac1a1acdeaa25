// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 capture backend
//!
//! The registry is every `/dev/video*` node that answers QUERYCAP plus the
//! ALSA capture PCMs. Sessions stream with memory-mapped buffers on a
//! dedicated thread; controls go through a second handle on the same node.

mod capture;
mod controls;

pub use capture::{NegotiatedFormat, WireFormat, frame_from_buffer};
pub use controls::V4l2DeviceControls;

use super::types::*;
use super::v4l2_controls::ControlDevice;
use super::{CaptureBackend, CaptureSession, DeviceControls, v4l2_utils};
use crate::backends::audio;
use capture::CaptureThread;
use tracing::{info, warn};

/// Backend over the kernel V4L2 device registry
#[derive(Debug, Default)]
pub struct V4l2Backend;

impl V4l2Backend {
    pub fn new() -> Self {
        Self
    }
}

impl CaptureBackend for V4l2Backend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::V4l2
    }

    fn enumerate_devices(&self) -> BackendResult<Vec<CaptureDevice>> {
        let mut devices = v4l2_utils::enumerate_video_nodes();
        devices.extend(audio::enumerate_audio_devices());
        info!(count = devices.len(), "Enumerated V4L2 registry");
        Ok(devices)
    }

    fn open_session(
        &mut self,
        device: &CaptureDevice,
        config: &CaptureConfig,
    ) -> BackendResult<Box<dyn CaptureSession>> {
        if !device.has_media_type(MediaType::Video) {
            return Err(BackendError::FormatNotSupported(format!(
                "{} does not capture video",
                device.name
            )));
        }

        let (dev, format) = capture::open_device(&device.id, config)?;
        let controls = ControlDevice::open(&device.id).map_err(|e| {
            let msg = format!("Failed to open controls for {}: {}", device.id, e);
            BackendError::InitializationFailed(msg)
        })?;

        info!(device = %device.name, path = %device.id, "Opened V4L2 session");
        Ok(Box::new(V4l2Session {
            device: device.clone(),
            dev: Some(dev),
            format,
            sink: None,
            thread: None,
            controls: V4l2DeviceControls::new(controls),
        }))
    }
}

/// Streaming session on one V4L2 node
pub struct V4l2Session {
    device: CaptureDevice,
    /// Present while stopped; owned by the capture thread while streaming
    dev: Option<v4l::Device>,
    format: NegotiatedFormat,
    sink: Option<FrameSink>,
    thread: Option<CaptureThread>,
    controls: V4l2DeviceControls,
}

impl CaptureSession for V4l2Session {
    fn device(&self) -> &CaptureDevice {
        &self.device
    }

    fn attach_frame_output(&mut self, sink: FrameSink) -> BackendResult<()> {
        if self.thread.is_some() {
            return Err(BackendError::Other(
                "cannot attach an output while streaming".to_string(),
            ));
        }
        self.sink = Some(sink);
        Ok(())
    }

    fn start(&mut self) -> BackendResult<()> {
        if self.is_running() {
            return Ok(());
        }
        // A thread that died on its own still holds the device
        if let Some(thread) = self.thread.take()
            && let Some(dev) = thread.stop()
        {
            self.dev = Some(dev);
        }

        let sink = self
            .sink
            .clone()
            .ok_or_else(|| BackendError::Other("no frame output attached".to_string()))?;
        let dev = match self.dev.take() {
            Some(dev) => dev,
            None => capture::open_device(&self.device.id, &CaptureConfig {
                width: self.format.width,
                height: self.format.height,
                ..CaptureConfig::default()
            })?
            .0,
        };

        self.thread = Some(CaptureThread::spawn(
            self.device.id.clone(),
            dev,
            self.format,
            sink,
        )?);
        Ok(())
    }

    fn stop(&mut self) -> BackendResult<()> {
        if let Some(thread) = self.thread.take() {
            match thread.stop() {
                Some(dev) => self.dev = Some(dev),
                None => warn!(path = %self.device.id, "Capture thread lost the device handle"),
            }
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(CaptureThread::is_running)
    }

    fn controls(&mut self) -> &mut dyn DeviceControls {
        &mut self.controls
    }
}
