// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! ```text
//! ┌─────────────────────┐
//! │  CameraController   │  ← owns at most one session
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ CaptureBackend Trait│  ← device registry + session factory
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ CaptureSession Trait│  ← streaming + DeviceControls
//! └──────────┬──────────┘
//!            │
//!      ┌─────┴─────┐
//!      ▼           ▼
//!  ┌──────┐   ┌─────────┐
//!  │ V4L2 │   │ Virtual │
//!  └──────┘   └─────────┘
//! ```

pub mod frame_loop;
pub mod types;
pub mod v4l2;
pub mod v4l2_controls;
pub mod v4l2_utils;

pub use types::*;

use crate::backends::virtual_camera::VirtualBackend;
use crate::controls::white_balance;
use std::time::Duration;

/// Platform device registry and session factory
pub trait CaptureBackend: Send {
    /// Backend type identifier
    fn backend_type(&self) -> CameraBackendType;

    /// List every device in the registry, whatever media it produces
    ///
    /// Order is whatever the platform reports.
    fn enumerate_devices(&self) -> BackendResult<Vec<CaptureDevice>>;

    /// Open the device as a session input
    ///
    /// The returned session is prepared but not streaming.
    fn open_session(
        &mut self,
        device: &CaptureDevice,
        config: &CaptureConfig,
    ) -> BackendResult<Box<dyn CaptureSession>>;
}

/// An opened device that can stream frames
///
/// Dropping the session stops streaming and releases the device.
pub trait CaptureSession: Send {
    /// The device this session is bound to
    fn device(&self) -> &CaptureDevice;

    /// Route captured frames to `sink`
    ///
    /// Must be called before [`CaptureSession::start`]. Frames are delivered
    /// synchronously on the backend's capture thread.
    fn attach_frame_output(&mut self, sink: FrameSink) -> BackendResult<()>;

    /// Begin streaming
    fn start(&mut self) -> BackendResult<()>;

    /// Stop streaming; the session can be started again
    fn stop(&mut self) -> BackendResult<()>;

    fn is_running(&self) -> bool;

    /// Exposure and white balance controls of the bound device
    fn controls(&mut self) -> &mut dyn DeviceControls;
}

/// Device-level capture parameters
///
/// Reads and writes go straight to the device. The gain/temperature
/// conversion defaults to the Planckian locus model in
/// [`crate::controls::white_balance`].
pub trait DeviceControls {
    /// Take exclusive access for a batch of changes
    fn lock_for_configuration(&mut self) -> BackendResult<()> {
        Ok(())
    }

    /// Release access taken by [`DeviceControls::lock_for_configuration`]
    fn unlock_for_configuration(&mut self) {}

    // ===== Exposure =====

    fn exposure_mode(&self) -> BackendResult<ExposureMode>;

    fn is_exposure_mode_supported(&self, mode: ExposureMode) -> bool;

    /// Switch the exposure mode without touching the duration
    fn set_exposure_mode(&mut self, mode: ExposureMode) -> BackendResult<()>;

    /// Current exposure duration
    fn exposure_duration(&self) -> BackendResult<Duration>;

    /// Device-reported duration bounds for the active format
    fn exposure_duration_range(&self) -> BackendResult<ExposureDurationRange>;

    /// Switch to manual exposure with a fixed duration
    fn set_custom_exposure(&mut self, duration: Duration) -> BackendResult<()>;

    // ===== White balance =====

    fn white_balance_mode(&self) -> BackendResult<WhiteBalanceMode>;

    fn is_white_balance_mode_supported(&self, mode: WhiteBalanceMode) -> bool;

    fn set_white_balance_mode(&mut self, mode: WhiteBalanceMode) -> BackendResult<()>;

    /// Gains currently applied by the device
    fn white_balance_gains(&self) -> BackendResult<WhiteBalanceGains>;

    /// Largest gain accepted by [`DeviceControls::lock_white_balance`]
    fn max_white_balance_gain(&self) -> f32;

    /// Switch to locked white balance with the given gains
    fn lock_white_balance(&mut self, gains: WhiteBalanceGains) -> BackendResult<()>;

    fn temperature_for_gains(&self, gains: WhiteBalanceGains) -> f32 {
        white_balance::temperature_for_gains(gains)
    }

    fn gains_for_temperature(&self, kelvin: f32) -> WhiteBalanceGains {
        white_balance::gains_for_temperature(kelvin)
    }
}

/// Get a backend instance for the given type
pub fn get_backend_for_type(backend_type: CameraBackendType) -> Box<dyn CaptureBackend> {
    match backend_type {
        CameraBackendType::V4l2 => Box::new(v4l2::V4l2Backend::new()),
        CameraBackendType::Virtual => Box::new(VirtualBackend::default()),
    }
}
