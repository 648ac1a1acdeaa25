// SPDX-License-Identifier: GPL-3.0-only

//! Preview surface
//!
//! The surface the UI renders the live picture from. The controller wires a
//! session's frames into it; the UI polls [`PreviewSurface::latest`] and
//! redraws when the generation changes.

use crate::backends::camera::types::{CameraFrame, CaptureDevice};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Default)]
struct SurfaceState {
    frame: Option<CameraFrame>,
    generation: u64,
    mirror: bool,
    closed: bool,
    bound_to: Option<String>,
}

/// Shared latest-frame slot
///
/// Clones refer to the same surface.
#[derive(Clone, Default)]
pub struct PreviewSurface {
    state: Arc<Mutex<SurfaceState>>,
}

/// Why a surface refused to be bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewError {
    Closed,
}

impl std::fmt::Display for PreviewError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreviewError::Closed => write!(f, "preview surface has been closed"),
        }
    }
}

impl std::error::Error for PreviewError {}

impl PreviewSurface {
    pub fn new(mirror: bool) -> Self {
        let surface = Self::default();
        surface.state().mirror = mirror;
        surface
    }

    fn state(&self) -> MutexGuard<'_, SurfaceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind the surface to a device's session
    ///
    /// Clears the previous picture so a stale frame from another device is
    /// never shown.
    pub fn bind(&self, device: &CaptureDevice) -> Result<(), PreviewError> {
        let mut state = self.state();
        if state.closed {
            return Err(PreviewError::Closed);
        }
        state.frame = None;
        state.generation += 1;
        state.bound_to = Some(device.id.clone());
        debug!(device = %device.name, "Preview bound");
        Ok(())
    }

    /// Detach from the current session and clear the picture
    pub fn unbind(&self) {
        let mut state = self.state();
        if state.bound_to.take().is_some() {
            state.frame = None;
            state.generation += 1;
        }
    }

    /// Id of the device the surface is bound to
    pub fn bound_device(&self) -> Option<String> {
        self.state().bound_to.clone()
    }

    /// Replace the displayed frame; ignored while unbound
    pub fn present(&self, frame: CameraFrame) {
        let mut state = self.state();
        if state.bound_to.is_none() {
            return;
        }
        state.frame = Some(frame);
        state.generation += 1;
    }

    /// The newest frame and its generation
    pub fn latest(&self) -> (u64, Option<CameraFrame>) {
        let state = self.state();
        (state.generation, state.frame.clone())
    }

    pub fn generation(&self) -> u64 {
        self.state().generation
    }

    pub fn is_mirrored(&self) -> bool {
        self.state().mirror
    }

    pub fn set_mirrored(&self, mirror: bool) {
        let mut state = self.state();
        state.mirror = mirror;
        state.generation += 1;
    }

    /// Tear the surface down; later binds fail
    pub fn close(&self) {
        let mut state = self.state();
        state.closed = true;
        state.bound_to = None;
        state.frame = None;
        state.generation += 1;
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::{MediaType, PixelFormat};
    use std::time::Instant;

    fn device(id: &str) -> CaptureDevice {
        CaptureDevice::new(id, id, vec![MediaType::Video])
    }

    fn frame(sequence: u64) -> CameraFrame {
        CameraFrame {
            width: 1,
            height: 1,
            data: Arc::from(vec![0u8, 0, 0, 255]),
            format: PixelFormat::RGBA,
            stride: 4,
            captured_at: Instant::now(),
            sequence,
        }
    }

    #[test]
    fn test_frames_ignored_until_bound() {
        let surface = PreviewSurface::new(true);
        surface.present(frame(0));
        assert!(surface.latest().1.is_none());

        surface.bind(&device("a")).unwrap();
        surface.present(frame(1));
        let (generation, latest) = surface.latest();
        assert_eq!(latest.map(|f| f.sequence), Some(1));
        assert!(generation > 0);
    }

    #[test]
    fn test_rebinding_clears_stale_frame() {
        let surface = PreviewSurface::default();
        surface.bind(&device("a")).unwrap();
        surface.present(frame(5));
        surface.bind(&device("b")).unwrap();
        assert!(surface.latest().1.is_none());
        assert_eq!(surface.bound_device().as_deref(), Some("b"));
    }

    #[test]
    fn test_closed_surface_refuses_binding() {
        let surface = PreviewSurface::default();
        surface.close();
        assert_eq!(surface.bind(&device("a")), Err(PreviewError::Closed));
        assert!(surface.is_closed());
    }

    #[test]
    fn test_clones_share_state() {
        let surface = PreviewSurface::new(false);
        let other = surface.clone();
        other.set_mirrored(true);
        assert!(surface.is_mirrored());
    }
}
