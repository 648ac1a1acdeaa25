// SPDX-License-Identifier: MPL-2.0

//! Video recording pipeline
//!
//! The controller owns recording through two traits: a [`RecorderFactory`]
//! that opens a sink for a fresh output path, and the [`RecordingSink`]
//! itself, which receives frames on the capture thread and is finalized
//! when recording stops.

pub mod encoder_selection;
pub mod muxer;
pub mod recorder;

pub use encoder_selection::{EncoderChoice, select_encoder};
pub use recorder::{GstRecorder, GstRecorderFactory};

use crate::backends::camera::types::CameraFrame;
use crate::errors::RecordingError;
use std::path::{Path, PathBuf};

/// An open recording
pub trait RecordingSink: Send {
    /// Output file being written
    fn path(&self) -> &Path;

    /// Encode one frame
    ///
    /// Called on the capture thread; must not block for long.
    fn push_frame(&mut self, frame: &CameraFrame) -> Result<(), RecordingError>;

    /// Flush and close the file, returning its path
    fn finish(self: Box<Self>) -> Result<PathBuf, RecordingError>;
}

/// Opens recording sinks
pub trait RecorderFactory: Send + Sync {
    fn create(&self, path: PathBuf) -> Result<Box<dyn RecordingSink>, RecordingError>;
}
