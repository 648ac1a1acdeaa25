// SPDX-License-Identifier: MPL-2.0

//! Camera preview and recording
//!
//! This library provides the core functionality of the camera recorder:
//! device enumeration, a capture session controller, exposure and white
//! balance mapping, and QuickTime recording.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Application model and settings panel view-model
//! - [`backends`]: Camera and audio backend abstraction (V4L2, virtual)
//! - [`controller`]: Capture session controller
//! - [`controls`]: Exposure curve, white balance model and settings mapping
//! - [`pipelines`]: GStreamer recording pipeline
//! - [`preview`]: Latest-frame surface rendered by the UI
//! - [`config`]: User configuration handling
//! - [`storage`]: Recording file naming
//! - [`terminal`]: Terminal user interface
//!
//! # Example
//!
//! ```no_run
//! use camera_recorder::backends::camera::{CameraBackendType, get_backend_for_type};
//! use camera_recorder::controller::{CameraController, ControllerOptions};
//! use camera_recorder::pipelines::video::GstRecorderFactory;
//! use camera_recorder::preview::PreviewSurface;
//! use camera_recorder::{BitratePreset, Config};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let controller = CameraController::spawn(
//!     get_backend_for_type(CameraBackendType::Virtual),
//!     Arc::new(GstRecorderFactory { bitrate: BitratePreset::Medium, framerate: 30 }),
//!     PreviewSurface::new(true),
//!     ControllerOptions { output_dir: config.recordings_dir(), capture: config.capture_config() },
//! )?;
//! let cameras = controller.load_devices().await?;
//! controller.change_device(cameras[0].clone()).await?;
//! let path = controller.start_recording().await?;
//! controller.stop_recording().await?;
//! println!("saved {}", path.display());
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod controller;
pub mod controls;
pub mod errors;
pub mod pipelines;
pub mod preview;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use app::{AppModel, Message};
pub use config::Config;
pub use constants::BitratePreset;
pub use controller::{CameraController, ControllerEvent, FrameObserver, SessionStatus};
pub use controls::CameraSetting;
pub use errors::{AppError, CameraError, RecordingError};
