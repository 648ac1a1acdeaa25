// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for capture devices
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              Camera Controller               │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌─────────────┐    ┌──────────────────┐   │
//! │  │    Audio    │    │      Camera      │   │
//! │  │   (ALSA)    │    │      (V4L2)      │   │
//! │  └─────────────┘    └──────────────────┘   │
//! │                     ┌──────────────────┐   │
//! │                     │  Virtual Camera  │   │
//! │                     │   (in-process)   │   │
//! │                     └──────────────────┘   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! - [`audio`]: audio capture entries for the device registry
//! - [`camera`]: backend traits, V4L2 capture and device controls
//! - [`virtual_camera`]: synthetic devices for demos and tests

pub mod audio;
pub mod camera;
pub mod virtual_camera;
