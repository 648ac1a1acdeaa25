// SPDX-License-Identifier: MPL-2.0

//! Processing pipelines fed from the capture thread
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Camera Frame │ ──▶ │  Video Pipeline   │ ──▶ │   MOV File   │
//! │ (RGBA/YUYV)  │     │  - appsrc         │     │              │
//! │              │     │  - H.264 / JPEG   │     │              │
//! │              │     │  - qtmux          │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```
//!
//! - [`video`]: recording sinks and the GStreamer implementation

pub mod video;
