// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Video encoder bitrate presets
///
/// Target bitrate for the H.264 recording encoder, scaled by resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BitratePreset {
    /// Low bitrate - smaller files, reduced quality
    Low,
    /// Medium bitrate - balanced quality and file size (default)
    #[default]
    Medium,
    /// High bitrate - larger files, better quality
    High,
}

impl BitratePreset {
    /// Name shown in `record` output
    pub fn display_name(&self) -> &'static str {
        match self {
            BitratePreset::Low => "Low",
            BitratePreset::Medium => "Medium",
            BitratePreset::High => "High",
        }
    }

    /// Get bitrate in kbps for a given frame width
    ///
    /// - SD (640 and below): Low=1, Medium=2, High=4 Mbps
    /// - HD (1280): Low=2.5, Medium=5, High=10 Mbps
    /// - Full HD (1920 and above): Low=4, Medium=8, High=16 Mbps
    pub fn bitrate_kbps(&self, width: u32) -> u32 {
        let tier = if width >= resolution_thresholds::THRESHOLD_FULL_HD {
            2
        } else if width >= resolution_thresholds::THRESHOLD_720P {
            1
        } else {
            0
        };

        match (tier, self) {
            (0, BitratePreset::Low) => 1_000,
            (0, BitratePreset::Medium) => 2_000,
            (0, BitratePreset::High) => 4_000,
            (1, BitratePreset::Low) => 2_500,
            (1, BitratePreset::Medium) => 5_000,
            (1, BitratePreset::High) => 10_000,
            (_, BitratePreset::Low) => 4_000,
            (_, BitratePreset::Medium) => 8_000,
            (_, BitratePreset::High) => 16_000,
        }
    }
}

/// Resolution width thresholds for bitrate tiers
pub mod resolution_thresholds {
    /// Full HD threshold (1920 width)
    pub const THRESHOLD_FULL_HD: u32 = 1920;

    /// 720p threshold (1280 width)
    pub const THRESHOLD_720P: u32 = 1280;
}

/// Exposure slider mapping
pub mod exposure {
    use std::time::Duration;

    /// Power applied to the slider position; higher values give the slider
    /// more resolution at short durations
    pub const DURATION_POWER: f64 = 5.0;

    /// Shortest usable exposure duration (1/1000 s)
    pub const MINIMUM_DURATION: Duration = Duration::from_millis(1);
}

/// White balance limits
pub mod white_balance {
    /// Lower bound for every gain channel after conversion
    pub const MIN_GAIN: f32 = 1.0;

    /// Gain ceiling reported by devices that expose temperature only
    pub const DEFAULT_MAX_GAIN: f32 = 4.0;

    /// Temperature range covered by the Planckian locus model (Kelvin)
    pub const MODEL_MIN_KELVIN: f32 = 2000.0;
    pub const MODEL_MAX_KELVIN: f32 = 25000.0;

    /// White balance slider range in the settings panel (Kelvin)
    pub const SLIDER_MIN_KELVIN: f64 = 2000.0;
    pub const SLIDER_MAX_KELVIN: f64 = 10000.0;

    /// Daylight temperature used when nothing better is known
    pub const DEFAULT_KELVIN: f64 = 6500.0;
}

/// Recording output
pub mod recording {
    /// Container extension for recordings (QuickTime)
    pub const FILE_EXTENSION: &str = "mov";

    /// Encoders tried in order when building the recording pipeline
    pub const ENCODER_CANDIDATES: &[&str] = &["x264enc", "openh264enc", "jpegenc"];
}

/// Capture defaults
pub mod capture {
    use std::time::Duration;

    /// Default capture width for new sessions
    pub const DEFAULT_WIDTH: u32 = 640;

    /// Default capture height for new sessions
    pub const DEFAULT_HEIGHT: u32 = 480;

    /// Default framerate used for caps and the virtual frame generator
    pub const DEFAULT_FRAMERATE: u32 = 30;

    /// Number of mmap buffers requested from V4L2
    pub const V4L2_BUFFER_COUNT: u32 = 4;

    /// Longest wait for a frame before the capture thread rechecks its stop flag
    pub const DEQUEUE_TIMEOUT: Duration = Duration::from_millis(250);

    /// Consecutive dequeue failures after which the stream is abandoned
    pub const MAX_DEQUEUE_ERRORS: u32 = 20;
}

/// Timeouts and intervals
pub mod timing {
    use std::time::Duration;

    /// Log frame statistics every N frames
    pub const FRAME_LOG_INTERVAL: u64 = 60;

    /// Time to wait for EOS when finalizing a recording
    pub const EOS_TIMEOUT_SECS: u64 = 5;

    /// Terminal UI redraw/input poll interval
    pub const UI_POLL_INTERVAL: Duration = Duration::from_millis(33);
}

/// Frame interval for a given framerate
pub fn frame_interval(fps: u32) -> Duration {
    Duration::from_secs(1) / fps.max(1)
}
