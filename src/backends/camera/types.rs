// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CameraBackendType {
    /// V4L2 devices from /dev/video*
    #[default]
    V4l2,
    /// Synthetic in-process devices
    Virtual,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::V4l2 => write!(f, "V4L2"),
            CameraBackendType::Virtual => write!(f, "virtual"),
        }
    }
}

impl std::str::FromStr for CameraBackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "v4l2" => Ok(CameraBackendType::V4l2),
            "virtual" => Ok(CameraBackendType::Virtual),
            other => Err(format!("unknown backend '{}' (expected v4l2 or virtual)", other)),
        }
    }
}

/// Kind of media a registry entry can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Video,
    Audio,
    /// Metadata-only nodes (e.g. the second /dev/video node of UVC cameras)
    Metadata,
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaType::Video => write!(f, "video"),
            MediaType::Audio => write!(f, "audio"),
            MediaType::Metadata => write!(f, "metadata"),
        }
    }
}

/// Device information from V4L2 capability
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Name of the device (V4L2 card)
    pub card: String,
    /// Driver name (V4L2 driver)
    pub driver: String,
    /// Real device path (resolved symlinks)
    pub real_path: String,
}

/// An entry in the platform device registry
///
/// The registry owns the physical device; the controller only keeps a copy
/// of this handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureDevice {
    /// Stable identifier (device path for V4L2)
    pub id: String,
    /// Human-readable name shown in the device list
    pub name: String,
    pub media_types: Vec<MediaType>,
    pub device_info: Option<DeviceInfo>,
}

impl CaptureDevice {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        media_types: Vec<MediaType>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            media_types,
            device_info: None,
        }
    }

    /// Check if the device can produce the given media type
    pub fn has_media_type(&self, media_type: MediaType) -> bool {
        self.media_types.contains(&media_type)
    }
}

/// Pixel format for camera frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    RGBA,
    /// YUYV - Packed 4:2:2 (Y0 U Y1 V interleaved)
    YUYV,
}

impl PixelFormat {
    /// Bytes per pixel in the packed layout
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            PixelFormat::RGBA => 4,
            PixelFormat::YUYV => 2,
        }
    }

    /// GStreamer video/x-raw format string
    pub fn to_gst_format_string(&self) -> &'static str {
        match self {
            PixelFormat::RGBA => "RGBA",
            PixelFormat::YUYV => "YUY2",
        }
    }
}

/// A single frame from the camera
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Packed pixel data
    pub data: Arc<[u8]>,
    pub format: PixelFormat,
    /// Bytes per row, may include padding
    pub stride: u32,
    /// Timestamp when the frame was captured
    pub captured_at: Instant,
    /// Frame sequence number within the session
    pub sequence: u64,
}

impl CameraFrame {
    /// Sample a pixel as RGB, clamping coordinates to the frame
    pub fn sample_rgb(&self, x: u32, y: u32) -> (u8, u8, u8) {
        if self.width == 0 || self.height == 0 {
            return (0, 0, 0);
        }
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        let data = &self.data;

        match self.format {
            PixelFormat::RGBA => {
                let idx = (y * self.stride + x * 4) as usize;
                if idx + 2 < data.len() {
                    (data[idx], data[idx + 1], data[idx + 2])
                } else {
                    (0, 0, 0)
                }
            }
            PixelFormat::YUYV => {
                // Two pixels share chroma: Y0 U Y1 V
                let pair_x = (x & !1) as usize;
                let base = (y as usize) * (self.stride as usize) + pair_x * 2;
                if base + 3 >= data.len() {
                    return (0, 0, 0);
                }
                let luma = if x & 1 == 0 {
                    data[base]
                } else {
                    data[base + 2]
                };
                yuv_to_rgb(luma, data[base + 1], data[base + 3])
            }
        }
    }
}

/// Convert YUV (BT.601) to RGB
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

    (r, g, b)
}

/// Callback receiving frames on the capture thread
pub type FrameSink = Arc<dyn Fn(CameraFrame) + Send + Sync>;

/// Capture parameters requested when opening a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        use crate::constants::capture;
        Self {
            width: capture::DEFAULT_WIDTH,
            height: capture::DEFAULT_HEIGHT,
            framerate: capture::DEFAULT_FRAMERATE,
        }
    }
}

/// Exposure control mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExposureMode {
    /// Continuous automatic exposure
    #[default]
    Auto,
    /// Fixed, user-supplied exposure duration
    Manual,
}

/// White balance control mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WhiteBalanceMode {
    /// Continuous automatic white balance
    #[default]
    Auto,
    /// Gains locked to user-supplied values
    Locked,
}

/// Per-channel white balance gains
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WhiteBalanceGains {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl WhiteBalanceGains {
    pub const NEUTRAL: WhiteBalanceGains = WhiteBalanceGains {
        red: 1.0,
        green: 1.0,
        blue: 1.0,
    };

    pub fn new(red: f32, green: f32, blue: f32) -> Self {
        Self { red, green, blue }
    }

    /// Apply a function to every channel
    pub fn map(self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            red: f(self.red),
            green: f(self.green),
            blue: f(self.blue),
        }
    }

    pub fn channels(&self) -> [f32; 3] {
        [self.red, self.green, self.blue]
    }
}

impl Default for WhiteBalanceGains {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Device-reported exposure duration bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExposureDurationRange {
    pub min: Duration,
    pub max: Duration,
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Failed to open or configure the device
    InitializationFailed(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Format not supported
    FormatNotSupported(String),
    /// A control is missing or rejected a value
    ControlFailed(String),
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::ControlFailed(msg) => write!(f, "Control failed: {}", msg),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::IoError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(format: PixelFormat, width: u32, height: u32, data: Vec<u8>) -> CameraFrame {
        CameraFrame {
            width,
            height,
            stride: width * format.bytes_per_pixel(),
            data: Arc::from(data),
            format,
            captured_at: Instant::now(),
            sequence: 0,
        }
    }

    #[test]
    fn test_sample_rgba_clamps_coordinates() {
        let f = frame(
            PixelFormat::RGBA,
            2,
            1,
            vec![10, 20, 30, 255, 40, 50, 60, 255],
        );
        assert_eq!(f.sample_rgb(0, 0), (10, 20, 30));
        assert_eq!(f.sample_rgb(5, 9), (40, 50, 60));
    }

    #[test]
    fn test_sample_yuyv_gray() {
        // Neutral chroma gives gray pixels equal to luma
        let f = frame(PixelFormat::YUYV, 2, 1, vec![100, 128, 200, 128]);
        assert_eq!(f.sample_rgb(0, 0), (100, 100, 100));
        assert_eq!(f.sample_rgb(1, 0), (200, 200, 200));
    }

    #[test]
    fn test_backend_type_parse() {
        assert_eq!("V4L2".parse::<CameraBackendType>(), Ok(CameraBackendType::V4l2));
        assert_eq!(
            "virtual".parse::<CameraBackendType>(),
            Ok(CameraBackendType::Virtual)
        );
        assert!("pipewire".parse::<CameraBackendType>().is_err());
    }

    #[test]
    fn test_device_media_types() {
        let device = CaptureDevice::new("/dev/video0", "Webcam", vec![MediaType::Video]);
        assert!(device.has_media_type(MediaType::Video));
        assert!(!device.has_media_type(MediaType::Audio));
    }
}
