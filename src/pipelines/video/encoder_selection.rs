// SPDX-License-Identifier: MPL-2.0

//! Encoder selection for the recording pipeline
//!
//! Candidates are tried in order of preference; the first one whose
//! GStreamer factory is installed wins.

use crate::constants::BitratePreset;
use crate::constants::recording::ENCODER_CANDIDATES;
use crate::errors::RecordingError;
use gstreamer as gst;
use gstreamer::prelude::*;
use tracing::{debug, info};

/// Encoder picked for a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderChoice {
    /// GStreamer factory name
    pub factory: &'static str,
    /// Whether the output is H.264 and needs `h264parse` before the muxer
    pub is_h264: bool,
}

impl EncoderChoice {
    pub fn from_factory(factory: &'static str) -> Self {
        Self {
            factory,
            is_h264: factory.contains("264"),
        }
    }

    /// Create and configure the encoder element
    pub fn build(&self, preset: BitratePreset, width: u32) -> Result<gst::Element, RecordingError> {
        let encoder = gst::ElementFactory::make(self.factory).build().map_err(|e| {
            let msg = format!("Failed to create {}: {}", self.factory, e);
            RecordingError::EncoderNotAvailable(msg)
        })?;

        let kbps = preset.bitrate_kbps(width);
        match self.factory {
            "x264enc" => {
                encoder.set_property("bitrate", kbps);
                encoder.set_property_from_str("tune", "zerolatency");
                encoder.set_property_from_str("speed-preset", "veryfast");
            }
            "openh264enc" => {
                encoder.set_property("bitrate", kbps * 1000);
            }
            _ => {}
        }

        debug!(encoder = self.factory, kbps, "Configured video encoder");
        Ok(encoder)
    }
}

/// Pick the first installed encoder from `candidates`
pub fn select_from(
    candidates: &[&'static str],
    is_installed: impl Fn(&str) -> bool,
) -> Option<EncoderChoice> {
    candidates
        .iter()
        .copied()
        .find(|name| is_installed(name))
        .map(EncoderChoice::from_factory)
}

/// Pick the best installed encoder
pub fn select_encoder() -> Result<EncoderChoice, RecordingError> {
    gst::init().map_err(|e| RecordingError::StartFailed(format!("GStreamer init failed: {}", e)))?;

    let choice = select_from(ENCODER_CANDIDATES, |name| gst::ElementFactory::find(name).is_some())
        .ok_or_else(|| {
            RecordingError::EncoderNotAvailable(format!(
                "none of {} is installed",
                ENCODER_CANDIDATES.join(", ")
            ))
        })?;

    info!(encoder = choice.factory, "Selected video encoder");
    Ok(choice)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_installed_candidate_wins() {
        let choice = select_from(ENCODER_CANDIDATES, |name| name != "x264enc").unwrap();
        assert_eq!(choice.factory, "openh264enc");
        assert!(choice.is_h264);
    }

    #[test]
    fn test_jpeg_fallback_needs_no_parser() {
        let choice = select_from(ENCODER_CANDIDATES, |name| name == "jpegenc").unwrap();
        assert!(!choice.is_h264);
    }

    #[test]
    fn test_nothing_installed() {
        assert!(select_from(ENCODER_CANDIDATES, |_| false).is_none());
    }
}
