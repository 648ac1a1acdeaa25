// SPDX-License-Identifier: MPL-2.0

//! QuickTime muxing and file output

use crate::errors::RecordingError;
use gstreamer as gst;
use gstreamer::prelude::*;
use std::path::Path;
use tracing::info;

/// Muxer and file sink pair
pub struct MuxerConfig {
    pub muxer: gst::Element,
    pub filesink: gst::Element,
}

/// Create `qtmux` and a `filesink` writing to `output_path`
pub fn create_muxer(output_path: &Path) -> Result<MuxerConfig, RecordingError> {
    info!(path = %output_path.display(), "Creating QuickTime muxer");

    let location = output_path.to_str().ok_or_else(|| {
        RecordingError::StartFailed(format!("Output path is not UTF-8: {}", output_path.display()))
    })?;

    let muxer = gst::ElementFactory::make("qtmux")
        .build()
        .map_err(|e| RecordingError::StartFailed(format!("Failed to create qtmux: {}", e)))?;

    let filesink = gst::ElementFactory::make("filesink")
        .property("location", location)
        .build()
        .map_err(|e| RecordingError::StartFailed(format!("Failed to create filesink: {}", e)))?;

    Ok(MuxerConfig { muxer, filesink })
}

/// Link the muxer output to the file sink
pub fn link_muxer_to_sink(config: &MuxerConfig) -> Result<(), RecordingError> {
    config.muxer.link(&config.filesink).map_err(|e| {
        RecordingError::StartFailed(format!("Failed to link muxer to filesink: {}", e))
    })
}
