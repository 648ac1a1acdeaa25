// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use camera_recorder::constants::{BitratePreset, frame_interval};
use std::time::Duration;

const PRESETS: [BitratePreset; 3] = [
    BitratePreset::Low,
    BitratePreset::Medium,
    BitratePreset::High,
];

#[test]
fn test_bitrate_preset_ordering() {
    // Presets are ordered from lowest to highest quality
    for width in [640, 1280, 1920] {
        let rates = PRESETS.map(|preset| preset.bitrate_kbps(width));
        assert!(rates[0] < rates[1] && rates[1] < rates[2], "width {}", width);
    }
}

#[test]
fn test_bitrate_scales_with_resolution() {
    let sd_bitrate = BitratePreset::Medium.bitrate_kbps(640);
    let hd_bitrate = BitratePreset::Medium.bitrate_kbps(1280);
    let fhd_bitrate = BitratePreset::Medium.bitrate_kbps(1920);
    let uhd_bitrate = BitratePreset::Medium.bitrate_kbps(3840);

    assert!(sd_bitrate < hd_bitrate);
    assert!(hd_bitrate < fhd_bitrate);
    assert!(fhd_bitrate <= uhd_bitrate);
}

#[test]
fn test_bitrate_preset_names_match_config_values() {
    for preset in PRESETS {
        let json = serde_json::to_string(&preset).unwrap();
        assert_eq!(json, format!("\"{}\"", preset.display_name()));
    }
}

#[test]
fn test_frame_interval() {
    assert_eq!(frame_interval(25), Duration::from_millis(40));
    // Zero fps is treated as 1 fps
    assert_eq!(frame_interval(0), Duration::from_secs(1));
}
