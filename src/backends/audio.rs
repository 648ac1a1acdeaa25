// SPDX-License-Identifier: MPL-2.0

//! Audio capture device enumeration from ALSA
//!
//! Audio inputs are listed alongside cameras in the device registry; the
//! controller filters them out when building the camera list.

use super::camera::types::{CaptureDevice, DeviceInfo, MediaType};
use tracing::{debug, warn};

const ALSA_PCM_LIST: &str = "/proc/asound/pcm";

/// Enumerate ALSA PCM devices that can capture
pub fn enumerate_audio_devices() -> Vec<CaptureDevice> {
    match std::fs::read_to_string(ALSA_PCM_LIST) {
        Ok(contents) => parse_pcm_list(&contents),
        Err(e) => {
            warn!(path = ALSA_PCM_LIST, error = %e, "Failed to read ALSA PCM list");
            Vec::new()
        }
    }
}

/// Parse the contents of `/proc/asound/pcm`
///
/// Lines look like `00-00: ALC257 Analog : ALC257 Analog : playback 1 : capture 1`.
/// Only entries with a capture stream are returned, identified as `hw:CARD,DEV`.
pub fn parse_pcm_list(contents: &str) -> Vec<CaptureDevice> {
    let mut devices = Vec::new();

    for line in contents.lines() {
        let mut fields = line.split(':').map(str::trim);
        let (Some(index), Some(id), Some(name)) = (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };

        let has_capture = fields.any(|f| f.starts_with("capture"));
        if !has_capture {
            continue;
        }

        let Some((card, device)) = index.split_once('-') else {
            continue;
        };
        let (Ok(card), Ok(device)) = (card.parse::<u32>(), device.parse::<u32>()) else {
            continue;
        };

        let alsa_id = format!("hw:{},{}", card, device);
        let display = if name.is_empty() { id } else { name };
        debug!(id = %alsa_id, name = %display, "Found audio capture device");

        let mut entry = CaptureDevice::new(alsa_id.clone(), display, vec![MediaType::Audio]);
        entry.device_info = Some(DeviceInfo {
            card: id.to_string(),
            driver: "alsa".to_string(),
            real_path: alsa_id,
        });
        devices.push(entry);
    }

    devices
}
