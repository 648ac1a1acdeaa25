// SPDX-License-Identifier: GPL-3.0-only

//! Exposure and white balance through V4L2 controls
//!
//! Exposure time is `V4L2_CID_EXPOSURE_ABSOLUTE` in 100 µs units. V4L2 has no
//! per-channel gain control for UVC devices, so white balance gains are
//! derived from `V4L2_CID_WHITE_BALANCE_TEMPERATURE` through the temperature
//! model and locking converts gains back to Kelvin.

use crate::backends::camera::DeviceControls;
use crate::backends::camera::types::*;
use crate::backends::camera::v4l2_controls::*;
use crate::constants::white_balance::DEFAULT_MAX_GAIN;
use std::time::Duration;
use tracing::debug;

/// Controls of one open V4L2 node
pub struct V4l2DeviceControls {
    device: ControlDevice,
}

fn control_error(what: &str, err: std::io::Error) -> BackendError {
    BackendError::ControlFailed(format!("{}: {}", what, err))
}

fn missing(what: &str) -> BackendError {
    BackendError::ControlFailed(format!("{} not supported by device", what))
}

/// Exposure duration for a raw `V4L2_CID_EXPOSURE_ABSOLUTE` value
pub fn exposure_to_duration(raw: i32) -> Duration {
    Duration::from_micros(raw.max(0) as u64 * EXPOSURE_UNIT_MICROS)
}

/// Raw `V4L2_CID_EXPOSURE_ABSOLUTE` value for a duration, rounded
pub fn duration_to_exposure(duration: Duration) -> i32 {
    let units = (duration.as_micros() as f64 / EXPOSURE_UNIT_MICROS as f64).round();
    units.min(i32::MAX as f64) as i32
}

impl V4l2DeviceControls {
    pub fn new(device: ControlDevice) -> Self {
        Self { device }
    }

    fn exposure_menu(&self) -> Vec<i32> {
        self.device
            .query(V4L2_CID_EXPOSURE_AUTO)
            .filter(|info| !info.is_disabled())
            .map(|info| self.device.menu_indices(&info))
            .unwrap_or_default()
    }

    fn exposure_info(&self) -> BackendResult<ControlInfo> {
        self.device
            .query(V4L2_CID_EXPOSURE_ABSOLUTE)
            .filter(|info| !info.is_disabled())
            .ok_or_else(|| missing("Absolute exposure"))
    }

    fn temperature_info(&self) -> BackendResult<ControlInfo> {
        self.device
            .query(V4L2_CID_WHITE_BALANCE_TEMPERATURE)
            .filter(|info| !info.is_disabled())
            .ok_or_else(|| missing("White balance temperature"))
    }

    fn set(&self, what: &str, id: u32, value: i32) -> BackendResult<()> {
        self.device.set(id, value).map_err(|e| control_error(what, e))
    }
}

impl DeviceControls for V4l2DeviceControls {
    fn exposure_mode(&self) -> BackendResult<ExposureMode> {
        let value = self
            .device
            .get(V4L2_CID_EXPOSURE_AUTO)
            .map_err(|e| control_error("Exposure mode", e))?;
        Ok(if is_auto_exposure_value(value) {
            ExposureMode::Auto
        } else {
            ExposureMode::Manual
        })
    }

    fn is_exposure_mode_supported(&self, mode: ExposureMode) -> bool {
        let menu = self.exposure_menu();
        match mode {
            ExposureMode::Auto => auto_exposure_value(&menu).is_some(),
            ExposureMode::Manual => {
                menu.contains(&V4L2_EXPOSURE_MANUAL) && self.device.has(V4L2_CID_EXPOSURE_ABSOLUTE)
            }
        }
    }

    fn set_exposure_mode(&mut self, mode: ExposureMode) -> BackendResult<()> {
        let value = match mode {
            ExposureMode::Auto => {
                auto_exposure_value(&self.exposure_menu()).ok_or_else(|| missing("Auto exposure"))?
            }
            ExposureMode::Manual => V4L2_EXPOSURE_MANUAL,
        };
        debug!(device = %self.device.path(), ?mode, value, "Setting exposure mode");
        self.set("Exposure mode", V4L2_CID_EXPOSURE_AUTO, value)
    }

    fn exposure_duration(&self) -> BackendResult<Duration> {
        let raw = self
            .device
            .get(V4L2_CID_EXPOSURE_ABSOLUTE)
            .map_err(|e| control_error("Exposure time", e))?;
        Ok(exposure_to_duration(raw))
    }

    fn exposure_duration_range(&self) -> BackendResult<ExposureDurationRange> {
        let info = self.exposure_info()?;
        Ok(ExposureDurationRange {
            min: exposure_to_duration(info.minimum),
            max: exposure_to_duration(info.maximum),
        })
    }

    fn set_custom_exposure(&mut self, duration: Duration) -> BackendResult<()> {
        let info = self.exposure_info()?;
        let raw = info.clamp(duration_to_exposure(duration));

        self.set("Exposure mode", V4L2_CID_EXPOSURE_AUTO, V4L2_EXPOSURE_MANUAL)?;
        debug!(device = %self.device.path(), ?duration, raw, "Setting exposure time");
        self.set("Exposure time", V4L2_CID_EXPOSURE_ABSOLUTE, raw)
    }

    fn white_balance_mode(&self) -> BackendResult<WhiteBalanceMode> {
        let value = self
            .device
            .get(V4L2_CID_AUTO_WHITE_BALANCE)
            .map_err(|e| control_error("White balance mode", e))?;
        Ok(if value != 0 {
            WhiteBalanceMode::Auto
        } else {
            WhiteBalanceMode::Locked
        })
    }

    fn is_white_balance_mode_supported(&self, mode: WhiteBalanceMode) -> bool {
        match mode {
            WhiteBalanceMode::Auto => self.device.has(V4L2_CID_AUTO_WHITE_BALANCE),
            WhiteBalanceMode::Locked => self.device.has(V4L2_CID_WHITE_BALANCE_TEMPERATURE),
        }
    }

    fn set_white_balance_mode(&mut self, mode: WhiteBalanceMode) -> BackendResult<()> {
        let value = i32::from(mode == WhiteBalanceMode::Auto);
        self.set("White balance mode", V4L2_CID_AUTO_WHITE_BALANCE, value)
    }

    fn white_balance_gains(&self) -> BackendResult<WhiteBalanceGains> {
        let kelvin = self
            .device
            .get(V4L2_CID_WHITE_BALANCE_TEMPERATURE)
            .map_err(|e| control_error("White balance temperature", e))?;
        Ok(self.gains_for_temperature(kelvin as f32))
    }

    fn max_white_balance_gain(&self) -> f32 {
        DEFAULT_MAX_GAIN
    }

    fn lock_white_balance(&mut self, gains: WhiteBalanceGains) -> BackendResult<()> {
        let info = self.temperature_info()?;
        let kelvin = info.clamp(self.temperature_for_gains(gains).round() as i32);

        if self.device.has(V4L2_CID_AUTO_WHITE_BALANCE) {
            self.set("White balance mode", V4L2_CID_AUTO_WHITE_BALANCE, 0)?;
        }
        debug!(device = %self.device.path(), ?gains, kelvin, "Locking white balance");
        self.set("White balance temperature", V4L2_CID_WHITE_BALANCE_TEMPERATURE, kelvin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exposure_units() {
        assert_eq!(exposure_to_duration(1), Duration::from_micros(100));
        assert_eq!(exposure_to_duration(156), Duration::from_micros(15_600));
        assert_eq!(exposure_to_duration(-5), Duration::ZERO);
        assert_eq!(duration_to_exposure(Duration::from_millis(10)), 100);
        assert_eq!(duration_to_exposure(Duration::from_micros(149)), 1);
        assert_eq!(duration_to_exposure(Duration::from_micros(150)), 2);
    }
}
