// SPDX-License-Identifier: GPL-3.0-only

//! Camera settings snapshot and its translation to device controls

use super::exposure::ExposureCurve;
use super::white_balance::clamp_gains;
use crate::backends::camera::{BackendResult, DeviceControls, ExposureMode, WhiteBalanceMode};
use crate::constants::white_balance::DEFAULT_KELVIN;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// User-facing exposure and white balance values
///
/// `exposure_value` is a slider position in `[0, 1]`; `white_balance_value`
/// is a color temperature in Kelvin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraSetting {
    pub auto_exposure: bool,
    pub auto_white_balance: bool,
    pub exposure_value: f64,
    pub white_balance_value: f64,
}

impl Default for CameraSetting {
    fn default() -> Self {
        Self {
            auto_exposure: true,
            auto_white_balance: true,
            exposure_value: 0.0,
            white_balance_value: DEFAULT_KELVIN,
        }
    }
}

/// Snapshot the live device state
///
/// A control the device cannot report keeps its default value, so cameras
/// missing a control still produce a snapshot.
pub fn read_setting(controls: &dyn DeviceControls) -> CameraSetting {
    let defaults = CameraSetting::default();

    let exposure_value = controls.exposure_duration_range().and_then(|range| {
        let duration = controls.exposure_duration()?;
        Ok(ExposureCurve::new(range).slider_position(duration))
    });
    let white_balance_value = controls
        .white_balance_gains()
        .map(|gains| controls.temperature_for_gains(gains) as f64);

    CameraSetting {
        auto_exposure: readable("exposure_mode", controls.exposure_mode())
            .map_or(defaults.auto_exposure, |mode| mode == ExposureMode::Auto),
        auto_white_balance: readable("white_balance_mode", controls.white_balance_mode())
            .map_or(defaults.auto_white_balance, |mode| mode == WhiteBalanceMode::Auto),
        exposure_value: readable("exposure", exposure_value).unwrap_or(defaults.exposure_value),
        white_balance_value: readable("white_balance", white_balance_value)
            .unwrap_or(defaults.white_balance_value),
    }
}

fn readable<T>(control: &str, value: BackendResult<T>) -> Option<T> {
    value
        .map_err(|e| debug!(control, error = %e, "Control unreadable, using default"))
        .ok()
}

/// Push a full setting to the device
///
/// The device is held locked for configuration for the whole update and
/// unlocked again whether or not the update succeeded.
pub fn apply_setting(
    controls: &mut dyn DeviceControls,
    setting: &CameraSetting,
) -> BackendResult<()> {
    controls.lock_for_configuration()?;
    let result = apply_locked(controls, setting);
    controls.unlock_for_configuration();
    result
}

fn apply_locked(controls: &mut dyn DeviceControls, setting: &CameraSetting) -> BackendResult<()> {
    if setting.auto_exposure && controls.is_exposure_mode_supported(ExposureMode::Auto) {
        controls.set_exposure_mode(ExposureMode::Auto)?;
    } else {
        let curve = ExposureCurve::new(controls.exposure_duration_range()?);
        let duration = curve.duration_for(setting.exposure_value);
        debug!(position = setting.exposure_value, ?duration, "Applying custom exposure");
        controls.set_custom_exposure(duration)?;
    }

    let auto_wb = controls.is_white_balance_mode_supported(WhiteBalanceMode::Auto);
    if setting.auto_white_balance && auto_wb {
        controls.set_white_balance_mode(WhiteBalanceMode::Auto)?;
    } else {
        let gains = controls.gains_for_temperature(setting.white_balance_value as f32);
        let gains = clamp_gains(gains, controls.max_white_balance_gain());
        debug!(kelvin = setting.white_balance_value, ?gains, "Locking white balance");
        controls.lock_white_balance(gains)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{BackendError, ExposureDurationRange, WhiteBalanceGains};
    use std::time::Duration;

    struct FakeControls {
        exposure_mode: ExposureMode,
        duration: Duration,
        wb_mode: WhiteBalanceMode,
        gains: WhiteBalanceGains,
        supports_auto: bool,
        max_gain: f32,
        locked: bool,
        lock_count: usize,
        fail_exposure: bool,
        exposure_unreadable: bool,
    }

    impl Default for FakeControls {
        fn default() -> Self {
            Self {
                exposure_mode: ExposureMode::Auto,
                duration: Duration::from_millis(10),
                wb_mode: WhiteBalanceMode::Auto,
                gains: WhiteBalanceGains::NEUTRAL,
                supports_auto: true,
                max_gain: 4.0,
                locked: false,
                lock_count: 0,
                fail_exposure: false,
                exposure_unreadable: false,
            }
        }
    }

    impl DeviceControls for FakeControls {
        fn lock_for_configuration(&mut self) -> BackendResult<()> {
            self.locked = true;
            self.lock_count += 1;
            Ok(())
        }

        fn unlock_for_configuration(&mut self) {
            self.locked = false;
        }

        fn exposure_mode(&self) -> BackendResult<ExposureMode> {
            Ok(self.exposure_mode)
        }

        fn is_exposure_mode_supported(&self, mode: ExposureMode) -> bool {
            mode == ExposureMode::Manual || self.supports_auto
        }

        fn set_exposure_mode(&mut self, mode: ExposureMode) -> BackendResult<()> {
            self.exposure_mode = mode;
            Ok(())
        }

        fn exposure_duration(&self) -> BackendResult<Duration> {
            Ok(self.duration)
        }

        fn exposure_duration_range(&self) -> BackendResult<ExposureDurationRange> {
            if self.exposure_unreadable {
                return Err(BackendError::ControlFailed("no exposure_time_absolute".into()));
            }
            Ok(ExposureDurationRange {
                min: Duration::from_micros(100),
                max: Duration::from_millis(500),
            })
        }

        fn set_custom_exposure(&mut self, duration: Duration) -> BackendResult<()> {
            if self.fail_exposure {
                return Err(BackendError::ControlFailed("exposure rejected".into()));
            }
            assert!(self.locked, "exposure changed without configuration lock");
            self.exposure_mode = ExposureMode::Manual;
            self.duration = duration;
            Ok(())
        }

        fn white_balance_mode(&self) -> BackendResult<WhiteBalanceMode> {
            Ok(self.wb_mode)
        }

        fn is_white_balance_mode_supported(&self, mode: WhiteBalanceMode) -> bool {
            mode == WhiteBalanceMode::Locked || self.supports_auto
        }

        fn set_white_balance_mode(&mut self, mode: WhiteBalanceMode) -> BackendResult<()> {
            self.wb_mode = mode;
            Ok(())
        }

        fn white_balance_gains(&self) -> BackendResult<WhiteBalanceGains> {
            Ok(self.gains)
        }

        fn max_white_balance_gain(&self) -> f32 {
            self.max_gain
        }

        fn lock_white_balance(&mut self, gains: WhiteBalanceGains) -> BackendResult<()> {
            self.wb_mode = WhiteBalanceMode::Locked;
            self.gains = gains;
            Ok(())
        }
    }

    fn manual(exposure_value: f64, white_balance_value: f64) -> CameraSetting {
        CameraSetting {
            auto_exposure: false,
            auto_white_balance: false,
            exposure_value,
            white_balance_value,
        }
    }

    #[test]
    fn test_read_reflects_device_state() {
        let controls = FakeControls::default();
        let setting = read_setting(&controls);
        assert!(setting.auto_exposure);
        assert!(setting.auto_white_balance);
        assert!((0.0..=1.0).contains(&setting.exposure_value));
        // Neutral gains sit close to daylight
        assert!((5500.0..7500.0).contains(&setting.white_balance_value));
    }

    #[test]
    fn test_unreadable_exposure_keeps_other_fields() {
        let controls = FakeControls {
            exposure_mode: ExposureMode::Manual,
            wb_mode: WhiteBalanceMode::Locked,
            exposure_unreadable: true,
            ..Default::default()
        };
        let setting = read_setting(&controls);
        assert!(!setting.auto_exposure);
        assert!(!setting.auto_white_balance);
        assert_eq!(setting.exposure_value, CameraSetting::default().exposure_value);
        assert!((5500.0..7500.0).contains(&setting.white_balance_value));
    }

    #[test]
    fn test_apply_manual_then_read_back() {
        let mut controls = FakeControls::default();
        apply_setting(&mut controls, &manual(0.6, 5000.0)).unwrap();

        assert_eq!(controls.exposure_mode, ExposureMode::Manual);
        assert_eq!(controls.wb_mode, WhiteBalanceMode::Locked);
        assert!(!controls.locked);

        let back = read_setting(&controls);
        assert!(!back.auto_exposure);
        assert!(!back.auto_white_balance);
        assert!((back.exposure_value - 0.6).abs() < 1e-6);
        assert!((back.white_balance_value - 5000.0).abs() < 20.0);
    }

    #[test]
    fn test_auto_short_circuits_manual_values() {
        let mut controls = FakeControls {
            exposure_mode: ExposureMode::Manual,
            wb_mode: WhiteBalanceMode::Locked,
            ..Default::default()
        };
        let before = controls.duration;

        let setting = CameraSetting {
            exposure_value: 0.9,
            ..CameraSetting::default()
        };
        apply_setting(&mut controls, &setting).unwrap();

        assert_eq!(controls.exposure_mode, ExposureMode::Auto);
        assert_eq!(controls.wb_mode, WhiteBalanceMode::Auto);
        assert_eq!(controls.duration, before);
    }

    #[test]
    fn test_auto_unsupported_falls_back_to_manual() {
        let mut controls = FakeControls {
            supports_auto: false,
            ..Default::default()
        };
        apply_setting(&mut controls, &CameraSetting::default()).unwrap();

        assert_eq!(controls.exposure_mode, ExposureMode::Manual);
        assert_eq!(controls.duration, Duration::from_millis(1));
        assert_eq!(controls.wb_mode, WhiteBalanceMode::Locked);
    }

    #[test]
    fn test_applied_gains_are_clamped() {
        let mut controls = FakeControls {
            max_gain: 1.5,
            ..Default::default()
        };
        // Very warm light needs a large blue gain
        apply_setting(&mut controls, &manual(0.0, 2000.0)).unwrap();
        for g in controls.gains.channels() {
            assert!((1.0..=1.5).contains(&g), "gain {} not clamped", g);
        }
    }

    #[test]
    fn test_failed_apply_still_unlocks() {
        let mut controls = FakeControls {
            fail_exposure: true,
            ..Default::default()
        };
        let result = apply_setting(&mut controls, &manual(0.5, 5000.0));
        assert!(matches!(result, Err(BackendError::ControlFailed(_))));
        assert!(!controls.locked);
        assert_eq!(controls.lock_count, 1);
    }
}
