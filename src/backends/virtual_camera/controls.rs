// SPDX-License-Identifier: GPL-3.0-only

//! Simulated exposure and white balance

use crate::backends::camera::DeviceControls;
use crate::backends::camera::types::*;
use crate::constants::white_balance::DEFAULT_MAX_GAIN;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Exposure range reported by the synthetic sensor
pub const EXPOSURE_RANGE: ExposureDurationRange = ExposureDurationRange {
    min: Duration::from_micros(100),
    max: Duration::from_millis(250),
};

/// Sensor state read by the frame generator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedState {
    pub exposure_mode: ExposureMode,
    pub exposure: Duration,
    pub white_balance_mode: WhiteBalanceMode,
    pub gains: WhiteBalanceGains,
}

impl Default for SimulatedState {
    fn default() -> Self {
        Self {
            exposure_mode: ExposureMode::Auto,
            exposure: Duration::from_micros(16_600),
            white_balance_mode: WhiteBalanceMode::Auto,
            gains: WhiteBalanceGains::NEUTRAL,
        }
    }
}

/// [`DeviceControls`] over shared simulated state
#[derive(Debug, Clone, Default)]
pub struct VirtualControls {
    state: Arc<Mutex<SimulatedState>>,
}

impl VirtualControls {
    /// State handle for the frame generator
    pub fn shared_state(&self) -> Arc<Mutex<SimulatedState>> {
        Arc::clone(&self.state)
    }

    fn state(&self) -> MutexGuard<'_, SimulatedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DeviceControls for VirtualControls {
    fn exposure_mode(&self) -> BackendResult<ExposureMode> {
        Ok(self.state().exposure_mode)
    }

    fn is_exposure_mode_supported(&self, _mode: ExposureMode) -> bool {
        true
    }

    fn set_exposure_mode(&mut self, mode: ExposureMode) -> BackendResult<()> {
        self.state().exposure_mode = mode;
        Ok(())
    }

    fn exposure_duration(&self) -> BackendResult<Duration> {
        Ok(self.state().exposure)
    }

    fn exposure_duration_range(&self) -> BackendResult<ExposureDurationRange> {
        Ok(EXPOSURE_RANGE)
    }

    fn set_custom_exposure(&mut self, duration: Duration) -> BackendResult<()> {
        if duration < EXPOSURE_RANGE.min || duration > EXPOSURE_RANGE.max {
            return Err(BackendError::ControlFailed(format!(
                "exposure {:?} outside {:?}..{:?}",
                duration, EXPOSURE_RANGE.min, EXPOSURE_RANGE.max
            )));
        }
        let mut state = self.state();
        state.exposure_mode = ExposureMode::Manual;
        state.exposure = duration;
        Ok(())
    }

    fn white_balance_mode(&self) -> BackendResult<WhiteBalanceMode> {
        Ok(self.state().white_balance_mode)
    }

    fn is_white_balance_mode_supported(&self, _mode: WhiteBalanceMode) -> bool {
        true
    }

    fn set_white_balance_mode(&mut self, mode: WhiteBalanceMode) -> BackendResult<()> {
        self.state().white_balance_mode = mode;
        Ok(())
    }

    fn white_balance_gains(&self) -> BackendResult<WhiteBalanceGains> {
        Ok(self.state().gains)
    }

    fn max_white_balance_gain(&self) -> f32 {
        DEFAULT_MAX_GAIN
    }

    fn lock_white_balance(&mut self, gains: WhiteBalanceGains) -> BackendResult<()> {
        let max = self.max_white_balance_gain();
        if gains.channels().iter().any(|g| !(1.0..=max).contains(g)) {
            return Err(BackendError::ControlFailed(format!(
                "gains {:?} outside 1.0..{}",
                gains, max
            )));
        }
        let mut state = self.state();
        state.white_balance_mode = WhiteBalanceMode::Locked;
        state.gains = gains;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_exposure_switches_to_manual() {
        let mut controls = VirtualControls::default();
        controls.set_custom_exposure(Duration::from_millis(40)).unwrap();
        assert_eq!(controls.exposure_mode().unwrap(), ExposureMode::Manual);
        assert_eq!(controls.exposure_duration().unwrap(), Duration::from_millis(40));
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let mut controls = VirtualControls::default();
        assert!(controls.set_custom_exposure(Duration::from_secs(2)).is_err());
        assert!(
            controls
                .lock_white_balance(WhiteBalanceGains::new(1.0, 1.0, 9.0))
                .is_err()
        );
        assert_eq!(controls.white_balance_mode().unwrap(), WhiteBalanceMode::Auto);
    }

    #[test]
    fn test_state_is_shared_with_generator() {
        let mut controls = VirtualControls::default();
        let shared = controls.shared_state();
        controls
            .lock_white_balance(WhiteBalanceGains::new(1.0, 1.2, 2.0))
            .unwrap();
        assert_eq!(shared.lock().unwrap().gains.blue, 2.0);
    }
}
