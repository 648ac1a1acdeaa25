// SPDX-License-Identifier: GPL-3.0-only

//! Settings panel view-model
//!
//! Holds a draft [`CameraSetting`] while the panel is open. Nothing reaches
//! the device until [`SettingsPanel::apply`] hands the whole draft back.

use crate::constants::white_balance::{SLIDER_MAX_KELVIN, SLIDER_MIN_KELVIN};
use crate::controls::CameraSetting;
use std::ops::RangeInclusive;

/// Exposure slider step for one key press
const EXPOSURE_STEP: f64 = 0.05;
/// White balance slider step for one key press (Kelvin)
const WHITE_BALANCE_STEP: f64 = 100.0;

/// Focusable rows of the panel, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    AutoExposure,
    Exposure,
    AutoWhiteBalance,
    WhiteBalance,
    Apply,
    Close,
}

impl SettingsField {
    pub const ALL: [SettingsField; 6] = [
        SettingsField::AutoExposure,
        SettingsField::Exposure,
        SettingsField::AutoWhiteBalance,
        SettingsField::WhiteBalance,
        SettingsField::Apply,
        SettingsField::Close,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SettingsField::AutoExposure => "Auto exposure",
            SettingsField::Exposure => "Exposure",
            SettingsField::AutoWhiteBalance => "Auto white balance",
            SettingsField::WhiteBalance => "White balance",
            SettingsField::Apply => "Apply",
            SettingsField::Close => "Close",
        }
    }

    fn index(&self) -> usize {
        Self::ALL.iter().position(|f| f == self).unwrap_or(0)
    }
}

/// What the caller should do after activating a field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelAction {
    Apply(CameraSetting),
    Close,
}

#[derive(Debug, Clone)]
pub struct SettingsPanel {
    original: CameraSetting,
    draft: CameraSetting,
    focus: SettingsField,
}

impl SettingsPanel {
    /// Open the panel on a device snapshot
    pub fn new(setting: CameraSetting) -> Self {
        let mut draft = setting;
        draft.exposure_value = draft.exposure_value.clamp(0.0, 1.0);
        draft.white_balance_value = clamp_kelvin(draft.white_balance_value);
        Self {
            original: setting,
            draft,
            focus: SettingsField::AutoExposure,
        }
    }

    pub fn draft(&self) -> &CameraSetting {
        &self.draft
    }

    pub fn focus(&self) -> SettingsField {
        self.focus
    }

    /// Whether the draft differs from what the device reported
    pub fn is_modified(&self) -> bool {
        self.draft != self.original
    }

    pub fn exposure_range() -> RangeInclusive<f64> {
        0.0..=1.0
    }

    pub fn white_balance_range() -> RangeInclusive<f64> {
        SLIDER_MIN_KELVIN..=SLIDER_MAX_KELVIN
    }

    /// Sliders are read-only while their auto checkbox is on
    pub fn is_enabled(&self, field: SettingsField) -> bool {
        match field {
            SettingsField::Exposure => !self.draft.auto_exposure,
            SettingsField::WhiteBalance => !self.draft.auto_white_balance,
            _ => true,
        }
    }

    pub fn set_auto_exposure(&mut self, auto: bool) {
        self.draft.auto_exposure = auto;
    }

    pub fn set_auto_white_balance(&mut self, auto: bool) {
        self.draft.auto_white_balance = auto;
    }

    /// Move the exposure slider; ignored while auto exposure is on
    pub fn set_exposure(&mut self, value: f64) -> bool {
        if !self.is_enabled(SettingsField::Exposure) || value.is_nan() {
            return false;
        }
        self.draft.exposure_value = value.clamp(0.0, 1.0);
        true
    }

    /// Move the white balance slider; ignored while auto white balance is on
    pub fn set_white_balance(&mut self, kelvin: f64) -> bool {
        if !self.is_enabled(SettingsField::WhiteBalance) || kelvin.is_nan() {
            return false;
        }
        self.draft.white_balance_value = clamp_kelvin(kelvin);
        true
    }

    /// Move focus to the next enabled field, wrapping around
    pub fn focus_next(&mut self) {
        self.step_focus(1);
    }

    pub fn focus_prev(&mut self) {
        self.step_focus(SettingsField::ALL.len() - 1);
    }

    fn step_focus(&mut self, offset: usize) {
        let count = SettingsField::ALL.len();
        let mut index = self.focus.index();
        for _ in 0..count {
            index = (index + offset) % count;
            let candidate = SettingsField::ALL[index];
            if self.is_enabled(candidate) {
                self.focus = candidate;
                return;
            }
        }
    }

    /// Nudge the focused slider by `steps` increments
    pub fn nudge(&mut self, steps: i32) {
        match self.focus {
            SettingsField::Exposure => {
                self.set_exposure(self.draft.exposure_value + steps as f64 * EXPOSURE_STEP);
            }
            SettingsField::WhiteBalance => {
                self.set_white_balance(
                    self.draft.white_balance_value + steps as f64 * WHITE_BALANCE_STEP,
                );
            }
            SettingsField::AutoExposure => self.set_auto_exposure(steps < 0),
            SettingsField::AutoWhiteBalance => self.set_auto_white_balance(steps < 0),
            SettingsField::Apply | SettingsField::Close => {}
        }
    }

    /// Press the focused field
    ///
    /// Checkboxes toggle in place; the buttons return an action for the caller.
    pub fn activate(&mut self) -> Option<PanelAction> {
        match self.focus {
            SettingsField::AutoExposure => {
                self.set_auto_exposure(!self.draft.auto_exposure);
                None
            }
            SettingsField::AutoWhiteBalance => {
                self.set_auto_white_balance(!self.draft.auto_white_balance);
                None
            }
            SettingsField::Apply => Some(PanelAction::Apply(self.apply())),
            SettingsField::Close => Some(PanelAction::Close),
            SettingsField::Exposure | SettingsField::WhiteBalance => None,
        }
    }

    /// The complete draft, to be written to the device in one call
    pub fn apply(&self) -> CameraSetting {
        self.draft
    }

    /// Discard the draft
    pub fn close(self) {}
}

fn clamp_kelvin(kelvin: f64) -> f64 {
    if kelvin.is_nan() {
        return crate::constants::white_balance::DEFAULT_KELVIN;
    }
    kelvin.clamp(SLIDER_MIN_KELVIN, SLIDER_MAX_KELVIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual() -> CameraSetting {
        CameraSetting {
            auto_exposure: false,
            auto_white_balance: false,
            exposure_value: 0.5,
            white_balance_value: 5000.0,
        }
    }

    #[test]
    fn test_sliders_disabled_while_auto() {
        let mut panel = SettingsPanel::new(CameraSetting::default());
        assert!(!panel.is_enabled(SettingsField::Exposure));
        assert!(!panel.is_enabled(SettingsField::WhiteBalance));
        assert!(!panel.set_exposure(0.3));
        assert!(!panel.set_white_balance(3000.0));
        assert!(!panel.is_modified());

        panel.set_auto_exposure(false);
        assert!(panel.set_exposure(0.3));
        assert_eq!(panel.draft().exposure_value, 0.3);
    }

    #[test]
    fn test_apply_returns_whole_draft() {
        let mut panel = SettingsPanel::new(manual());
        panel.set_exposure(0.8);
        panel.set_white_balance(4200.0);

        let applied = panel.apply();
        assert_eq!(
            applied,
            CameraSetting {
                auto_exposure: false,
                auto_white_balance: false,
                exposure_value: 0.8,
                white_balance_value: 4200.0,
            }
        );
        assert!(panel.is_modified());
    }

    #[test]
    fn test_white_balance_range() {
        let mut panel = SettingsPanel::new(manual());
        panel.set_white_balance(500.0);
        assert_eq!(panel.draft().white_balance_value, 2000.0);
        panel.set_white_balance(40_000.0);
        assert_eq!(panel.draft().white_balance_value, 10_000.0);

        // Device reports outside the slider range are clamped on open
        let mut far = manual();
        far.white_balance_value = 15_000.0;
        let panel = SettingsPanel::new(far);
        assert_eq!(panel.draft().white_balance_value, 10_000.0);
        assert!(panel.is_modified());
    }

    #[test]
    fn test_focus_skips_disabled_sliders() {
        let mut panel = SettingsPanel::new(CameraSetting::default());
        assert_eq!(panel.focus(), SettingsField::AutoExposure);
        panel.focus_next();
        assert_eq!(panel.focus(), SettingsField::AutoWhiteBalance);
        panel.focus_next();
        assert_eq!(panel.focus(), SettingsField::Apply);
        panel.focus_next();
        assert_eq!(panel.focus(), SettingsField::Close);
        panel.focus_next();
        assert_eq!(panel.focus(), SettingsField::AutoExposure);
        panel.focus_prev();
        assert_eq!(panel.focus(), SettingsField::Close);
    }

    #[test]
    fn test_nudge_and_activate() {
        let mut panel = SettingsPanel::new(manual());
        panel.focus_next();
        assert_eq!(panel.focus(), SettingsField::Exposure);
        panel.nudge(2);
        assert!((panel.draft().exposure_value - 0.6).abs() < 1e-12);
        panel.nudge(-100);
        assert_eq!(panel.draft().exposure_value, 0.0);

        panel.focus_next();
        panel.focus_next();
        assert_eq!(panel.focus(), SettingsField::WhiteBalance);
        panel.nudge(-3);
        assert_eq!(panel.draft().white_balance_value, 4700.0);

        panel.focus_prev();
        assert_eq!(panel.activate(), None);
        assert!(panel.draft().auto_white_balance);
        // Slider lost its focus target; focus moves past it
        panel.focus_next();
        assert_eq!(panel.focus(), SettingsField::Apply);

        match panel.activate() {
            Some(PanelAction::Apply(setting)) => assert!(setting.auto_white_balance),
            other => panic!("unexpected action {:?}", other),
        }
        panel.focus_next();
        assert_eq!(panel.activate(), Some(PanelAction::Close));
    }
}
