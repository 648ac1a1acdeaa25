// SPDX-License-Identifier: GPL-3.0-only

//! Moving color-bar test pattern

use super::controls::{EXPOSURE_RANGE, SimulatedState};
use crate::backends::camera::types::{CameraFrame, ExposureMode, PixelFormat, WhiteBalanceMode};
use crate::controls::ExposureCurve;
use std::sync::Arc;
use std::time::Instant;

/// SMPTE-style bars: white, yellow, cyan, green, magenta, red, blue
const BARS: [[u8; 3]; 7] = [
    [235, 235, 235],
    [235, 235, 16],
    [16, 235, 235],
    [16, 235, 16],
    [235, 16, 235],
    [235, 16, 16],
    [16, 16, 235],
];

/// Brightness used while exposure is automatic
const AUTO_BRIGHTNESS: f32 = 0.8;
/// Darkest picture at the shortest manual exposure
const MIN_BRIGHTNESS: f32 = 0.1;
/// Pixels the pattern scrolls per frame
const SCROLL_STEP: u32 = 2;

/// Renders RGBA frames reflecting the simulated sensor state
pub struct PatternGenerator {
    width: u32,
    height: u32,
    sequence: u64,
    curve: ExposureCurve,
}

impl PatternGenerator {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            sequence: 0,
            curve: ExposureCurve::new(EXPOSURE_RANGE),
        }
    }

    fn brightness(&self, state: &SimulatedState) -> f32 {
        match state.exposure_mode {
            ExposureMode::Auto => AUTO_BRIGHTNESS,
            ExposureMode::Manual => {
                let position = self.curve.slider_position(state.exposure) as f32;
                MIN_BRIGHTNESS + (1.0 - MIN_BRIGHTNESS) * position
            }
        }
    }

    /// Per-channel multipliers: locked gains tint the picture
    fn tint(state: &SimulatedState) -> [f32; 3] {
        match state.white_balance_mode {
            WhiteBalanceMode::Auto => [1.0; 3],
            WhiteBalanceMode::Locked => {
                let channels = state.gains.channels();
                let peak = channels.iter().cloned().fold(f32::MIN_POSITIVE, f32::max);
                channels.map(|g| g / peak)
            }
        }
    }

    pub fn next_frame(&mut self, state: &SimulatedState) -> CameraFrame {
        let brightness = self.brightness(state);
        let tint = Self::tint(state);
        let offset = (self.sequence as u32).wrapping_mul(SCROLL_STEP);
        let bar_width = (self.width / BARS.len() as u32).max(1);

        let shaded: Vec<[u8; 4]> = BARS
            .iter()
            .map(|bar| {
                let mut px = [0, 0, 0, 255];
                for c in 0..3 {
                    px[c] = (bar[c] as f32 * brightness * tint[c]).round().clamp(0.0, 255.0) as u8;
                }
                px
            })
            .collect();

        let mut data = Vec::with_capacity((self.width * self.height * 4) as usize);
        for _ in 0..self.height {
            for x in 0..self.width {
                let bar = ((x.wrapping_add(offset) / bar_width) as usize) % BARS.len();
                data.extend_from_slice(&shaded[bar]);
            }
        }

        let frame = CameraFrame {
            width: self.width,
            height: self.height,
            data: Arc::from(data),
            format: PixelFormat::RGBA,
            stride: self.width * 4,
            captured_at: Instant::now(),
            sequence: self.sequence,
        };
        self.sequence += 1;
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::WhiteBalanceGains;
    use std::time::Duration;

    fn mean_luma(frame: &CameraFrame) -> f64 {
        let sum: u64 = frame
            .data
            .chunks_exact(4)
            .map(|px| px[0] as u64 + px[1] as u64 + px[2] as u64)
            .sum();
        sum as f64 / (frame.width * frame.height * 3) as f64
    }

    #[test]
    fn test_frame_layout() {
        let mut generator = PatternGenerator::new(64, 8);
        let frame = generator.next_frame(&SimulatedState::default());
        assert_eq!(frame.data.len(), 64 * 8 * 4);
        assert_eq!(frame.stride, 256);
        assert_eq!(frame.sequence, 0);
        assert_eq!(generator.next_frame(&SimulatedState::default()).sequence, 1);
    }

    #[test]
    fn test_longer_exposure_is_brighter() {
        let mut generator = PatternGenerator::new(70, 4);
        let short = SimulatedState {
            exposure_mode: ExposureMode::Manual,
            exposure: Duration::from_millis(1),
            ..Default::default()
        };
        let long = SimulatedState {
            exposure: Duration::from_millis(200),
            ..short
        };
        let dark = mean_luma(&generator.next_frame(&short));
        let bright = mean_luma(&generator.next_frame(&long));
        assert!(bright > dark * 2.0, "{} vs {}", bright, dark);
    }

    #[test]
    fn test_locked_gains_tint_the_picture() {
        let mut generator = PatternGenerator::new(7, 1);
        let state = SimulatedState {
            white_balance_mode: WhiteBalanceMode::Locked,
            gains: WhiteBalanceGains::new(1.0, 1.0, 4.0),
            ..Default::default()
        };
        let frame = generator.next_frame(&state);
        // First bar is white; blue stays strongest
        let (r, _, b) = frame.sample_rgb(0, 0);
        assert!(b > r * 3);
    }
}
