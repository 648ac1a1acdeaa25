// SPDX-License-Identifier: GPL-3.0-only

//! White balance gain and color temperature conversion
//!
//! Gains are the per-channel multipliers that neutralize an illuminant. The
//! illuminant for a temperature is taken from the Planckian locus (Kang et al.
//! 2002 cubic approximation in CIE xy), converted to linear sRGB. Gains are the
//! reciprocal of that color, normalized so the smallest channel is 1.0.
//!
//! The blue/red gain ratio falls monotonically with temperature across the
//! model range, which lets the reverse conversion bisect on it.

use crate::backends::camera::types::WhiteBalanceGains;
use crate::constants::white_balance::{MIN_GAIN, MODEL_MAX_KELVIN, MODEL_MIN_KELVIN};

/// Smallest channel value kept after the XYZ -> sRGB conversion
const CHANNEL_FLOOR: f64 = 1e-4;

const BISECTION_STEPS: usize = 64;

/// CIE 1931 chromaticity of a blackbody at the given temperature
fn planckian_xy(kelvin: f64) -> (f64, f64) {
    let t = kelvin.clamp(MODEL_MIN_KELVIN as f64, MODEL_MAX_KELVIN as f64);
    let t2 = t * t;
    let t3 = t2 * t;

    let x = if t <= 4000.0 {
        -0.2661239e9 / t3 - 0.2343589e6 / t2 + 0.8776956e3 / t + 0.179910
    } else {
        -3.0258469e9 / t3 + 2.1070379e6 / t2 + 0.2226347e3 / t + 0.240390
    };
    let x2 = x * x;
    let x3 = x2 * x;

    let y = if t <= 2222.0 {
        -1.1063814 * x3 - 1.34811020 * x2 + 2.18555832 * x - 0.20219683
    } else if t <= 4000.0 {
        -0.9549476 * x3 - 1.37418593 * x2 + 2.09137015 * x - 0.16748867
    } else {
        3.0817580 * x3 - 5.87338670 * x2 + 3.75112997 * x - 0.37001483
    };

    (x, y)
}

/// Linear sRGB color of the illuminant, luminance normalized to 1
fn illuminant_rgb(kelvin: f64) -> [f64; 3] {
    let (x, y) = planckian_xy(kelvin);
    let big_x = x / y;
    let big_z = (1.0 - x - y) / y;

    let r = 3.2406 * big_x - 1.5372 - 0.4986 * big_z;
    let g = -0.9689 * big_x + 1.8758 + 0.0415 * big_z;
    let b = 0.0557 * big_x - 0.2040 + 1.0570 * big_z;

    [
        r.max(CHANNEL_FLOOR),
        g.max(CHANNEL_FLOOR),
        b.max(CHANNEL_FLOOR),
    ]
}

/// Blue gain over red gain for an illuminant temperature
fn blue_red_ratio(kelvin: f64) -> f64 {
    let [r, _, b] = illuminant_rgb(kelvin);
    r / b
}

/// Gains that neutralize a light source of the given temperature
///
/// The result may exceed what a device accepts; callers clamp with
/// [`clamp_gains`] before applying.
pub fn gains_for_temperature(kelvin: f32) -> WhiteBalanceGains {
    let [r, g, b] = illuminant_rgb(kelvin as f64);
    let (gr, gg, gb) = (1.0 / r, 1.0 / g, 1.0 / b);
    let smallest = gr.min(gg).min(gb);

    WhiteBalanceGains::new(
        (gr / smallest) as f32,
        (gg / smallest) as f32,
        (gb / smallest) as f32,
    )
}

/// Color temperature whose neutralizing gains match the given gains
///
/// Only the blue/red ratio carries temperature; green is the tint axis and is
/// ignored. Results are clamped to the model range.
pub fn temperature_for_gains(gains: WhiteBalanceGains) -> f32 {
    let red = (gains.red as f64).max(f64::EPSILON);
    let blue = (gains.blue as f64).max(f64::EPSILON);
    let target = blue / red;

    let mut lo = MODEL_MIN_KELVIN as f64;
    let mut hi = MODEL_MAX_KELVIN as f64;

    if target >= blue_red_ratio(lo) {
        return MODEL_MIN_KELVIN;
    }
    if target <= blue_red_ratio(hi) {
        return MODEL_MAX_KELVIN;
    }

    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        if blue_red_ratio(mid) > target {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    (0.5 * (lo + hi)) as f32
}

/// Clamp every channel into `[1.0, max_gain]`
///
/// Temperature conversion can produce gains outside what the device accepts.
pub fn clamp_gains(gains: WhiteBalanceGains, max_gain: f32) -> WhiteBalanceGains {
    let ceiling = max_gain.max(MIN_GAIN);
    gains.map(|g| {
        if g.is_nan() {
            MIN_GAIN
        } else {
            g.clamp(MIN_GAIN, ceiling)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daylight_is_nearly_neutral() {
        let gains = gains_for_temperature(6500.0);
        for g in gains.channels() {
            assert!((1.0..1.15).contains(&g), "gain {} not near neutral", g);
        }
    }

    #[test]
    fn test_warm_light_needs_blue_gain() {
        let warm = gains_for_temperature(3000.0);
        assert!(warm.blue > warm.red);

        let cool = gains_for_temperature(9000.0);
        assert!(cool.red > cool.blue);
    }

    #[test]
    fn test_temperature_roundtrip() {
        for kelvin in [2500.0, 3000.0, 5000.0, 6500.0, 9000.0, 12000.0] {
            let back = temperature_for_gains(gains_for_temperature(kelvin));
            let error = (back - kelvin).abs() / kelvin;
            assert!(error < 0.005, "{} K came back as {} K", kelvin, back);
        }
    }

    #[test]
    fn test_ratio_decreases_with_temperature() {
        let mut previous = f64::INFINITY;
        let mut kelvin = MODEL_MIN_KELVIN as f64;
        while kelvin <= MODEL_MAX_KELVIN as f64 {
            let ratio = blue_red_ratio(kelvin);
            assert!(ratio < previous, "ratio not decreasing at {} K", kelvin);
            previous = ratio;
            kelvin += 250.0;
        }
    }

    #[test]
    fn test_out_of_model_gains_clamp_temperature() {
        let very_blue = WhiteBalanceGains::new(1.0, 1.0, 1000.0);
        assert_eq!(temperature_for_gains(very_blue), MODEL_MIN_KELVIN);

        let very_red = WhiteBalanceGains::new(1000.0, 1.0, 1.0);
        assert_eq!(temperature_for_gains(very_red), MODEL_MAX_KELVIN);
    }

    #[test]
    fn test_clamp_gains_bounds() {
        let max_gain = 4.0;
        for raw in [0.0, 0.5, 1.0, 2.5, 4.0, 17.0, -3.0, f32::NAN] {
            let clamped = clamp_gains(WhiteBalanceGains::new(raw, raw, raw), max_gain);
            for g in clamped.channels() {
                assert!((1.0..=max_gain).contains(&g), "{} clamped to {}", raw, g);
            }
        }
    }

    #[test]
    fn test_clamp_gains_idempotent() {
        let gains = WhiteBalanceGains::new(0.3, 2.2, 9.5);
        let once = clamp_gains(gains, 3.0);
        assert_eq!(clamp_gains(once, 3.0), once);
        assert_eq!(once, WhiteBalanceGains::new(1.0, 2.2, 3.0));
    }

    #[test]
    fn test_clamp_gains_with_degenerate_max() {
        // A device max below 1.0 collapses everything onto 1.0
        let clamped = clamp_gains(WhiteBalanceGains::new(2.0, 0.5, 3.0), 0.8);
        assert_eq!(clamped, WhiteBalanceGains::NEUTRAL);
    }
}
