// SPDX-License-Identifier: GPL-3.0-only

//! Exposure duration <-> slider position mapping
//!
//! The slider runs over `[0, 1]`. Positions are mapped through a power curve
//! so that most of the slider travel covers the short durations people
//! actually adjust:
//!
//! ```text
//! position = ((d - min) / (max - min)) ^ (1 / 5)
//! d        = position ^ 5 * (max - min) + min
//! ```
//!
//! `min` is the device minimum floored to 1/1000 s.

use crate::backends::camera::types::ExposureDurationRange;
use crate::constants::exposure::{DURATION_POWER, MINIMUM_DURATION};
use std::time::Duration;

/// Exposure curve bound to one device's duration range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureCurve {
    min_secs: f64,
    max_secs: f64,
}

impl ExposureCurve {
    /// Build the curve for a device-reported range
    ///
    /// A range whose maximum lies below the floored minimum collapses to a
    /// single duration.
    pub fn new(range: ExposureDurationRange) -> Self {
        let min_secs = range.min.max(MINIMUM_DURATION).as_secs_f64();
        let max_secs = range.max.as_secs_f64().max(min_secs);
        Self { min_secs, max_secs }
    }

    /// Shortest duration on the curve (after flooring)
    pub fn min(&self) -> Duration {
        Duration::from_secs_f64(self.min_secs)
    }

    /// Longest duration on the curve
    pub fn max(&self) -> Duration {
        Duration::from_secs_f64(self.max_secs)
    }

    fn span(&self) -> f64 {
        self.max_secs - self.min_secs
    }

    /// Slider position for a device exposure duration, in `[0, 1]`
    ///
    /// Durations outside the range clamp to the nearest end.
    pub fn slider_position(&self, duration: Duration) -> f64 {
        let span = self.span();
        if span <= 0.0 {
            return 0.0;
        }
        let linear = ((duration.as_secs_f64() - self.min_secs) / span).clamp(0.0, 1.0);
        linear.powf(1.0 / DURATION_POWER)
    }

    /// Device exposure duration for a slider position
    ///
    /// Positions outside `[0, 1]` clamp to the nearest end.
    pub fn duration_for(&self, position: f64) -> Duration {
        let position = if position.is_nan() {
            0.0
        } else {
            position.clamp(0.0, 1.0)
        };
        let secs = position.powf(DURATION_POWER) * self.span() + self.min_secs;
        Duration::from_secs_f64(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(min: Duration, max: Duration) -> ExposureCurve {
        ExposureCurve::new(ExposureDurationRange { min, max })
    }

    fn webcam_curve() -> ExposureCurve {
        // Typical UVC range: 100 µs .. 500 ms
        curve(Duration::from_micros(100), Duration::from_millis(500))
    }

    #[test]
    fn test_minimum_is_floored() {
        let c = webcam_curve();
        assert_eq!(c.min(), Duration::from_millis(1));
        assert_eq!(c.max(), Duration::from_millis(500));
    }

    #[test]
    fn test_endpoints() {
        let c = webcam_curve();
        assert_eq!(c.slider_position(c.min()), 0.0);
        assert!((c.slider_position(c.max()) - 1.0).abs() < 1e-12);
        assert_eq!(c.duration_for(0.0), c.min());
        assert!((c.duration_for(1.0).as_secs_f64() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_roundtrip_within_range() {
        let c = webcam_curve();
        let steps = 200;
        for i in 0..=steps {
            let span = (c.max() - c.min()).as_secs_f64();
            let secs = c.min().as_secs_f64() + span * i as f64 / steps as f64;
            let d = Duration::from_secs_f64(secs);
            let p = c.slider_position(d);
            assert!((0.0..=1.0).contains(&p), "position {} out of range", p);
            let back = c.duration_for(p);
            let error = (back.as_secs_f64() - secs).abs();
            assert!(error < 1e-8, "{:?} came back as {:?}", d, back);
        }
    }

    #[test]
    fn test_curve_favors_short_durations() {
        let c = webcam_curve();
        // Halfway along the slider is only 1/32 of the way through the range
        let mid = c.duration_for(0.5).as_secs_f64();
        let expected = 0.5f64.powi(5) * (0.5 - 0.001) + 0.001;
        assert!((mid - expected).abs() < 1e-8);
    }

    #[test]
    fn test_out_of_range_inputs_clamp() {
        let c = webcam_curve();
        assert_eq!(c.slider_position(Duration::from_micros(10)), 0.0);
        assert_eq!(c.slider_position(Duration::from_secs(3)), 1.0);
        assert_eq!(c.duration_for(-1.0), c.min());
        assert_eq!(c.duration_for(f64::NAN), c.min());
        assert_eq!(c.duration_for(7.0), c.duration_for(1.0));
    }

    #[test]
    fn test_degenerate_range() {
        // Device max shorter than the 1 ms floor
        let c = curve(Duration::from_micros(50), Duration::from_micros(500));
        assert_eq!(c.min(), c.max());
        assert_eq!(c.slider_position(Duration::from_micros(300)), 0.0);
        assert_eq!(c.duration_for(0.7), Duration::from_millis(1));
    }
}
