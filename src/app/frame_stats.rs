// SPDX-License-Identifier: GPL-3.0-only

//! Frame rate measurement for the status bar

use crate::backends::camera::types::CameraFrame;
use crate::constants::timing::FRAME_LOG_INTERVAL;
use crate::controller::FrameObserver;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

/// Window over which the frame rate is averaged
const WINDOW: Duration = Duration::from_secs(1);

#[derive(Default)]
struct Inner {
    total: u64,
    recent: VecDeque<Instant>,
}

impl Inner {
    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.recent.front() {
            if now.duration_since(oldest) > WINDOW {
                self.recent.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Counts delivered frames and reports a rolling frame rate
#[derive(Default)]
pub struct FrameStats {
    inner: Mutex<Inner>,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, at: Instant) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.total += 1;
        inner.recent.push_back(at);
        inner.prune(at);
        if inner.total % FRAME_LOG_INTERVAL == 0 {
            debug!(frames = inner.total, fps = inner.recent.len(), "Frame statistics");
        }
    }

    /// Frames seen since creation
    pub fn total_frames(&self) -> u64 {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .total
    }

    /// Frames per second over the last second; zero once frames stop
    pub fn fps(&self) -> f64 {
        self.fps_at(Instant::now())
    }

    fn fps_at(&self, now: Instant) -> f64 {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.prune(now);
        match (inner.recent.front(), inner.recent.back()) {
            (Some(first), Some(last)) if inner.recent.len() > 1 => {
                let span = last.duration_since(*first).as_secs_f64();
                if span > 0.0 {
                    (inner.recent.len() - 1) as f64 / span
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }
}

impl FrameObserver for FrameStats {
    fn on_frame(&self, frame: &CameraFrame) {
        self.record(frame.captured_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_from_timestamps() {
        let stats = FrameStats::new();
        let start = Instant::now();
        for i in 0..=30 {
            stats.record(start + Duration::from_millis(i * 20));
        }
        assert_eq!(stats.total_frames(), 31);
        let last = start + Duration::from_millis(600);
        assert!((stats.fps_at(last) - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_rate_drops_to_zero_when_frames_stop() {
        let stats = FrameStats::new();
        let start = Instant::now();
        for i in 0..10 {
            stats.record(start + Duration::from_millis(i * 33));
        }
        assert!(stats.fps_at(start + Duration::from_millis(300)) > 0.0);
        assert_eq!(stats.fps_at(start + Duration::from_secs(3)), 0.0);
        assert_eq!(stats.total_frames(), 10);
    }

    #[test]
    fn test_window_drops_old_frames() {
        let stats = FrameStats::new();
        let start = Instant::now();
        stats.record(start);
        stats.record(start + Duration::from_secs(5));
        assert_eq!(stats.total_frames(), 2);
        assert_eq!(stats.fps_at(start + Duration::from_secs(5)), 0.0);
    }
}
