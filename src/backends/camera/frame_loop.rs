// SPDX-License-Identifier: GPL-3.0-only
//! Thread lifecycle for paced frame loops
//!
//! Synthetic sources produce frames on their own thread at a fixed rate.
//! [`CaptureLoopController`] owns that thread: it calls the frame closure once
//! per tick until the closure asks to stop or the controller is stopped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Action returned by the loop closure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Continue,
    Stop,
}

/// Controller for a frame loop running in a separate thread
///
/// ```ignore
/// let mut controller = CaptureLoopController::start("virtual-camera", interval, move || {
///     sink(generator.next_frame());
///     LoopAction::Continue
/// })?;
/// controller.stop();
/// ```
pub struct CaptureLoopController {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl CaptureLoopController {
    /// Start calling `loop_fn` every `interval`
    ///
    /// An iteration that overruns the interval is followed immediately by the
    /// next one; missed ticks are not made up.
    pub fn start<F>(name: &str, interval: Duration, mut loop_fn: F) -> std::io::Result<Self>
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop_signal_clone = Arc::clone(&stop_signal);
        let name_clone = name.to_string();

        info!(name = %name, ?interval, "Starting frame loop");

        let thread_handle = thread::Builder::new().name(name.to_string()).spawn(move || {
            let mut next_tick = Instant::now();

            while !stop_signal_clone.load(Ordering::SeqCst) {
                if loop_fn() == LoopAction::Stop {
                    debug!(name = %name_clone, "Loop requested stop");
                    break;
                }

                next_tick += interval;
                let now = Instant::now();
                if next_tick > now {
                    thread::sleep(next_tick - now);
                } else {
                    next_tick = now;
                }
            }

            info!(name = %name_clone, "Frame loop thread exiting");
        })?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        })
    }

    /// Check if the loop thread is still alive
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Stop the loop and wait for the thread to finish
    pub fn stop(&mut self) {
        debug!(name = %self.name, "Requesting frame loop stop");
        self.stop_signal.store(true, Ordering::SeqCst);
        self.join();
    }

    /// Wait for the thread to finish without sending the stop signal
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take()
            && let Err(e) = handle.join()
        {
            warn!(name = %self.name, "Frame loop thread panicked: {:?}", e);
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "CaptureLoopController dropped, stopping loop");
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_loop_stops_itself() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller =
            CaptureLoopController::start("test-loop", Duration::ZERO, move || {
                if counter_clone.fetch_add(1, Ordering::SeqCst) >= 10 {
                    LoopAction::Stop
                } else {
                    LoopAction::Continue
                }
            })
            .unwrap();

        controller.join();
        assert_eq!(counter.load(Ordering::SeqCst), 11);
        assert!(!controller.is_running());
    }

    #[test]
    fn test_stop_signal() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller =
            CaptureLoopController::start("test-loop", Duration::from_millis(5), move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                LoopAction::Continue
            })
            .unwrap();

        thread::sleep(Duration::from_millis(50));
        assert!(controller.is_running());
        controller.stop();

        let after_stop = counter.load(Ordering::SeqCst);
        assert!(after_stop > 0);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(counter.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn test_loop_is_paced() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let controller =
            CaptureLoopController::start("test-paced", Duration::from_millis(20), move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                LoopAction::Continue
            })
            .unwrap();

        thread::sleep(Duration::from_millis(100));
        drop(controller);
        // ~5 ticks in 100 ms; generous bound for slow CI machines
        assert!(counter.load(Ordering::SeqCst) <= 8);
    }
}
