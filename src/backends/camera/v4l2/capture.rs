// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 memory-mapped capture thread
//!
//! The device handle moves into the capture thread while streaming and is
//! handed back when the thread exits, so a stopped session can restart
//! without reopening the node.

use crate::backends::camera::frame_loop::LoopAction;
use crate::backends::camera::types::*;
use crate::constants::capture::{DEQUEUE_TIMEOUT, MAX_DEQUEUE_ERRORS, V4L2_BUFFER_COUNT};
use crate::constants::timing::FRAME_LOG_INTERVAL;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use v4l::FourCC;
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::video::capture::Parameters;

const YUYV: &[u8; 4] = b"YUYV";
const MJPG: &[u8; 4] = b"MJPG";

/// Wire format negotiated with the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// Packed YUYV, passed through untouched
    Yuyv { stride: u32 },
    /// Motion JPEG, decoded to RGBA on the capture thread
    Mjpeg,
}

/// Negotiated capture format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedFormat {
    pub width: u32,
    pub height: u32,
    pub wire: WireFormat,
}

/// Open the node and negotiate YUYV (or MJPEG) at the requested size
pub fn open_device(
    path: &str,
    config: &CaptureConfig,
) -> BackendResult<(Device, NegotiatedFormat)> {
    let dev = Device::with_path(path).map_err(|e| {
        BackendError::InitializationFailed(format!("Failed to open V4L2 device {}: {}", path, e))
    })?;

    let negotiated = negotiate(&dev, config, YUYV).or_else(|yuyv_err| {
        debug!(path, error = %yuyv_err, "YUYV not accepted, trying MJPEG");
        negotiate(&dev, config, MJPG)
    })?;

    if let Err(e) = dev.set_params(&Parameters::with_fps(config.framerate)) {
        warn!(path, error = %e, fps = config.framerate, "Could not set frame rate");
    }

    info!(
        path,
        width = negotiated.width,
        height = negotiated.height,
        wire = ?negotiated.wire,
        "Negotiated V4L2 capture format"
    );
    Ok((dev, negotiated))
}

fn negotiate(
    dev: &Device,
    config: &CaptureConfig,
    fourcc: &[u8; 4],
) -> BackendResult<NegotiatedFormat> {
    let mut format = dev
        .format()
        .map_err(|e| BackendError::FormatNotSupported(format!("Failed to query format: {}", e)))?;
    format.width = config.width;
    format.height = config.height;
    format.fourcc = FourCC::new(fourcc);

    let actual = dev
        .set_format(&format)
        .map_err(|e| BackendError::FormatNotSupported(format!("Failed to set format: {}", e)))?;

    let wire = if actual.fourcc == FourCC::new(YUYV) {
        WireFormat::Yuyv {
            stride: actual.stride.max(actual.width * 2),
        }
    } else if actual.fourcc == FourCC::new(MJPG) {
        WireFormat::Mjpeg
    } else {
        return Err(BackendError::FormatNotSupported(format!(
            "driver chose {} instead of {}",
            actual.fourcc,
            FourCC::new(fourcc)
        )));
    };

    Ok(NegotiatedFormat {
        width: actual.width,
        height: actual.height,
        wire,
    })
}

/// Running capture thread
pub struct CaptureThread {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<Device>>,
}

impl CaptureThread {
    pub fn spawn(
        path: String,
        dev: Device,
        format: NegotiatedFormat,
        sink: FrameSink,
    ) -> BackendResult<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = std::thread::Builder::new()
            .name("v4l2-capture".to_string())
            .spawn(move || capture_loop(&path, dev, format, sink, flag))
            .map_err(|e| BackendError::Other(format!("Failed to spawn capture thread: {}", e)))?;

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Signal the thread and wait for the device handle to come back
    ///
    /// Returns `None` if the thread panicked.
    pub fn stop(mut self) -> Option<Device> {
        self.running.store(false, Ordering::SeqCst);
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(dev) => {
                info!("V4L2 capture thread stopped");
                Some(dev)
            }
            Err(_) => {
                warn!("V4L2 capture thread panicked");
                None
            }
        }
    }
}

impl Drop for CaptureThread {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Tracks dequeue failures and decides when the stream is dead
///
/// Poll timeouts only hand control back to the loop so it can see a stop
/// request. A vanished device ends the loop at once; other errors end it
/// after `MAX_DEQUEUE_ERRORS` in a row.
#[derive(Debug, Default)]
struct DequeueErrors {
    consecutive: u32,
}

impl DequeueErrors {
    fn on_success(&mut self) {
        self.consecutive = 0;
    }

    fn on_error(&mut self, err: &io::Error) -> LoopAction {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => {
                return LoopAction::Continue;
            }
            _ => {}
        }
        if matches!(err.raw_os_error(), Some(libc::ENODEV | libc::ENXIO | libc::EBADF)) {
            return LoopAction::Stop;
        }
        self.consecutive += 1;
        if self.consecutive >= MAX_DEQUEUE_ERRORS {
            LoopAction::Stop
        } else {
            LoopAction::Continue
        }
    }
}

/// Log a dequeue failure; `false` when the stream should be abandoned
fn dequeue_failed(path: &str, errors: &mut DequeueErrors, err: &io::Error) -> bool {
    if errors.on_error(err) == LoopAction::Stop {
        error!(path, error = %err, "Capture stream failed, stopping");
        return false;
    }
    if err.kind() != io::ErrorKind::TimedOut {
        warn!(path, error = %err, "Failed to dequeue frame");
        std::thread::sleep(Duration::from_millis(10));
    }
    true
}

fn capture_loop(
    path: &str,
    mut dev: Device,
    format: NegotiatedFormat,
    sink: FrameSink,
    running: Arc<AtomicBool>,
) -> Device {
    {
        let stream = MmapStream::with_buffers(&mut dev, Type::VideoCapture, V4L2_BUFFER_COUNT);
        let mut stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                error!(path, error = %e, "Failed to create buffer stream");
                running.store(false, Ordering::SeqCst);
                return dev;
            }
        };

        stream.set_timeout(DEQUEUE_TIMEOUT);
        info!(path, "V4L2 capture stream started");
        let mut sequence = 0u64;
        let mut errors = DequeueErrors::default();
        // A failed `next()` leaves its last buffer queued, and `next()` would
        // queue it again. Take one buffer back first, dropping its frame.
        let mut resync = false;

        while running.load(Ordering::SeqCst) {
            if resync {
                match CaptureStream::dequeue(&mut stream) {
                    Ok(_) => {
                        errors.on_success();
                        resync = false;
                    }
                    Err(e) => {
                        if !dequeue_failed(path, &mut errors, &e) {
                            running.store(false, Ordering::SeqCst);
                            break;
                        }
                    }
                }
                continue;
            }

            let (buf, meta) = match stream.next() {
                Ok(next) => next,
                Err(e) => {
                    resync = true;
                    if !dequeue_failed(path, &mut errors, &e) {
                        running.store(false, Ordering::SeqCst);
                        break;
                    }
                    continue;
                }
            };
            errors.on_success();
            let captured_at = Instant::now();
            let used = match meta.bytesused as usize {
                0 => buf.len(),
                n => n.min(buf.len()),
            };

            match frame_from_buffer(&buf[..used], format, captured_at, sequence) {
                Ok(frame) => sink(frame),
                Err(e) => {
                    warn!(path, sequence, error = %e, "Dropping undecodable frame");
                    continue;
                }
            }

            if sequence % FRAME_LOG_INTERVAL == 0 {
                debug!(
                    path,
                    sequence,
                    driver_sequence = meta.sequence,
                    bytes = used,
                    "V4L2 frame captured"
                );
            }
            sequence += 1;
        }
    }

    info!(path, "V4L2 capture loop ended");
    dev
}

/// Wrap a dequeued buffer as a frame, decoding MJPEG to RGBA
pub fn frame_from_buffer(
    buf: &[u8],
    format: NegotiatedFormat,
    captured_at: Instant,
    sequence: u64,
) -> BackendResult<CameraFrame> {
    match format.wire {
        WireFormat::Yuyv { stride } => Ok(CameraFrame {
            width: format.width,
            height: format.height,
            data: Arc::from(buf),
            format: PixelFormat::YUYV,
            stride,
            captured_at,
            sequence,
        }),
        WireFormat::Mjpeg => {
            let image = image::load_from_memory_with_format(buf, image::ImageFormat::Jpeg)
                .map_err(|e| BackendError::Other(format!("MJPEG decode failed: {}", e)))?
                .to_rgba8();
            let (width, height) = image.dimensions();
            Ok(CameraFrame {
                width,
                height,
                data: Arc::from(image.into_raw()),
                format: PixelFormat::RGBA,
                stride: width * 4,
                captured_at,
                sequence,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_buffer_is_passed_through() {
        let format = NegotiatedFormat {
            width: 2,
            height: 1,
            wire: WireFormat::Yuyv { stride: 4 },
        };
        let frame = frame_from_buffer(&[16, 128, 235, 128], format, Instant::now(), 7).unwrap();
        assert_eq!(frame.format, PixelFormat::YUYV);
        assert_eq!(frame.stride, 4);
        assert_eq!(frame.sequence, 7);
        assert_eq!(&frame.data[..], &[16, 128, 235, 128]);
    }

    #[test]
    fn test_mjpeg_buffer_is_decoded() {
        let source = image::RgbImage::from_pixel(8, 4, image::Rgb([200, 30, 30]));
        let mut jpeg = Vec::new();
        image::DynamicImage::ImageRgb8(source)
            .write_to(&mut std::io::Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
            .unwrap();

        let format = NegotiatedFormat {
            width: 8,
            height: 4,
            wire: WireFormat::Mjpeg,
        };
        let frame = frame_from_buffer(&jpeg, format, Instant::now(), 0).unwrap();
        assert_eq!(frame.format, PixelFormat::RGBA);
        assert_eq!((frame.width, frame.height), (8, 4));
        assert_eq!(frame.data.len(), 8 * 4 * 4);
        let (r, g, b) = frame.sample_rgb(3, 2);
        assert!(r > 150 && g < 80 && b < 80);
    }

    #[test]
    fn test_dequeue_timeouts_never_stop_the_loop() {
        let mut errors = DequeueErrors::default();
        let timeout = io::Error::new(io::ErrorKind::TimedOut, "VIDIOC_DQBUF");
        for _ in 0..MAX_DEQUEUE_ERRORS * 2 {
            assert_eq!(errors.on_error(&timeout), LoopAction::Continue);
        }
    }

    #[test]
    fn test_unplugged_device_stops_the_loop() {
        let mut errors = DequeueErrors::default();
        let gone = io::Error::from_raw_os_error(libc::ENODEV);
        assert_eq!(errors.on_error(&gone), LoopAction::Stop);
    }

    #[test]
    fn test_repeated_errors_stop_the_loop() {
        let mut errors = DequeueErrors::default();
        let eio = io::Error::from_raw_os_error(libc::EIO);
        for _ in 1..MAX_DEQUEUE_ERRORS {
            assert_eq!(errors.on_error(&eio), LoopAction::Continue);
        }
        assert_eq!(errors.on_error(&eio), LoopAction::Stop);
    }

    #[test]
    fn test_a_frame_resets_the_error_count() {
        let mut errors = DequeueErrors::default();
        let eio = io::Error::from_raw_os_error(libc::EIO);
        for _ in 1..MAX_DEQUEUE_ERRORS {
            errors.on_error(&eio);
        }
        errors.on_success();
        assert_eq!(errors.on_error(&eio), LoopAction::Continue);
    }

    #[test]
    fn test_garbage_mjpeg_is_rejected() {
        let format = NegotiatedFormat {
            width: 8,
            height: 4,
            wire: WireFormat::Mjpeg,
        };
        assert!(frame_from_buffer(&[0, 1, 2, 3], format, Instant::now(), 0).is_err());
    }
}
