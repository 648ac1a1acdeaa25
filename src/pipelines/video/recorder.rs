// SPDX-License-Identifier: MPL-2.0

//! GStreamer recording sink
//!
//! ```text
//! appsrc → videoconvert → encoder [→ h264parse] → qtmux → filesink
//! ```
//!
//! The pipeline is built when the first frame arrives, since caps depend on
//! the frame format and size. Frames are timestamped by appsrc on arrival.

use super::encoder_selection::{EncoderChoice, select_encoder};
use super::muxer::{create_muxer, link_muxer_to_sink};
use super::{RecorderFactory, RecordingSink};
use crate::backends::camera::types::{CameraFrame, PixelFormat};
use crate::constants::BitratePreset;
use crate::constants::timing::{EOS_TIMEOUT_SECS, FRAME_LOG_INTERVAL};
use crate::errors::RecordingError;
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Creates [`GstRecorder`]s with a fixed encoder configuration
#[derive(Debug, Clone, Copy)]
pub struct GstRecorderFactory {
    pub bitrate: BitratePreset,
    pub framerate: u32,
}

impl RecorderFactory for GstRecorderFactory {
    fn create(&self, path: PathBuf) -> Result<Box<dyn RecordingSink>, RecordingError> {
        let encoder = select_encoder()?;
        info!(path = %path.display(), encoder = encoder.factory, "Opening recording");
        Ok(Box::new(GstRecorder {
            path,
            encoder,
            bitrate: self.bitrate,
            framerate: self.framerate,
            pipeline: None,
            frames: 0,
        }))
    }
}

struct ActivePipeline {
    pipeline: gst::Pipeline,
    appsrc: gst_app::AppSrc,
    info: gst_video::VideoInfo,
}

/// Recording into a QuickTime file
pub struct GstRecorder {
    path: PathBuf,
    encoder: EncoderChoice,
    bitrate: BitratePreset,
    framerate: u32,
    pipeline: Option<ActivePipeline>,
    frames: u64,
}

fn video_format(format: PixelFormat) -> gst_video::VideoFormat {
    match format {
        PixelFormat::RGBA => gst_video::VideoFormat::Rgba,
        PixelFormat::YUYV => gst_video::VideoFormat::Yuy2,
    }
}

fn make(factory: &str) -> Result<gst::Element, RecordingError> {
    gst::ElementFactory::make(factory)
        .build()
        .map_err(|e| RecordingError::StartFailed(format!("Failed to create {}: {}", factory, e)))
}

/// Copy rows into a tightly packed buffer with the given stride
fn repack(frame: &CameraFrame, stride: usize) -> Vec<u8> {
    let row = (frame.width * frame.format.bytes_per_pixel()) as usize;
    let src_stride = frame.stride as usize;
    let mut out = vec![0u8; stride * frame.height as usize];
    for y in 0..frame.height as usize {
        let src = &frame.data[(y * src_stride).min(frame.data.len())..];
        let n = row.min(src.len()).min(stride);
        out[y * stride..y * stride + n].copy_from_slice(&src[..n]);
    }
    out
}

impl GstRecorder {
    fn build_pipeline(&self, frame: &CameraFrame) -> Result<ActivePipeline, RecordingError> {
        let format = video_format(frame.format);
        let info = gst_video::VideoInfo::builder(format, frame.width, frame.height)
            .fps(gst::Fraction::new(self.framerate as i32, 1))
            .build()
            .map_err(|e| RecordingError::StartFailed(format!("Invalid video info: {}", e)))?;
        let caps = info
            .to_caps()
            .map_err(|e| RecordingError::StartFailed(format!("Invalid caps: {}", e)))?;

        info!(
            path = %self.path.display(),
            caps = %caps,
            encoder = self.encoder.factory,
            "Building recording pipeline"
        );

        let pipeline = gst::Pipeline::new();
        let appsrc = gst_app::AppSrc::builder()
            .caps(&caps)
            .format(gst::Format::Time)
            .is_live(true)
            .do_timestamp(true)
            .build();
        let convert = make("videoconvert")?;
        let encoder = self.encoder.build(self.bitrate, frame.width)?;
        let parser = if self.encoder.is_h264 {
            Some(make("h264parse")?)
        } else {
            None
        };
        let mux = create_muxer(&self.path)?;

        let mut chain: Vec<&gst::Element> = vec![appsrc.upcast_ref(), &convert, &encoder];
        if let Some(parser) = &parser {
            chain.push(parser);
        }
        chain.push(&mux.muxer);

        pipeline
            .add_many(chain.iter().copied().chain([&mux.filesink]))
            .map_err(|e| RecordingError::StartFailed(format!("Failed to add elements: {}", e)))?;
        gst::Element::link_many(chain.iter().copied())
            .map_err(|e| RecordingError::StartFailed(format!("Failed to link elements: {}", e)))?;
        link_muxer_to_sink(&mux)?;

        pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| RecordingError::StartFailed(format!("Failed to start pipeline: {}", e)))?;

        Ok(ActivePipeline {
            pipeline,
            appsrc,
            info,
        })
    }
}

impl RecordingSink for GstRecorder {
    fn path(&self) -> &Path {
        &self.path
    }

    fn push_frame(&mut self, frame: &CameraFrame) -> Result<(), RecordingError> {
        if self.pipeline.is_none() {
            self.pipeline = Some(self.build_pipeline(frame)?);
        }
        let Some(active) = &self.pipeline else {
            return Ok(());
        };

        let expected = video_format(frame.format);
        if active.info.format() != expected
            || active.info.width() != frame.width
            || active.info.height() != frame.height
        {
            return Err(RecordingError::PipelineError(format!(
                "frame {}x{} {:?} does not match recording {}x{} {:?}",
                frame.width,
                frame.height,
                expected,
                active.info.width(),
                active.info.height(),
                active.info.format()
            )));
        }

        let stride = active.info.stride()[0] as usize;
        let buffer = if frame.stride as usize == stride {
            gst::Buffer::from_slice(std::sync::Arc::clone(&frame.data))
        } else {
            gst::Buffer::from_mut_slice(repack(frame, stride))
        };

        active
            .appsrc
            .push_buffer(buffer)
            .map_err(|e| RecordingError::PipelineError(format!("Failed to push frame: {:?}", e)))?;

        if self.frames % FRAME_LOG_INTERVAL == 0 {
            debug!(frames = self.frames, sequence = frame.sequence, "Recording frame pushed");
        }
        self.frames += 1;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<PathBuf, RecordingError> {
        let Some(active) = self.pipeline.take() else {
            return Err(RecordingError::StopFailed(
                "no frames were recorded".to_string(),
            ));
        };

        info!(path = %self.path.display(), frames = self.frames, "Finalizing recording");
        if let Err(e) = active.appsrc.end_of_stream() {
            warn!(error = ?e, "Failed to send EOS to recording pipeline");
        }

        let outcome = match active.pipeline.bus() {
            Some(bus) => match bus.timed_pop_filtered(
                gst::ClockTime::from_seconds(EOS_TIMEOUT_SECS),
                &[gst::MessageType::Eos, gst::MessageType::Error],
            ) {
                Some(msg) => match msg.view() {
                    gst::MessageView::Error(err) => {
                        error!(
                            error = %err.error(),
                            debug = ?err.debug(),
                            source = ?err.src().map(|s| s.name()),
                            "GStreamer error while finalizing"
                        );
                        Err(RecordingError::StopFailed(err.error().to_string()))
                    }
                    _ => Ok(()),
                },
                None => {
                    warn!(timeout_secs = EOS_TIMEOUT_SECS, "Timed out waiting for EOS");
                    Ok(())
                }
            },
            None => Ok(()),
        };

        active
            .pipeline
            .set_state(gst::State::Null)
            .map_err(|e| RecordingError::StopFailed(format!("Failed to stop pipeline: {}", e)))?;
        outcome?;

        info!(path = %self.path.display(), "Recording saved");
        Ok(self.path.clone())
    }
}

impl Drop for GstRecorder {
    fn drop(&mut self) {
        if let Some(active) = self.pipeline.take() {
            let _ = active.pipeline.set_state(gst::State::Null);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_repack_pads_rows() {
        let frame = CameraFrame {
            width: 1,
            height: 2,
            data: Arc::from(vec![1u8, 2, 3, 4, 9, 9, 5, 6, 7, 8, 9, 9]),
            format: PixelFormat::RGBA,
            stride: 6,
            captured_at: Instant::now(),
            sequence: 0,
        };
        assert_eq!(repack(&frame, 4), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_gst_format_mapping() {
        assert_eq!(video_format(PixelFormat::RGBA), gst_video::VideoFormat::Rgba);
        assert_eq!(video_format(PixelFormat::YUYV), gst_video::VideoFormat::Yuy2);
        assert_eq!(PixelFormat::YUYV.to_gst_format_string(), "YUY2");
    }
}
