// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Recording videos
//! - Reading and changing exposure and white balance

use camera_recorder::Config;
use camera_recorder::app::FrameStats;
use camera_recorder::backends::camera::{CaptureDevice, get_backend_for_type};
use camera_recorder::controller::{CameraController, ControllerOptions};
use camera_recorder::controls::CameraSetting;
use camera_recorder::pipelines::video::GstRecorderFactory;
use camera_recorder::preview::PreviewSurface;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Requested changes for the `settings` command
#[derive(Debug, Clone, Copy, Default)]
pub struct SettingsRequest {
    pub auto_exposure: bool,
    pub exposure: Option<f64>,
    pub auto_white_balance: bool,
    pub white_balance: Option<f64>,
}

impl SettingsRequest {
    fn is_empty(&self) -> bool {
        !self.auto_exposure
            && self.exposure.is_none()
            && !self.auto_white_balance
            && self.white_balance.is_none()
    }

    /// Overlay the requested changes on the device's current values
    fn merge(&self, mut setting: CameraSetting) -> CameraSetting {
        if self.auto_exposure {
            setting.auto_exposure = true;
        }
        if let Some(value) = self.exposure {
            setting.auto_exposure = false;
            setting.exposure_value = value;
        }
        if self.auto_white_balance {
            setting.auto_white_balance = true;
        }
        if let Some(kelvin) = self.white_balance {
            setting.auto_white_balance = false;
            setting.white_balance_value = kelvin;
        }
        setting
    }
}

fn spawn_controller(config: &Config, output_dir: PathBuf) -> CliResult<CameraController> {
    let recorder = GstRecorderFactory {
        bitrate: config.bitrate_preset,
        framerate: config.capture.framerate,
    };
    let controller = CameraController::spawn(
        get_backend_for_type(config.backend),
        Arc::new(recorder),
        PreviewSurface::new(false),
        ControllerOptions {
            output_dir,
            capture: config.capture_config(),
        },
    )?;
    Ok(controller)
}

/// Open the camera at `index` in the video device list
async fn open_camera(controller: &CameraController, index: usize) -> CliResult<CaptureDevice> {
    let cameras = controller.load_devices().await?;
    if cameras.is_empty() {
        return Err("No cameras found".into());
    }

    let camera = cameras.get(index).cloned().ok_or_else(|| {
        format!(
            "Camera index {} out of range (0-{})",
            index,
            cameras.len() - 1
        )
    })?;

    controller.change_device(camera.clone()).await?;
    Ok(camera)
}

/// List available cameras (every registry entry with `all`)
pub fn list_cameras(config: &Config, all: bool) -> CliResult {
    let devices = if all {
        get_backend_for_type(config.backend).enumerate_devices()?
    } else {
        let rt = Runtime::new()?;
        let controller = spawn_controller(config, config.recordings_dir())?;
        let devices = rt.block_on(controller.load_devices())?;
        rt.block_on(controller.shutdown())?;
        devices
    };

    if devices.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available devices ({} backend):", config.backend);
    println!();
    for (index, device) in devices.iter().enumerate() {
        println!("  [{}] {}", index, device.name);
        println!("      Id: {}", device.id);
        if all {
            let media: Vec<String> = device.media_types.iter().map(|m| m.to_string()).collect();
            println!("      Media: {}", media.join(", "));
        }
        if let Some(info) = &device.device_info {
            println!("      Driver: {} ({})", info.driver, info.real_path);
        }
        println!();
    }

    Ok(())
}

/// Record a video using the specified camera
pub fn record_video(
    config: &Config,
    camera_index: usize,
    duration: u64,
    output: Option<PathBuf>,
) -> CliResult {
    let output_dir = output.unwrap_or_else(|| config.recordings_dir());
    let rt = Runtime::new()?;
    let controller = spawn_controller(config, output_dir.clone())?;

    let camera = rt.block_on(open_camera(&controller, camera_index))?;
    println!("Using camera: {}", camera.name);
    println!(
        "Recording format: {}x{} @ {}fps, {} bitrate",
        config.capture.width,
        config.capture.height,
        config.capture.framerate,
        config.bitrate_preset.display_name()
    );

    let stats = Arc::new(FrameStats::new());
    controller.add_frame_observer(stats.clone());

    let path = rt.block_on(controller.start_recording())?;
    println!("Output: {}", path.display());
    println!("Duration: {} seconds", duration);

    let recorded = wait_for_recording(&stats, Duration::from_secs(duration));
    let final_path = finish_recording(&rt, &controller, recorded)?;
    println!("Video saved: {}", final_path.display());

    Ok(())
}

/// Show progress until `target` has elapsed or Ctrl+C is pressed
fn wait_for_recording(stats: &FrameStats, target: Duration) -> CliResult {
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    println!();
    println!("Recording... (press Ctrl+C to stop early)");

    let start = Instant::now();
    while start.elapsed() < target {
        if stop_flag.load(Ordering::SeqCst) {
            println!();
            println!("Stopping early...");
            break;
        }

        let elapsed = start.elapsed().as_secs();
        print!(
            "\rRecording: {:02}:{:02} ({} frames, {:.0} fps)",
            elapsed / 60,
            elapsed % 60,
            stats.total_frames(),
            stats.fps()
        );
        std::io::Write::flush(&mut std::io::stdout())?;

        std::thread::sleep(Duration::from_millis(100));
    }
    println!();
    Ok(())
}

/// Finalize the recording and stop the controller, whatever `recorded` says
///
/// The file is always closed before an error is returned.
fn finish_recording(
    rt: &Runtime,
    controller: &CameraController,
    recorded: CliResult,
) -> CliResult<PathBuf> {
    let saved = rt.block_on(controller.stop_recording());
    rt.block_on(controller.shutdown())?;
    recorded?;
    Ok(saved?)
}

/// Print the camera's exposure and white balance, applying changes first
pub fn camera_settings(
    config: &Config,
    camera_index: usize,
    request: SettingsRequest,
) -> CliResult {
    let rt = Runtime::new()?;
    let controller = spawn_controller(config, config.recordings_dir())?;
    rt.block_on(open_camera(&controller, camera_index))?;

    let mut setting = rt.block_on(controller.current_setting())?;
    if !request.is_empty() {
        rt.block_on(controller.apply_setting(request.merge(setting)))?;
        setting = rt.block_on(controller.current_setting())?;
    }
    rt.block_on(controller.shutdown())?;

    println!("{}", serde_json::to_string_pretty(&setting)?);
    Ok(())
}
