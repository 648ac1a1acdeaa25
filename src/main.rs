// SPDX-License-Identifier: GPL-3.0-only

use camera_recorder::Config;
use camera_recorder::app::AppModel;
use camera_recorder::backends::camera::{CameraBackendType, get_backend_for_type};
use camera_recorder::pipelines::video::GstRecorderFactory;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

mod cli;

#[derive(Parser)]
#[command(name = "camera-recorder")]
#[command(about = "Camera preview and recording with exposure and white balance controls")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    /// Capture backend (v4l2 or virtual); overrides the config file
    #[arg(long, global = true)]
    backend: Option<CameraBackendType>,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List {
        /// Include devices that do not produce video
        #[arg(long)]
        all: bool,
    },

    /// Record a video
    Record {
        /// Camera index to use (from 'camera-recorder list')
        #[arg(short, long, default_value = "0")]
        camera: usize,

        /// Recording duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: u64,

        /// Output directory (default: documents directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show or change exposure and white balance
    Settings(SettingsArgs),
}

#[derive(Args)]
struct SettingsArgs {
    /// Camera index to use (from 'camera-recorder list')
    #[arg(short, long, default_value = "0")]
    camera: usize,

    /// Let the camera choose the exposure
    #[arg(long, conflicts_with = "exposure")]
    auto_exposure: bool,

    /// Manual exposure as a slider position between 0 and 1
    #[arg(long)]
    exposure: Option<f64>,

    /// Let the camera choose the white balance
    #[arg(long, conflicts_with = "white_balance")]
    auto_white_balance: bool,

    /// Manual white balance temperature in Kelvin
    #[arg(long)]
    white_balance: Option<f64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Terminal mode owns the screen, so its logs go to a file
    init_logging(cli.command.is_none())?;

    let mut config = Config::load_or_default(cli.config.as_deref())?;
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    match cli.command {
        Some(Commands::List { all }) => cli::list_cameras(&config, all),
        Some(Commands::Record {
            camera,
            duration,
            output,
        }) => cli::record_video(&config, camera, duration, output),
        Some(Commands::Settings(args)) => cli::camera_settings(
            &config,
            args.camera,
            cli::SettingsRequest {
                auto_exposure: args.auto_exposure,
                exposure: args.exposure,
                auto_white_balance: args.auto_white_balance,
                white_balance: args.white_balance,
            },
        ),
        None => run_terminal(config),
    }
}

/// Set RUST_LOG to control the log level, e.g. RUST_LOG=camera_recorder=debug
fn init_logging(to_file: bool) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true);

    if to_file {
        let dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("camera-recorder");
        std::fs::create_dir_all(&dir)?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("camera-recorder.log"))?;
        builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    } else {
        builder.init();
    }
    Ok(())
}

fn run_terminal(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let backend = get_backend_for_type(config.backend);
    let recorder = GstRecorderFactory {
        bitrate: config.bitrate_preset,
        framerate: config.capture.framerate,
    };
    let model = AppModel::new(config, backend, Arc::new(recorder))?;
    camera_recorder::terminal::run(model)?;
    Ok(())
}
