// SPDX-License-Identifier: GPL-3.0-only

//! Messages from controller handles to the worker

use super::events::SessionStatus;
use crate::backends::camera::types::CaptureDevice;
use crate::controls::CameraSetting;
use crate::errors::CameraResult;
use std::path::PathBuf;
use tokio::sync::oneshot;

/// Completion channel for a command
pub type Reply<T> = oneshot::Sender<CameraResult<T>>;

#[derive(Debug)]
pub enum Command {
    LoadDevices(Reply<Vec<CaptureDevice>>),
    ChangeDevice(CaptureDevice, Reply<()>),
    StartSession(Reply<()>),
    StopSession(Reply<()>),
    StartRecording(Reply<PathBuf>),
    StopRecording(Reply<PathBuf>),
    CurrentSetting(Reply<CameraSetting>),
    ApplySetting(CameraSetting, Reply<()>),
    Status(Reply<SessionStatus>),
    Shutdown(Reply<()>),
}
