// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 control access for exposure and white balance
//!
//! Thin wrappers over `VIDIOC_QUERYCTRL`, `VIDIOC_G_CTRL`, `VIDIOC_S_CTRL`
//! and `VIDIOC_QUERYMENU` on an open device node.

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use tracing::{debug, warn};

// ===== V4L2 Control Class Bases =====
const V4L2_CTRL_CLASS_USER: u32 = 0x00980000;
const V4L2_CTRL_CLASS_CAMERA: u32 = 0x009a0000;

const V4L2_CID_BASE: u32 = V4L2_CTRL_CLASS_USER | 0x900;
const V4L2_CID_CAMERA_CLASS_BASE: u32 = V4L2_CTRL_CLASS_CAMERA | 0x900;

// ===== V4L2 Control IDs =====

/// Automatic white balance on/off
pub const V4L2_CID_AUTO_WHITE_BALANCE: u32 = V4L2_CID_BASE + 12;
/// White balance temperature in Kelvin
pub const V4L2_CID_WHITE_BALANCE_TEMPERATURE: u32 = V4L2_CID_BASE + 26;
/// Exposure mode menu: Auto, Manual, Shutter Priority, Aperture Priority
pub const V4L2_CID_EXPOSURE_AUTO: u32 = V4L2_CID_CAMERA_CLASS_BASE + 1;
/// Absolute exposure time in 100 µs units
pub const V4L2_CID_EXPOSURE_ABSOLUTE: u32 = V4L2_CID_CAMERA_CLASS_BASE + 2;

// ===== V4L2 Exposure Auto Menu Values =====

/// Automatic exposure time and iris
pub const V4L2_EXPOSURE_AUTO: i32 = 0;
/// Manual exposure time and iris
pub const V4L2_EXPOSURE_MANUAL: i32 = 1;
/// Manual exposure time, auto iris
pub const V4L2_EXPOSURE_SHUTTER_PRIORITY: i32 = 2;
/// Auto exposure time, manual iris (what most UVC webcams call "auto")
pub const V4L2_EXPOSURE_APERTURE_PRIORITY: i32 = 3;

/// Microseconds per `V4L2_CID_EXPOSURE_ABSOLUTE` unit
pub const EXPOSURE_UNIT_MICROS: u64 = 100;

// ===== V4L2 Control Types =====
const V4L2_CTRL_TYPE_INTEGER: u32 = 1;
const V4L2_CTRL_TYPE_BOOLEAN: u32 = 2;
const V4L2_CTRL_TYPE_MENU: u32 = 3;

// ===== V4L2 Control Flags =====
const V4L2_CTRL_FLAG_DISABLED: u32 = 0x0001;

// ===== V4L2 ioctl Numbers =====
// (dir << 30) | (size << 16) | ('V' << 8) | nr

/// Get control value (v4l2_control: 8 bytes)
const VIDIOC_G_CTRL: libc::c_ulong = 0xC008561B;
/// Set control value (v4l2_control: 8 bytes)
const VIDIOC_S_CTRL: libc::c_ulong = 0xC008561C;
/// Query control info (v4l2_queryctrl: 68 bytes)
const VIDIOC_QUERYCTRL: libc::c_ulong = 0xC0445624;
/// Query menu item (v4l2_querymenu: 44 bytes)
const VIDIOC_QUERYMENU: libc::c_ulong = 0xC02C5625;

#[repr(C)]
struct V4l2Control {
    id: u32,
    value: i32,
}

// Kernel layouts; not every field is read back
#[repr(C)]
#[allow(dead_code)]
struct V4l2Queryctrl {
    id: u32,
    ctrl_type: u32,
    name: [u8; 32],
    minimum: i32,
    maximum: i32,
    step: i32,
    default_value: i32,
    flags: u32,
    reserved: [u32; 2],
}

#[repr(C)]
#[repr(packed)]
#[allow(dead_code)]
struct V4l2Querymenu {
    id: u32,
    index: u32,
    name: [u8; 32],
    reserved: u32,
}

/// V4L2 control type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlType {
    Integer,
    Boolean,
    Menu,
    Unknown(u32),
}

impl From<u32> for ControlType {
    fn from(value: u32) -> Self {
        match value {
            V4L2_CTRL_TYPE_INTEGER => ControlType::Integer,
            V4L2_CTRL_TYPE_BOOLEAN => ControlType::Boolean,
            V4L2_CTRL_TYPE_MENU => ControlType::Menu,
            other => ControlType::Unknown(other),
        }
    }
}

/// Information about a V4L2 control
#[derive(Debug, Clone)]
pub struct ControlInfo {
    pub id: u32,
    pub ctrl_type: ControlType,
    pub minimum: i32,
    pub maximum: i32,
    pub flags: u32,
}

impl ControlInfo {
    pub fn is_disabled(&self) -> bool {
        self.flags & V4L2_CTRL_FLAG_DISABLED != 0
    }

    /// Clamp a value into the control's range
    pub fn clamp(&self, value: i32) -> i32 {
        value.clamp(self.minimum, self.maximum.max(self.minimum))
    }
}

/// An open V4L2 node used for control ioctls
///
/// Opened separately from the streaming handle so controls can be changed
/// while the capture thread owns the stream.
#[derive(Debug)]
pub struct ControlDevice {
    path: String,
    file: File,
}

impl ControlDevice {
    pub fn open(path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self {
            path: path.to_string(),
            file,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query if a control exists and get its information
    pub fn query(&self, control_id: u32) -> Option<ControlInfo> {
        let mut qctrl = V4l2Queryctrl {
            id: control_id,
            ctrl_type: 0,
            name: [0; 32],
            minimum: 0,
            maximum: 0,
            step: 0,
            default_value: 0,
            flags: 0,
            reserved: [0; 2],
        };

        let result = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                VIDIOC_QUERYCTRL as _,
                &mut qctrl as *mut V4l2Queryctrl,
            )
        };
        if result < 0 {
            return None;
        }

        Some(ControlInfo {
            id: qctrl.id,
            ctrl_type: qctrl.ctrl_type.into(),
            minimum: qctrl.minimum,
            maximum: qctrl.maximum,
            flags: qctrl.flags,
        })
    }

    /// Check if a control is present and enabled
    pub fn has(&self, control_id: u32) -> bool {
        self.query(control_id)
            .map(|info| !info.is_disabled())
            .unwrap_or(false)
    }

    /// Get current value of a control
    pub fn get(&self, control_id: u32) -> std::io::Result<i32> {
        let mut ctrl = V4l2Control {
            id: control_id,
            value: 0,
        };

        let result = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                VIDIOC_G_CTRL as _,
                &mut ctrl as *mut V4l2Control,
            )
        };
        if result < 0 {
            let errno = std::io::Error::last_os_error();
            debug!(device = %self.path, control_id, ?errno, "Failed to get V4L2 control");
            return Err(errno);
        }

        Ok(ctrl.value)
    }

    /// Set value of a control
    pub fn set(&self, control_id: u32, value: i32) -> std::io::Result<()> {
        let mut ctrl = V4l2Control {
            id: control_id,
            value,
        };

        let result = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                VIDIOC_S_CTRL as _,
                &mut ctrl as *mut V4l2Control,
            )
        };
        if result < 0 {
            let errno = std::io::Error::last_os_error();
            warn!(device = %self.path, control_id, value, ?errno, "Failed to set V4L2 control");
            return Err(errno);
        }

        if ctrl.value != value {
            debug!(
                device = %self.path,
                control_id,
                requested = value,
                actual = ctrl.value,
                "V4L2 control value was clamped"
            );
        }

        Ok(())
    }

    /// Indices of the menu entries the driver accepts for a menu control
    pub fn menu_indices(&self, info: &ControlInfo) -> Vec<i32> {
        let mut indices = Vec::new();
        if info.ctrl_type != ControlType::Menu {
            return indices;
        }

        for index in info.minimum.max(0)..=info.maximum {
            let mut qmenu = V4l2Querymenu {
                id: info.id,
                index: index as u32,
                name: [0; 32],
                reserved: 0,
            };

            let result = unsafe {
                libc::ioctl(
                    self.file.as_raw_fd(),
                    VIDIOC_QUERYMENU as _,
                    &mut qmenu as *mut V4l2Querymenu,
                )
            };
            if result >= 0 {
                indices.push(index);
            }
        }

        indices
    }
}

/// Pick the menu value that means "automatic exposure" on this device
///
/// Full auto is preferred; UVC webcams usually only offer aperture priority.
pub fn auto_exposure_value(menu: &[i32]) -> Option<i32> {
    [V4L2_EXPOSURE_AUTO, V4L2_EXPOSURE_APERTURE_PRIORITY]
        .into_iter()
        .find(|v| menu.contains(v))
}

/// Whether an exposure menu value means the exposure time is chosen by the device
pub fn is_auto_exposure_value(value: i32) -> bool {
    matches!(value, V4L2_EXPOSURE_AUTO | V4L2_EXPOSURE_APERTURE_PRIORITY)
}
