// SPDX-License-Identifier: GPL-3.0-only

//! Shared V4L2 utility functions
//!
//! Capability queries and `/dev/video*` discovery for the V4L2 backend.

use super::types::{CaptureDevice, DeviceInfo, MediaType};
use std::os::unix::io::{AsRawFd, RawFd};
use tracing::debug;

/// VIDIOC_QUERYCAP ioctl number
const VIDIOC_QUERYCAP: libc::c_ulong = 0x80685600;

/// Single-planar video capture
pub const V4L2_CAP_VIDEO_CAPTURE: u32 = 0x0000_0001;
/// Multi-planar video capture
pub const V4L2_CAP_VIDEO_CAPTURE_MPLANE: u32 = 0x0000_1000;
/// Metadata capture (UVC cameras expose a second node with only this)
pub const V4L2_CAP_META_CAPTURE: u32 = 0x0080_0000;
/// Set in `capabilities` when `device_caps` is filled in
const V4L2_CAP_DEVICE_CAPS: u32 = 0x8000_0000;

/// V4L2 capability structure for VIDIOC_QUERYCAP ioctl
#[repr(C)]
struct V4l2Capability {
    driver: [u8; 16],
    card: [u8; 32],
    bus_info: [u8; 32],
    version: u32,
    capabilities: u32,
    device_caps: u32,
    reserved: [u32; 3],
}

/// Decoded result of `VIDIOC_QUERYCAP`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    pub driver: String,
    pub card: String,
    pub bus_info: String,
    /// Capabilities of this node (not the whole physical device)
    pub caps: u32,
}

fn c_string(bytes: &[u8]) -> String {
    let len = bytes.iter().position(|&c| c == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..len]).to_string()
}

fn query_v4l2_cap(fd: RawFd) -> Option<V4l2Capability> {
    let mut cap: V4l2Capability = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(fd, VIDIOC_QUERYCAP as _, &mut cap as *mut V4l2Capability) };
    if result < 0 { None } else { Some(cap) }
}

/// Query V4L2 capabilities of a device node
///
/// Returns `None` if the node cannot be opened or the ioctl fails.
pub fn query_capability(device_path: &str) -> Option<Capability> {
    let file = std::fs::File::open(device_path).ok()?;
    let cap = query_v4l2_cap(file.as_raw_fd())?;

    let caps = if cap.capabilities & V4L2_CAP_DEVICE_CAPS != 0 && cap.device_caps != 0 {
        cap.device_caps
    } else {
        cap.capabilities
    };

    Some(Capability {
        driver: c_string(&cap.driver),
        card: c_string(&cap.card),
        bus_info: c_string(&cap.bus_info),
        caps,
    })
}

/// Media types a node with the given capability bits produces
pub fn media_types_for_caps(caps: u32) -> Vec<MediaType> {
    let mut types = Vec::new();
    if caps & (V4L2_CAP_VIDEO_CAPTURE | V4L2_CAP_VIDEO_CAPTURE_MPLANE) != 0 {
        types.push(MediaType::Video);
    }
    if caps & V4L2_CAP_META_CAPTURE != 0 {
        types.push(MediaType::Metadata);
    }
    types
}

/// Build DeviceInfo from a device path and its capability
///
/// Resolves symlinks to get the real device path.
pub fn build_device_info(v4l2_path: &str, cap: &Capability) -> DeviceInfo {
    let real_path = std::fs::canonicalize(v4l2_path)
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| v4l2_path.to_string());

    DeviceInfo {
        card: cap.card.clone(),
        driver: cap.driver.clone(),
        real_path,
    }
}

/// Numeric suffix of a `videoN` node name
fn video_node_index(name: &str) -> Option<u32> {
    name.strip_prefix("video")?.parse().ok()
}

/// Scan `/dev/video*` and describe every node that answers QUERYCAP
///
/// Nodes are returned in index order, which is the order the kernel
/// registered them in.
pub fn enumerate_video_nodes() -> Vec<CaptureDevice> {
    let entries = match std::fs::read_dir("/dev") {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut nodes: Vec<(u32, String)> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            video_node_index(&name).map(|index| (index, format!("/dev/{}", name)))
        })
        .collect();
    nodes.sort();

    let mut devices = Vec::new();
    for (_, path) in nodes {
        let Some(cap) = query_capability(&path) else {
            debug!(path = %path, "Skipping V4L2 node without capabilities");
            continue;
        };

        let media_types = media_types_for_caps(cap.caps);
        if media_types.is_empty() {
            debug!(path = %path, caps = format!("{:#x}", cap.caps), "Skipping non-capture node");
            continue;
        }

        debug!(
            path = %path,
            card = %cap.card,
            driver = %cap.driver,
            ?media_types,
            "Found V4L2 node"
        );

        let mut device = CaptureDevice::new(path.clone(), cap.card.clone(), media_types);
        device.device_info = Some(build_device_info(&path, &cap));
        devices.push(device);
    }

    devices
}
