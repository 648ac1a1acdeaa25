// SPDX-License-Identifier: GPL-3.0-only

//! Exposure and white balance mapping between UI values and device units

pub mod exposure;
pub mod setting;
pub mod white_balance;

pub use exposure::ExposureCurve;
pub use setting::{CameraSetting, apply_setting, read_setting};
pub use white_balance::clamp_gains;
