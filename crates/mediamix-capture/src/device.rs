//! Capture device formats.

use serde::{Deserialize, Serialize};

use crate::CaptureResult;

/// One format a capture device can be switched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFormat {
    /// Width in pixels.
    pub width: u32,

    /// Height in pixels.
    pub height: u32,

    /// Highest supported frame rate.
    pub max_frame_rate: u32,

    /// Usable inside a multi-source session.
    pub multi_source_supported: bool,
}

impl DeviceFormat {
    /// Create a format.
    pub fn new(width: u32, height: u32, max_frame_rate: u32, multi_source_supported: bool) -> Self {
        Self {
            width,
            height,
            max_frame_rate,
            multi_source_supported,
        }
    }

    fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// A reconfigurable capture device.
pub trait CaptureDevice: Send + Sync {
    /// Display name.
    fn name(&self) -> String;

    /// All formats the device offers.
    fn formats(&self) -> Vec<DeviceFormat>;

    /// The format currently in use.
    fn active_format(&self) -> Option<DeviceFormat>;

    /// Take the exclusive configuration lock.
    fn lock_for_configuration(&self) -> CaptureResult<()>;

    /// Switch formats. Requires the configuration lock.
    fn set_active_format(&self, format: DeviceFormat) -> CaptureResult<()>;

    /// Release the configuration lock.
    fn unlock_for_configuration(&self);
}

/// Pick the format that best covers `width` x `height`.
///
/// Only formats at least as large as the request are considered, and in a
/// multi-source session only formats that support it. Among those the
/// smallest wins, so an exact match is preferred.
pub fn find_video_format(
    formats: &[DeviceFormat],
    width: u32,
    height: u32,
    multi_source: bool,
) -> Option<DeviceFormat> {
    formats
        .iter()
        .filter(|f| !multi_source || f.multi_source_supported)
        .filter(|f| f.width >= width && f.height >= height)
        .min_by_key(|f| f.area())
        .copied()
}
