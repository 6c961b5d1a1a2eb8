//! Simulated capture device.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use crate::device::{CaptureDevice, DeviceFormat};
use crate::error::CaptureError;
use crate::CaptureResult;

/// A simulated camera with a fixed format list.
pub struct SimDevice {
    name: String,
    formats: Vec<DeviceFormat>,
    active: Mutex<Option<DeviceFormat>>,
    locked: AtomicBool,
    refuse_lock: AtomicBool,
    format_changes: AtomicUsize,
}

impl SimDevice {
    /// Create a device whose active format is the first in `formats`.
    pub fn new(name: impl Into<String>, formats: Vec<DeviceFormat>) -> Self {
        let active = formats.first().copied();
        Self {
            name: name.into(),
            formats,
            active: Mutex::new(active),
            locked: AtomicBool::new(false),
            refuse_lock: AtomicBool::new(false),
            format_changes: AtomicUsize::new(0),
        }
    }

    /// Force the active format without locking, as another client might.
    pub fn force_active_format(&self, format: Option<DeviceFormat>) {
        *self.active.lock() = format;
    }

    /// Make future configuration locks fail.
    pub fn set_refuse_lock(&self, refuse: bool) {
        self.refuse_lock.store(refuse, Ordering::SeqCst);
    }

    /// Whether the configuration lock is held.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }

    /// Number of successful `set_active_format` calls.
    pub fn format_changes(&self) -> usize {
        self.format_changes.load(Ordering::SeqCst)
    }
}

impl CaptureDevice for SimDevice {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn formats(&self) -> Vec<DeviceFormat> {
        self.formats.clone()
    }

    fn active_format(&self) -> Option<DeviceFormat> {
        *self.active.lock()
    }

    fn lock_for_configuration(&self) -> CaptureResult<()> {
        if self.refuse_lock.load(Ordering::SeqCst) {
            return Err(CaptureError::ConfigurationLocked(format!(
                "{} is in use",
                self.name
            )));
        }
        self.locked.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn set_active_format(&self, format: DeviceFormat) -> CaptureResult<()> {
        if !self.is_locked() {
            return Err(CaptureError::NotLocked);
        }
        if !self.formats.contains(&format) {
            return Err(CaptureError::UnsupportedFormat {
                width: format.width,
                height: format.height,
            });
        }

        debug!(device = %self.name, width = format.width, height = format.height, "Active format changed");
        *self.active.lock() = Some(format);
        self.format_changes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn unlock_for_configuration(&self) {
        self.locked.store(false, Ordering::SeqCst);
    }
}
