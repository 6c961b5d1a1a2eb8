//! Error types for the capture module.

use thiserror::Error;

/// Errors that can occur during capture operations.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The device refused an exclusive configuration lock.
    #[error("Device configuration lock failed: {0}")]
    ConfigurationLocked(String),

    /// A device property was changed without holding the configuration lock.
    #[error("Device is not locked for configuration")]
    NotLocked,

    /// The device does not offer the requested format.
    #[error("Unsupported device format: {width}x{height}")]
    UnsupportedFormat { width: u32, height: u32 },

    /// The platform could not create a session.
    #[error("Session creation failed: {0}")]
    SessionCreation(String),

    /// Multi-source sessions are not available on this platform.
    #[error("Multi-source sessions are not supported")]
    MultiSourceUnsupported,
}
