//! Error types for the mixer.

use thiserror::Error;

use mediamix_capture::CaptureError;
use mediamix_link::LinkError;

/// Errors returned by mixer configuration and lifecycle calls.
///
/// Session faults reported by the platform are handled internally and never
/// surface here.
#[derive(Debug, Error)]
pub enum MixerError {
    /// The capture backend failed.
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    /// The playback link failed to start.
    #[error("Playback link error: {0}")]
    Link(#[from] LinkError),

    /// Multi-source sessions are not available on this platform.
    #[error("Multi-source sessions are not supported on this platform")]
    MultiSourceUnsupported,
}
