//! Capture session, unit, and device contracts.
//!
//! The mixer never talks to a camera or microphone directly. It drives a
//! [`CaptureSession`] created by a [`SessionFactory`], attaches
//! [`CaptureUnit`]s to it, and reformats the video unit's
//! [`CaptureDevice`] when the session reports a format fault. The
//! [`sim`] module provides an in-process backend.

mod device;
mod error;
mod session;
pub mod sim;

pub use device::{find_video_format, CaptureDevice, DeviceFormat};
pub use error::CaptureError;
pub use session::{
    CaptureSession, RuntimeErrorCode, SessionConfig, SessionEvent, SessionFactory,
    SessionObserver,
};

use std::sync::Arc;

use mediamix_ipc::MediaType;

/// Result type for capture operations.
pub type CaptureResult<T> = Result<T, CaptureError>;

/// One physical source (camera or microphone) that can be wired into a
/// session.
///
/// Attach and detach are idempotent: attaching to a session the unit is
/// already part of, or detaching from one it is not part of, does nothing.
pub trait CaptureUnit: Send + Sync {
    /// The kind of samples this unit produces.
    fn media_type(&self) -> MediaType;

    /// Add this unit's inputs and outputs to the session.
    fn attach_session(&self, session: &Arc<dyn CaptureSession>);

    /// Remove this unit's inputs and outputs from the session.
    fn detach_session(&self, session: &Arc<dyn CaptureSession>);

    /// The underlying device, for units that can be reformatted.
    fn device(&self) -> Option<Arc<dyn CaptureDevice>> {
        None
    }
}
