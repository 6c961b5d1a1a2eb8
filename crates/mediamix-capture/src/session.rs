//! Capture session contract.

use std::sync::Arc;

use mediamix_ipc::{InterruptionReason, SessionPreset};

use crate::CaptureResult;

/// Platform runtime error codes reported by a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorCode {
    /// The device's active format cannot be used by this session.
    UnsupportedDeviceActiveFormat,

    /// The system media services restarted and tore the session down.
    MediaServicesWereReset,

    /// Any other platform error.
    Other(i64),
}

impl RuntimeErrorCode {
    const UNSUPPORTED_DEVICE_ACTIVE_FORMAT: i64 = -11873;
    const MEDIA_SERVICES_WERE_RESET: i64 = -11819;

    /// Map a platform error code.
    pub fn from_code(code: i64) -> Self {
        match code {
            Self::UNSUPPORTED_DEVICE_ACTIVE_FORMAT => Self::UnsupportedDeviceActiveFormat,
            Self::MEDIA_SERVICES_WERE_RESET => Self::MediaServicesWereReset,
            other => Self::Other(other),
        }
    }

    /// The platform error code.
    pub fn code(self) -> i64 {
        match self {
            Self::UnsupportedDeviceActiveFormat => Self::UNSUPPORTED_DEVICE_ACTIVE_FORMAT,
            Self::MediaServicesWereReset => Self::MEDIA_SERVICES_WERE_RESET,
            Self::Other(code) => code,
        }
    }
}

/// Asynchronous notifications about one session instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session hit a runtime error.
    RuntimeError(RuntimeErrorCode),

    /// The session was interrupted.
    WasInterrupted(InterruptionReason),

    /// An interruption ended.
    InterruptionEnded(InterruptionReason),

    /// The application moved to the background.
    DidEnterBackground,

    /// The application is returning to the foreground.
    WillEnterForeground,
}

/// Receives events for exactly one session.
///
/// Called on the platform's delivery context, which may race with calls
/// made from the application. Never called from inside a
/// [`CaptureSession`] method: observers may call back into the session's
/// owner, which holds its own lock across session calls.
pub trait SessionObserver: Send + Sync {
    /// Handle one event.
    fn on_session_event(&self, event: SessionEvent);
}

/// Parameters for creating a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Create a session able to combine several inputs.
    pub multi_source: bool,
}

/// A platform capture session.
///
/// Methods take `&self`; implementations synchronize internally so the
/// session can be shared with capture units and the observer callback.
///
/// Events must reach the observer asynchronously. No method of this trait
/// may invoke the registered [`SessionObserver`] before returning.
pub trait CaptureSession: Send + Sync {
    /// Whether the session is actually running.
    fn is_running(&self) -> bool;

    /// Start the session. May leave it stopped, for example when no inputs
    /// are attached.
    fn start_running(&self);

    /// Stop the session.
    fn stop_running(&self);

    /// Open a configuration bracket.
    fn begin_configuration(&self);

    /// Close a configuration bracket and apply the changes atomically.
    fn commit_configuration(&self);

    /// Whether the session accepts the preset.
    fn can_set_preset(&self, preset: SessionPreset) -> bool;

    /// Current preset.
    fn preset(&self) -> SessionPreset;

    /// Apply a preset. Callers check [`can_set_preset`](Self::can_set_preset)
    /// first.
    fn set_preset(&self, preset: SessionPreset);

    /// Whether this is a multi-source session.
    fn is_multi_source(&self) -> bool;

    /// Add a named input. Returns false if it was already present.
    fn add_input(&self, input: &str) -> bool;

    /// Remove a named input. Returns false if it was not present.
    fn remove_input(&self, input: &str) -> bool;

    /// Number of attached inputs.
    fn input_count(&self) -> usize;

    /// Register or clear the event observer for this session.
    fn set_observer(&self, observer: Option<Arc<dyn SessionObserver>>);
}

/// Creates capture sessions.
pub trait SessionFactory: Send + Sync {
    /// Create a new, stopped session.
    fn create_session(&self, config: &SessionConfig) -> CaptureResult<Arc<dyn CaptureSession>>;
}
