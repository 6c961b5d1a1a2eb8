//! Synchronization and session-lifecycle core of the mixer.
//!
//! [`Mixer`] gates captured samples with a [`SyncGate`] before they reach
//! the codec units, paces decoded video through a playback link, and owns a
//! [`SessionController`] that keeps the capture session running across
//! runtime faults, interruptions, and backgrounding.

mod error;
mod gate;
mod metrics;
mod mixer;
mod session;

pub use error::MixerError;
pub use gate::SyncGate;
pub use metrics::MetricsCollector;
pub use mixer::{Mixer, MixerParts};
pub use session::{ControllerSettings, SessionController};

/// Result type for mixer operations.
pub type MixerResult<T> = Result<T, MixerError>;
