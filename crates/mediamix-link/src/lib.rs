//! Playback pacing link.
//!
//! Decoded video frames are queued here and released one display tick at a
//! time, at the pace their timestamps ask for. The link reports each
//! released frame and every transition into or out of buffering to a
//! [`LinkHandler`].

mod error;
mod link;
mod pacing;

pub use error::LinkError;
pub use link::MediaLink;
pub use pacing::{PacingState, Tick};

use std::sync::Arc;

use mediamix_ipc::Sample;

/// Result type for link operations.
pub type LinkResult<T> = Result<T, LinkError>;

/// Receives link callbacks on the pacing thread.
pub trait LinkHandler: Send + Sync {
    /// A frame is due for presentation.
    fn on_dequeue(&self, sample: Sample);

    /// The link ran dry (`true`) or resumed (`false`).
    fn on_buffering_changed(&self, is_buffering: bool);
}

/// The contract the mixer drives.
pub trait PlaybackLink: Send + Sync {
    /// Install or clear the callback handler.
    fn set_handler(&self, handler: Option<Arc<dyn LinkHandler>>);

    /// Start pacing. No-op when already running.
    fn start_running(&self) -> LinkResult<()>;

    /// Stop pacing and drop queued frames. No-op when stopped.
    fn stop_running(&self);

    /// Whether the pacing loop is running.
    fn is_running(&self) -> bool;

    /// Queue a decoded frame. Returns false if the oldest queued frame was
    /// dropped to make room.
    fn enqueue(&self, sample: Sample) -> bool;
}
