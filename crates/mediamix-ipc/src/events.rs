//! Events sent from the mixer to the embedding application.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::types::{InterruptionReason, MediaTime, Sample};

/// Events that the mixer can send to the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MixerEvent {
    /// Decoded audio is ready for output.
    AudioOutput {
        /// PCM payload.
        data: Bytes,

        /// Presentation timestamp.
        pts: MediaTime,
    },

    /// A decoded video frame was presented.
    VideoOutput(Sample),

    /// The capture session was interrupted.
    SessionInterrupted {
        /// Platform reason.
        reason: InterruptionReason,
    },

    /// A capture session interruption ended.
    SessionInterruptionEnded {
        /// Platform reason.
        reason: InterruptionReason,
    },

    /// The observed running state of the capture session changed.
    RunningChanged {
        /// New running state.
        is_running: bool,
    },

    /// The playback link ran dry or recovered.
    BufferingChanged {
        /// True while waiting for frames.
        is_buffering: bool,
    },
}
