//! Error types for the codec module.

use mediamix_ipc::MediaType;
use thiserror::Error;

/// Errors that can occur during codec operations.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Neither encoding nor decoding is active.
    #[error("Codec unit is not running")]
    NotRunning,

    /// The sample does not belong to this unit.
    #[error("Expected {expected:?} sample, got {actual:?}")]
    MediaTypeMismatch {
        expected: MediaType,
        actual: MediaType,
    },

    /// The encoded packet sink was dropped.
    #[error("Failed to send packet: channel disconnected")]
    ChannelDisconnected,
}
