//! Error types for the playback link.

use thiserror::Error;

/// Errors that can occur while running the playback link.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The pacing thread could not be spawned.
    #[error("Failed to spawn pacing thread: {0}")]
    Spawn(#[from] std::io::Error),
}
