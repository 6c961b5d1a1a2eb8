//! Shared media types, configuration, and mixer events.
//!
//! This crate defines the vocabulary used between the capture, codec,
//! playback link, and engine crates, plus the events the mixer reports to
//! the embedding application.

mod config;
mod events;
mod types;

pub use config::{Capabilities, GateConfig, MixerConfig, PlaybackConfig};
pub use events::MixerEvent;
pub use types::{
    InterruptionReason, MediaSyncMode, MediaTime, MediaType, MixerMetrics, Sample, SessionPreset,
};

use crossbeam_channel::{Receiver, Sender};

/// Channel capacity for events (Mixer → application).
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Creates a bounded event channel.
pub fn event_channel() -> (Sender<MixerEvent>, Receiver<MixerEvent>) {
    crossbeam_channel::bounded(EVENT_CHANNEL_CAPACITY)
}
